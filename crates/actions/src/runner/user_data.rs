//! cloud-init user data starting the CI runner.

use std::fmt::Write as _;

/// Download location of the runner binary.
pub const RUNNER_DOWNLOAD_BASE: &str = "https://storage.yandexcloud.net/src-processor-downloads";

/// Version downloaded when none is pinned.
pub const DEFAULT_RUNNER_VERSION: &str = "latest";

/// Parameters of the generated user data.
#[derive(Debug, Clone, Default)]
pub struct UserDataParams<'a> {
    /// Runner registration token.
    pub registration_token: &'a str,
    /// Tag the runner registers with.
    pub label: &'a str,
    /// Directory of a runner pre-installed in the image.
    pub runner_home_dir: Option<&'a str>,
    /// Version to download when nothing is pre-installed.
    pub runner_version: Option<&'a str>,
    /// Login created on the VM.
    pub user: Option<&'a str>,
    /// Key authorized for that login.
    pub ssh_public_key: Option<&'a str>,
}

impl UserDataParams<'_> {
    fn download_url(&self) -> String {
        let version = self.runner_version.unwrap_or(DEFAULT_RUNNER_VERSION);
        format!("{RUNNER_DOWNLOAD_BASE}/self-hosted-processor-{version}/linux/amd64/self-hosted-processor")
    }

    fn commands(&self) -> Vec<String> {
        let init = format!(
            "./self-hosted-processor init --root-dir /tmp --token {} --tags {} > config.yaml",
            self.registration_token, self.label
        );
        let run = "./self-hosted-processor run --config-path config.yaml".to_string();

        match self.runner_home_dir {
            Some(home) => vec![
                format!("cd \"{home}\""),
                "export RUNNER_ALLOW_RUNASROOT=1".to_string(),
                init,
                run,
            ],
            None => vec![
                "mkdir actions-runner && cd actions-runner".to_string(),
                format!("curl -O -L {}", self.download_url()),
                "chmod +x self-hosted-processor".to_string(),
                init,
                run,
            ],
        }
    }
}

/// Build the VM user data.
///
/// A plain bash script, or a `#cloud-config` document creating a sudo user
/// with an SSH key when both are given; its `runcmd` then holds the script
/// commands.
#[must_use]
pub fn build_user_data(params: &UserDataParams<'_>) -> String {
    let commands = params.commands();

    if let (Some(user), Some(key)) = (params.user, params.ssh_public_key) {
        let mut config = format!(
            "#cloud-config\n\
             ssh_pwauth: no\n\
             users:\n  \
             - name: {user}\n    \
             sudo: ALL=(ALL) NOPASSWD:ALL\n    \
             shell: /bin/bash\n    \
             ssh_authorized_keys:\n      \
             - \"{key}\"\n\
             runcmd:\n"
        );
        for command in &commands {
            let _ = writeln!(config, "  - {command}");
        }
        return config;
    }

    let mut script = String::from("#!/bin/bash\n");
    for command in &commands {
        script.push_str(command);
        script.push('\n');
    }
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> UserDataParams<'static> {
        UserDataParams {
            registration_token: "reg-token",
            label: "a1b2c",
            ..Default::default()
        }
    }

    #[test]
    fn test_script_downloads_runner() {
        let script = build_user_data(&params());
        let lines: Vec<_> = script.lines().collect();

        assert_eq!(lines[0], "#!/bin/bash");
        assert_eq!(lines.len(), 6);
        assert!(script.contains(
            "curl -O -L https://storage.yandexcloud.net/src-processor-downloads/self-hosted-processor-latest/linux/amd64/self-hosted-processor"
        ));
        assert!(script.contains("init --root-dir /tmp --token reg-token --tags a1b2c > config.yaml"));
        assert!(script.ends_with("./self-hosted-processor run --config-path config.yaml\n"));
    }

    #[test]
    fn test_script_pins_runner_version() {
        let script = build_user_data(&UserDataParams {
            runner_version: Some("1.4.0"),
            ..params()
        });
        assert!(script.contains("/self-hosted-processor-1.4.0/linux/amd64/"));
    }

    #[test]
    fn test_script_with_preinstalled_runner() {
        let script = build_user_data(&UserDataParams {
            runner_home_dir: Some("/opt/runner"),
            ..params()
        });

        assert!(script.starts_with("#!/bin/bash\ncd \"/opt/runner\"\n"));
        assert!(script.contains("export RUNNER_ALLOW_RUNASROOT=1"));
        assert!(!script.contains("curl"));
    }

    #[test]
    fn test_cloud_config_with_user() {
        let config = build_user_data(&UserDataParams {
            runner_home_dir: Some("/opt/runner"),
            user: Some("ci"),
            ssh_public_key: Some("ssh-ed25519 AAAA ci@host"),
            ..params()
        });

        assert!(config.starts_with("#cloud-config\n"));
        assert!(config.contains("  - name: ci\n"));
        assert!(config.contains("      - \"ssh-ed25519 AAAA ci@host\"\n"));
        assert!(config.contains("runcmd:\n  - cd \"/opt/runner\"\n"));
        assert!(!config.contains("#!/bin/bash"));
    }

    #[test]
    fn test_user_without_key_is_plain_script() {
        let script = build_user_data(&UserDataParams {
            user: Some("ci"),
            ..params()
        });
        assert!(script.starts_with("#!/bin/bash\n"));
    }
}
