//! Contract with the CI runner.
//!
//! The runner passes inputs as environment variables, collects outputs from
//! the file named by `SOURCECRAFT_ENV` and understands `::group::`,
//! `::endgroup::` and `::error::` markers on stdout.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use tracing::{debug, error};

/// Convert a name to `UPPER_SNAKE_CASE`.
///
/// Hyphens become underscores and an underscore is inserted before an
/// upper-case letter that follows neither an underscore nor another
/// upper-case letter.
#[must_use]
pub fn upper_snake_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    let mut previous: Option<char> = None;

    for c in name.chars().map(|c| if c == '-' { '_' } else { c }) {
        if let Some(prev) = previous {
            if c.is_ascii_uppercase() && prev != '_' && !prev.is_ascii_uppercase() {
                result.push('_');
            }
        }
        result.extend(c.to_uppercase());
        previous = Some(c);
    }

    result
}

/// Print a failure annotation.
pub fn annotate_error(message: &str) {
    println!("::error::{message}");
}

/// Report a failed action with its full cause chain.
pub fn report_failure(err: &anyhow::Error) {
    annotate_error(&format!("{err:#}"));
}

/// Collapsible log section; closed when dropped.
#[must_use = "the group is closed as soon as the guard is dropped"]
pub struct Group(());

/// Open a log group.
pub fn group(name: &str) -> Group {
    println!("::group::{name}");
    Group(())
}

impl Drop for Group {
    fn drop(&mut self) {
        println!("::endgroup::");
    }
}

// ============================================================================
// Outputs
// ============================================================================

/// Writer of step outputs.
#[derive(Debug, Clone, Default)]
pub struct Outputs {
    file: Option<PathBuf>,
    cube: String,
}

impl Outputs {
    /// Outputs appended to `file` and prefixed with the cube name.
    #[must_use]
    pub fn new(file: Option<PathBuf>, cube: Option<String>) -> Self {
        Self {
            file,
            cube: cube.unwrap_or_default(),
        }
    }

    /// `KEY=value` line for an output.
    #[must_use]
    pub fn line(&self, name: &str, value: &str) -> String {
        if self.cube.is_empty() {
            format!("{}={value}\n", upper_snake_case(name))
        } else {
            format!(
                "{}_{}={value}\n",
                upper_snake_case(&self.cube),
                upper_snake_case(name)
            )
        }
    }

    /// Publish an output. Failures are reported and otherwise ignored.
    pub fn set(&self, name: &str, value: &str) {
        let Some(file) = &self.file else {
            error!(output = %name, "SOURCECRAFT_ENV environment variable is not set");
            annotate_error("SOURCECRAFT_ENV environment variable is not set");
            return;
        };

        let line = self.line(name, value);
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
            .and_then(|mut f| f.write_all(line.as_bytes()));

        match written {
            Ok(()) => debug!(output = %name, value = %value, "Output set"),
            Err(e) => {
                error!(file = %file.display(), error = %e, "Failed to write output");
                annotate_error(&format!("Failed to write to file {}: {e}", file.display()));
            }
        }
    }
}

// ============================================================================
// Runner context
// ============================================================================

/// Information about the checkout the action runs in.
#[derive(Args, Debug, Clone)]
pub struct RunnerContext {
    /// Checkout directory.
    #[arg(long, env = "SOURCECRAFT_WORKSPACE", default_value = ".", global = true)]
    pub workspace: PathBuf,

    /// Commit being built.
    #[arg(long, env = "SOURCECRAFT_COMMIT_SHA", global = true)]
    pub commit_sha: Option<String>,

    /// Repository URL, e.g. `https://git.example.com/owner/repo.git`.
    #[arg(long, env = "SOURCECRAFT_REPO_URL", global = true)]
    pub repo_url: Option<String>,

    /// File collecting step outputs.
    #[arg(long, env = "SOURCECRAFT_ENV", global = true)]
    pub outputs_file: Option<PathBuf>,

    /// Name of the current step.
    #[arg(long, env = "SOURCECRAFT_CUBE", global = true)]
    pub cube: Option<String>,
}

impl Default for RunnerContext {
    fn default() -> Self {
        Self::new(".")
    }
}

impl RunnerContext {
    /// Context for a workspace with nothing else set.
    #[must_use]
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            commit_sha: None,
            repo_url: None,
            outputs_file: None,
            cube: None,
        }
    }

    /// Output writer for this step.
    #[must_use]
    pub fn outputs(&self) -> Outputs {
        Outputs::new(self.outputs_file.clone(), self.cube.clone())
    }

    /// Path relative to the workspace.
    #[must_use]
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.workspace.join(path)
    }

    fn repo_path_parts(&self) -> Vec<&str> {
        let Some(url) = self.repo_url.as_deref().filter(|url| !url.is_empty()) else {
            return Vec::new();
        };
        let without_scheme = url.find("://").map_or(url, |idx| &url[idx + 3..]);
        without_scheme.split('/').collect()
    }

    /// Repository owner: the first path segment after the host.
    #[must_use]
    pub fn repo_owner(&self) -> String {
        self.repo_path_parts()
            .get(1)
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// Repository name: the last path segment without `.git`.
    #[must_use]
    pub fn repo_name(&self) -> String {
        let parts = self.repo_path_parts();
        if parts.len() < 2 {
            return String::new();
        }
        parts
            .last()
            .map(|name| name.strip_suffix(".git").unwrap_or(name).to_string())
            .unwrap_or_default()
    }

    /// Description stamped on created resources.
    #[must_use]
    pub fn created_from(&self) -> String {
        format!("Created from: {}/{}", self.repo_owner(), self.repo_name())
    }
}
