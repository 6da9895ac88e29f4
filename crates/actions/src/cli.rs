//! Command line of the `yc-actions` binary.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::apigw::ApiGatewayArgs;
use crate::coi::CoiArgs;
use crate::container::ContainerActionArgs;
use crate::function::FunctionArgs;
use crate::inputs::CredentialArgs;
use crate::runner::{RunnerArgs, RunnerOutcome};
use crate::upload::UploadArgs;
use crate::workflow::RunnerContext;
use crate::{apigw, coi, container, function, runner, upload};

/// Deploy to Yandex Cloud from CI.
///
/// Every input can be given as a flag or as the environment variable the CI
/// runner sets for it.
#[derive(Parser, Debug)]
#[command(name = "yc-actions")]
#[command(about = "Deploy serverless functions, containers, API gateways and VMs to Yandex Cloud")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(
        short,
        long,
        env = "VERBOSE",
        global = true,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub verbose: bool,

    #[command(flatten)]
    pub context: RunnerContext,

    #[command(flatten)]
    pub credentials: CredentialArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a function version from workspace sources
    Function(FunctionArgs),

    /// Deploy a serverless container revision
    Container(ContainerActionArgs),

    /// Create or update an API gateway
    Apigw(ApiGatewayArgs),

    /// Deploy docker-compose to a Container Optimized Image VM
    Coi(CoiArgs),

    /// Start or stop a self-hosted runner VM
    Runner(RunnerArgs),

    /// Upload files to an Object Storage bucket
    Upload(UploadArgs),
}

impl Commands {
    /// Action name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Function(_) => "function",
            Self::Container(_) => "container",
            Self::Apigw(_) => "apigw",
            Self::Coi(_) => "coi",
            Self::Runner(_) => "runner",
            Self::Upload(_) => "upload",
        }
    }
}

/// Run the selected action.
///
/// # Errors
///
/// Returns the first error of the action, with context.
pub async fn dispatch(cli: &Cli) -> Result<()> {
    let cloud = cli.credentials.client()?;
    let ctx = &cli.context;
    info!(action = cli.command.name(), "Starting action");

    match &cli.command {
        Commands::Function(args) => {
            let deployment = function::run(&cloud, ctx, args).await?;
            info!(
                function_id = %deployment.function_id,
                version_id = %deployment.version_id,
                "Function version created"
            );
        }
        Commands::Container(args) => {
            let deployment = container::run(&cloud, ctx, args).await?;
            info!(
                container_id = %deployment.container_id,
                revision_id = %deployment.revision_id,
                "Container revision deployed"
            );
        }
        Commands::Apigw(args) => {
            let gateway = apigw::run(&cloud, ctx, args).await?;
            info!(gateway_id = %gateway.id, domain = %gateway.domain, "API gateway deployed");
        }
        Commands::Coi(args) => {
            let deployment = coi::run(&cloud, ctx, args).await?;
            info!(
                instance_id = %deployment.instance.id,
                created = deployment.created,
                "VM deployed"
            );
        }
        Commands::Runner(args) => match runner::run(&cloud, ctx, args).await? {
            RunnerOutcome::Started { label, instance_id } => {
                info!(label = %label, instance_id = %instance_id, "Runner started");
            }
            RunnerOutcome::Stopped { instance_id } => {
                info!(instance_id = %instance_id, "Runner stopped");
            }
        },
        Commands::Upload(args) => {
            let summary = upload::run(&cloud, ctx, args).await?;
            info!(
                uploaded = summary.uploaded.len(),
                deleted = summary.deleted,
                "Upload finished"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_runner_flags() {
        let cli = Cli::try_parse_from([
            "yc-actions",
            "--workspace",
            "/work",
            "runner",
            "--mode",
            "stop",
            "--github-token",
            "gh",
            "--label",
            "a1b2c",
            "--instance-id",
            "fhm1",
        ])
        .unwrap();

        assert_eq!(cli.context.workspace, std::path::PathBuf::from("/work"));
        let Commands::Runner(args) = &cli.command else {
            panic!("expected runner");
        };
        assert_eq!(args.mode.as_deref(), Some("stop"));
        assert_eq!(cli.command.name(), "runner");
    }

    #[test]
    fn test_parse_multiline_flags() {
        let cli = Cli::try_parse_from([
            "yc-actions",
            "upload",
            "--bucket",
            "site",
            "--root",
            "public",
            "--exclude",
            "*.md\n*.txt",
        ])
        .unwrap();

        let Commands::Upload(args) = &cli.command else {
            panic!("expected upload");
        };
        assert_eq!(args.include, ["."]);
        assert_eq!(args.exclude, ["*.md", "*.txt"]);
    }

    #[test]
    #[serial_test::serial]
    fn test_verbose_accepts_boolish_env() {
        let parse = || Cli::try_parse_from(["yc-actions", "upload", "--bucket", "site"]);

        std::env::set_var("VERBOSE", "1");
        let on = parse();
        std::env::set_var("VERBOSE", "no");
        let off = parse();
        std::env::remove_var("VERBOSE");

        assert!(on.unwrap().verbose);
        assert!(!off.unwrap().verbose);
    }
}
