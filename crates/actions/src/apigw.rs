//! Create or update an API gateway from an `OpenAPI` specification.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;
use yc_cloud::apigateway::{ApiGateway, CreateApiGatewayRequest};
use yc_cloud::YandexCloud;

use crate::error::InputError;
use crate::inputs::{optional, parse_environment, render_template, required};
use crate::workflow::{group, RunnerContext};

/// Inputs of the API gateway action.
#[derive(Args, Debug, Clone, Default)]
pub struct ApiGatewayArgs {
    /// Folder holding the gateway.
    #[arg(long, env = "FOLDER_ID")]
    pub folder_id: Option<String>,

    /// Gateway name; created when missing.
    #[arg(long, env = "GATEWAY_NAME")]
    pub gateway_name: Option<String>,

    /// Inline specification.
    #[arg(long, env = "SPEC")]
    pub spec: Option<String>,

    /// Specification file, relative to the workspace.
    #[arg(long, env = "SPEC_FILE")]
    pub spec_file: Option<String>,

    /// `KEY=VALUE` lines substituted into `{{KEY}}` placeholders of the `OpenAPI` document.
    #[arg(long, env = "SPEC_VARIABLES", value_delimiter = '\n')]
    pub spec_variables: Vec<String>,
}

impl ApiGatewayArgs {
    /// Rendered specification text.
    ///
    /// # Errors
    ///
    /// Returns error when not exactly one of `SPEC` and `SPEC_FILE` is set,
    /// the file cannot be read or the template does not render.
    pub fn load_spec(&self, ctx: &RunnerContext) -> Result<String> {
        let inline = self.spec.as_deref().filter(|spec| !spec.trim().is_empty());
        let spec = match (inline, optional(self.spec_file.as_ref())) {
            (None, None) => {
                return Err(InputError::Conflict(
                    "Either SPEC or SPEC_FILE input must be provided".to_string(),
                )
                .into())
            }
            (Some(_), Some(_)) => {
                return Err(InputError::Conflict(
                    "Only one of SPEC or SPEC_FILE input must be provided, not both".to_string(),
                )
                .into())
            }
            (Some(spec), None) => spec.to_string(),
            (None, Some(file)) => {
                let path = ctx.resolve(file);
                std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read spec file {}", path.display()))?
            }
        };

        let variables = parse_environment(&self.spec_variables)?;
        Ok(render_template(&spec, &variables)?)
    }
}

/// Create the gateway or replace its specification.
///
/// # Errors
///
/// Returns error on invalid inputs or API errors.
pub async fn run(
    cloud: &YandexCloud,
    ctx: &RunnerContext,
    args: &ApiGatewayArgs,
) -> Result<ApiGateway> {
    let folder_id = required(args.folder_id.as_ref(), "FOLDER_ID")?;
    let name = required(args.gateway_name.as_ref(), "GATEWAY_NAME")?;
    let spec = args.load_spec(ctx)?;
    info!(folder_id = %folder_id, gateway = %name, "Deploying API gateway");

    let gateway = {
        let _group = group("Deploy API gateway");
        let existing = cloud
            .find_gateway_by_name(folder_id, name)
            .await
            .context("Failed to list API gateways")?;

        if let Some(gateway) = existing {
            info!(gateway_id = %gateway.id, "Gateway already exists, updating its specification");
            cloud
                .update_gateway_spec(&gateway.id, &spec)
                .await
                .context("Failed to update API gateway")?;
            gateway
        } else {
            info!(gateway = %name, "There is no gateway with this name, creating a new one");
            cloud
                .create_gateway(&CreateApiGatewayRequest {
                    folder_id: folder_id.to_string(),
                    name: name.to_string(),
                    description: ctx.created_from(),
                    openapi_spec: spec,
                })
                .await
                .context("Failed to create API gateway")?
        }
    };

    let outputs = ctx.outputs();
    outputs.set("id", &gateway.id);
    outputs.set("domain", &gateway.domain);
    Ok(gateway)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SPEC: &str = "openapi: 3.0.0\ninfo:\n  title: {{TITLE}}\n  version: 1.0.0\n";

    #[test]
    fn test_load_inline_spec_with_variables() {
        let args = ApiGatewayArgs {
            spec: Some(SPEC.into()),
            spec_variables: vec!["TITLE=Shop API".into()],
            ..Default::default()
        };
        let spec = args.load_spec(&RunnerContext::default()).unwrap();
        assert!(spec.contains("title: Shop API"));
    }

    #[test]
    fn test_inline_spec_keeps_indentation() {
        let indented = "  openapi: 3.0.0\n  info:\n    title: shop\n";
        let args = ApiGatewayArgs {
            spec: Some(indented.into()),
            ..Default::default()
        };
        let spec = args.load_spec(&RunnerContext::default()).unwrap();
        assert_eq!(spec, indented);

        let blank = ApiGatewayArgs {
            spec: Some("  \n".into()),
            ..Default::default()
        };
        assert!(blank.load_spec(&RunnerContext::default()).is_err());
    }

    #[test]
    fn test_load_spec_file_relative_to_workspace() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("gateway.yaml"), SPEC).unwrap();

        let args = ApiGatewayArgs {
            spec_file: Some("gateway.yaml".into()),
            ..Default::default()
        };
        let spec = args.load_spec(&RunnerContext::new(dir.path())).unwrap();
        assert_eq!(spec, SPEC);
    }

    #[test]
    fn test_spec_inputs_are_exclusive() {
        let neither = ApiGatewayArgs::default();
        assert_eq!(
            neither.load_spec(&RunnerContext::default()).unwrap_err().to_string(),
            "Either SPEC or SPEC_FILE input must be provided"
        );

        let both = ApiGatewayArgs {
            spec: Some(SPEC.into()),
            spec_file: Some("gateway.yaml".into()),
            ..Default::default()
        };
        assert_eq!(
            both.load_spec(&RunnerContext::default()).unwrap_err().to_string(),
            "Only one of SPEC or SPEC_FILE input must be provided, not both"
        );
    }

    #[test]
    fn test_missing_spec_file() {
        let dir = TempDir::new().unwrap();
        let args = ApiGatewayArgs {
            spec_file: Some("absent.yaml".into()),
            ..Default::default()
        };
        let err = args.load_spec(&RunnerContext::new(dir.path())).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read spec file"));
    }
}
