use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use handlebars::Handlebars;
use regex::{Captures, Regex};

use crate::error::InputError;

static ENV_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{env\.([A-Za-z_][A-Za-z0-9_]*)\}\}").unwrap());

/// Render a handlebars template (`{{NAME}}`) with the given variables.
///
/// Output is not HTML-escaped. Without variables the text is returned as is.
///
/// # Errors
///
/// Returns [`InputError::Template`] when the template does not parse or
/// render.
pub fn render_template(text: &str, variables: &BTreeMap<String, String>) -> Result<String, InputError> {
    if variables.is_empty() {
        return Ok(text.to_string());
    }

    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .render_template(text, variables)
        .map_err(|e| InputError::Template(e.to_string()))
}

/// Replace `{{env.NAME}}` placeholders with values from `env`.
///
/// Placeholders naming unknown variables and any other `{{...}}` text are
/// left untouched.
#[must_use]
pub fn render_env_template(text: &str, env: &HashMap<String, String>) -> String {
    ENV_PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| {
            env.get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_template_without_variables() {
        let spec = "openapi: 3.0.0\ninfo:\n  title: {{Title}}";
        assert_eq!(render_template(spec, &BTreeMap::new()).unwrap(), spec);
    }

    #[test]
    fn test_render_template_with_variables() {
        let variables = BTreeMap::from([
            ("Title".to_string(), "Sample <API>".to_string()),
            ("Version".to_string(), "1.0.0".to_string()),
        ]);
        let rendered = render_template(
            "openapi: 3.0.0\ninfo:\n  title: {{Title}}\n  version: {{Version}}",
            &variables,
        )
        .unwrap();
        assert_eq!(rendered, "openapi: 3.0.0\ninfo:\n  title: Sample <API>\n  version: 1.0.0");
    }

    #[test]
    fn test_render_template_syntax_error() {
        let variables = BTreeMap::from([("A".to_string(), "1".to_string())]);
        let err = render_template("{{#if A}}unclosed", &variables).unwrap_err();
        assert!(matches!(err, InputError::Template(_)));
    }

    #[test]
    fn test_render_env_template() {
        let env = HashMap::from([
            ("IMAGE".to_string(), "cr.yandex/app:1.2".to_string()),
            ("PORT".to_string(), "8080".to_string()),
        ]);
        let compose = "image: {{env.IMAGE}}\nports: [\"{{env.PORT}}:{{env.PORT}}\"]\nx: {{env.MISSING}} {{ .Other }}";

        assert_eq!(
            render_env_template(compose, &env),
            "image: cr.yandex/app:1.2\nports: [\"8080:8080\"]\nx: {{env.MISSING}} {{ .Other }}"
        );
    }
}
