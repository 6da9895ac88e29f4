use glob::{MatchOptions, Pattern};
use tracing::warn;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// `Cache-Control` values selected by glob patterns on object keys.
#[derive(Debug, Clone, Default)]
pub struct CacheControl {
    rules: Vec<(Pattern, String)>,
    default: Option<String>,
}

impl CacheControl {
    /// Parse `patterns:value` lines.
    ///
    /// Patterns are comma-separated globs; `*` alone sets the default, whose
    /// value is kept verbatim. Lines that do not split into exactly two parts
    /// on `:` are ignored, as are invalid globs. A repeated pattern takes the
    /// latest value but keeps its first position.
    #[must_use]
    pub fn parse(lines: &[String]) -> Self {
        let mut config = Self::default();

        for line in lines.iter().flat_map(|chunk| chunk.lines()) {
            let parts: Vec<&str> = line.split(':').collect();
            let [patterns, value] = parts.as_slice() else {
                continue;
            };

            if patterns.trim() == "*" {
                config.default = Some((*value).to_string());
                continue;
            }

            let value = value.trim();
            for raw in patterns.split(',').map(str::trim) {
                match Pattern::new(raw) {
                    Ok(pattern) => config.insert(pattern, value),
                    Err(e) => warn!(pattern = %raw, error = %e, "Ignoring invalid cache-control pattern"),
                }
            }
        }

        config
    }

    fn insert(&mut self, pattern: Pattern, value: &str) {
        if let Some(rule) = self.rules.iter_mut().find(|(p, _)| *p == pattern) {
            rule.1 = value.to_string();
        } else {
            self.rules.push((pattern, value.to_string()));
        }
    }

    /// Value for an object key: the first rule matching the key, or its base
    /// name when the key has directories, else the default. `None` when the
    /// result is empty.
    #[must_use]
    pub fn value_for(&self, key: &str) -> Option<&str> {
        let base_name = key.rsplit_once('/').map(|(_, base)| base);

        self.rules
            .iter()
            .find(|(pattern, _)| {
                pattern.matches_with(key, MATCH_OPTIONS)
                    || base_name.is_some_and(|base| pattern.matches_with(base, MATCH_OPTIONS))
            })
            .map(|(_, value)| value.as_str())
            .or(self.default.as_deref())
            .filter(|value| !value.is_empty())
    }

    /// Default value, when one was given.
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Number of pattern rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// No pattern rules and no default.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.default.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(items: &[&str]) -> CacheControl {
        let lines: Vec<String> = items.iter().map(ToString::to_string).collect();
        CacheControl::parse(&lines)
    }

    #[test]
    fn test_parse_with_default() {
        let config = parse(&[
            "*.html:public, max-age=3600",
            "*.css:public, max-age=600",
            "*:no-cache",
        ]);

        assert_eq!(config.len(), 2);
        assert_eq!(config.default_value(), Some("no-cache"));
        assert_eq!(config.value_for("index.html"), Some("public, max-age=3600"));
        assert_eq!(config.value_for("style.css"), Some("public, max-age=600"));
        assert_eq!(config.value_for("app.js"), Some("no-cache"));
    }

    #[test]
    fn test_default_value_keeps_spaces() {
        assert_eq!(parse(&["*: "]).default_value(), Some(" "));
        assert_eq!(parse(&["*:"]).default_value(), Some(""));
        assert_eq!(parse(&["*:"]).value_for("a.txt"), None);
    }

    #[test]
    fn test_comma_separated_patterns() {
        let config = parse(&["*.html, *.htm:public, max-age=3600", "*.css:max-age=60"]);
        assert_eq!(config.len(), 3);
        assert_eq!(config.value_for("old.htm"), Some("public, max-age=3600"));
    }

    #[test]
    fn test_lines_with_extra_colons_are_ignored() {
        let config = parse(&["*.html:max-age=1:extra", "no colon here", "*.css:max-age=2"]);
        assert_eq!(config.len(), 1);
        assert_eq!(config.value_for("a.html"), None);
    }

    #[test]
    fn test_nested_keys_match_base_name() {
        let config = parse(&["*.html:html-value", "assets/*:asset-value", "*:default-value"]);

        assert_eq!(config.value_for("dir/sub/page.html"), Some("html-value"));
        assert_eq!(config.value_for("assets/logo.png"), Some("asset-value"));
        assert_eq!(config.value_for("assets/img/logo.png"), Some("default-value"));
    }

    #[test]
    fn test_first_declared_rule_wins() {
        let config = parse(&["index.*:no-store", "*.html:max-age=60"]);
        assert_eq!(config.value_for("index.html"), Some("no-store"));
        assert_eq!(config.value_for("about.html"), Some("max-age=60"));
    }

    #[test]
    fn test_repeated_pattern_takes_latest_value() {
        let config = parse(&["*.js:max-age=1", "*.js:max-age=2"]);
        assert_eq!(config.len(), 1);
        assert_eq!(config.value_for("a.js"), Some("max-age=2"));
    }

    #[test]
    fn test_empty_config() {
        let config = parse(&[]);
        assert!(config.is_empty());
        assert_eq!(config.value_for("file.txt"), None);
    }
}
