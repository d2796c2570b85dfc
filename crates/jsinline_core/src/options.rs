use serde::Deserialize;

/// Knobs for [`crate::transform_program`]. Deserializes from kebab-case keys; every key is
/// optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct TransformOptions {
    /// Tag marking functions for inlining, without the `@`.
    pub annotation: String,
    pub inline_functions: bool,
    pub project_objects: bool,
    pub simplify_bindings: bool,
    /// Upper bound on rewrites per program; reaching it aborts the transform.
    pub max_expansions: usize,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            annotation: default_annotation(),
            inline_functions: true,
            project_objects: true,
            simplify_bindings: true,
            max_expansions: 10_000,
        }
    }
}

fn default_annotation() -> String {
    "inline".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_gives_defaults() {
        let options: TransformOptions = toml::from_str("").expect("parse");
        assert_eq!(options, TransformOptions::default());
    }

    #[test]
    fn kebab_case_keys() {
        let options: TransformOptions =
            toml::from_str("annotation = \"inline-me\"\nproject-objects = false\nmax-expansions = 5")
                .expect("parse");
        assert_eq!(options.annotation, "inline-me");
        assert!(!options.project_objects);
        assert!(options.simplify_bindings);
        assert_eq!(options.max_expansions, 5);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<TransformOptions>("inline = true").is_err());
    }

    #[test]
    fn json_works_too() {
        let options: TransformOptions =
            serde_json::from_str(r#"{"inline-functions": false}"#).expect("parse");
        assert!(!options.inline_functions);
    }
}
