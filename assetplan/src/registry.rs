//! Registries of individually toggleable transform steps.

use log::debug;
use serde::{ser::SerializeTuple, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::merge::JsonObject;

/// Identifies the transform that implements a step, e.g. the package that
/// provides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StepHandle(&'static str);

impl StepHandle {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

/// A named step and its default options, including its `enabled` flag.
/// Steps without a handle are known by name but never included.
#[derive(Debug, Clone)]
struct RegisteredStep {
    name: &'static str,
    handle: Option<StepHandle>,
    defaults: JsonObject,
}

/// A step chosen for inclusion in a pipeline, with its resolved options.
///
/// Serializes as a `[handle, options]` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedStep {
    pub handle: StepHandle,
    pub options: JsonObject,
}

impl Serialize for SelectedStep {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.handle)?;
        tup.serialize_element(&self.options)?;
        tup.end()
    }
}

/// A fixed, ordered table of steps.
#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
    steps: Vec<RegisteredStep>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step to the registry. `defaults` is expected to be an object;
    /// anything else registers the step with no options.
    pub fn register(
        mut self,
        name: &'static str,
        handle: Option<&'static str>,
        defaults: JsonValue,
    ) -> Self {
        let defaults = match defaults {
            JsonValue::Object(o) => o,
            _ => JsonObject::new(),
        };
        self.steps.push(RegisteredStep {
            name,
            handle: handle.map(StepHandle),
            defaults,
        });
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.steps.iter().any(|s| s.name == name)
    }

    /// Resolves which steps run, in registry order.
    ///
    /// Each step's override is merged key by key over its defaults; a bare
    /// boolean override only sets `enabled`. A step is included when its
    /// resolved `enabled` flag is `true` (absent means `false`) and it has a
    /// handle. Overrides naming unknown steps are ignored.
    pub fn select(&self, overrides: &JsonObject) -> Vec<SelectedStep> {
        for name in overrides.keys() {
            if !self.contains(name) {
                debug!("Ignoring override for unknown step \"{}\"", name);
            }
        }
        let mut selected = Vec::new();
        for step in &self.steps {
            let mut options = step.defaults.clone();
            match overrides.get(step.name) {
                Some(JsonValue::Object(o)) => {
                    for (k, v) in o {
                        options.insert(k.clone(), v.clone());
                    }
                }
                Some(JsonValue::Bool(enabled)) => {
                    options.insert("enabled".to_string(), JsonValue::Bool(*enabled));
                }
                _ => (),
            }
            let enabled = options
                .get("enabled")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false);
            let options = options
                .into_iter()
                .filter(|(k, _)| k != "enabled")
                .collect::<JsonObject>();
            match (enabled, step.handle) {
                (true, Some(handle)) => selected.push(SelectedStep { handle, options }),
                (true, None) => debug!("Step \"{}\" has no transform, skipping", step.name),
                _ => (),
            }
        }
        selected
    }
}

/// The CSS minifier's sub-steps and their defaults.
pub fn minifier_registry() -> StepRegistry {
    StepRegistry::new()
        .register("autoprefixer", Some("autoprefixer"), json!({}))
        .register(
            "cssDeclarationSorter",
            Some("css-declaration-sorter"),
            json!({"enabled": true, "keepOverrides": true}),
        )
        .register("calc", Some("postcss-calc"), json!({"enabled": true}))
        .register("colormin", Some("postcss-colormin"), json!({"enabled": true}))
        .register("convertValues", None, json!({}))
        .register(
            "discardComments",
            Some("postcss-discard-comments"),
            json!({"enabled": true}),
        )
        .register(
            "discardDuplicates",
            Some("postcss-discard-duplicates"),
            json!({"enabled": true}),
        )
        .register(
            "discardEmpty",
            Some("postcss-discard-empty"),
            json!({"enabled": true}),
        )
        .register(
            "discardOverridden",
            Some("postcss-discard-overridden"),
            json!({"enabled": true}),
        )
        .register("discardUnused", Some("postcss-discard-unused"), json!({}))
        .register("mergeIdents", Some("postcss-merge-idents"), json!({}))
        .register(
            "mergeLonghand",
            Some("postcss-merge-longhand"),
            json!({"enabled": true}),
        )
        .register(
            "mergeRules",
            Some("postcss-merge-rules"),
            json!({"enabled": true}),
        )
        .register(
            "minifyFontValues",
            Some("postcss-minify-font-values"),
            json!({}),
        )
        .register(
            "minifyGradients",
            Some("postcss-minify-gradients"),
            json!({"enabled": true}),
        )
        .register(
            "minifyParams",
            Some("postcss-minify-params"),
            json!({"enabled": true}),
        )
        .register(
            "minifySelectors",
            Some("postcss-minify-selectors"),
            json!({"enabled": true}),
        )
        .register(
            "normalizeCharset",
            Some("postcss-normalize-charset"),
            json!({"enabled": true, "add": false}),
        )
        .register(
            "normalizeDisplayValues",
            Some("postcss-normalize-display-values"),
            json!({"enabled": true}),
        )
        .register(
            "normalizePositions",
            Some("postcss-normalize-positions"),
            json!({"enabled": true}),
        )
        .register(
            "normalizeRepeatStyle",
            Some("postcss-normalize-repeat-style"),
            json!({"enabled": true}),
        )
        .register(
            "normalizeString",
            Some("postcss-normalize-string"),
            json!({"enabled": true}),
        )
        .register(
            "normalizeTimingFunctions",
            Some("postcss-normalize-timing-functions"),
            json!({"enabled": true}),
        )
        .register(
            "normalizeUnicode",
            Some("postcss-normalize-unicode"),
            json!({"enabled": true}),
        )
        .register(
            "normalizeUrl",
            Some("postcss-normalize-url"),
            json!({"enabled": true}),
        )
        .register(
            "normalizeWhitespace",
            Some("postcss-normalize-whitespace"),
            json!({"enabled": true}),
        )
        .register(
            "orderedValues",
            Some("postcss-ordered-values"),
            json!({"enabled": true}),
        )
        .register("reduceIdents", Some("postcss-reduce-idents"), json!({}))
        .register(
            "reduceInitial",
            Some("postcss-reduce-initial"),
            json!({"enabled": true}),
        )
        .register(
            "reduceTransforms",
            Some("postcss-reduce-transforms"),
            json!({"enabled": true}),
        )
        .register("svgo", Some("postcss-svgo"), json!({"enabled": true}))
        .register(
            "uniqueSelectors",
            Some("postcss-unique-selectors"),
            json!({"enabled": true}),
        )
        .register("zindex", Some("postcss-zindex"), json!({}))
        .register("rawCache", Some("cssnano-utils/rawCache"), json!({"enabled": true}))
}

#[cfg(test)]
mod test {
    use super::*;

    fn overrides(value: JsonValue) -> JsonObject {
        match value {
            JsonValue::Object(o) => o,
            _ => panic!("expected an object"),
        }
    }

    fn registry() -> StepRegistry {
        StepRegistry::new()
            .register("foo", Some("foo-step"), json!({"enabled": true, "foo": 1}))
            .register("bar", Some("bar-step"), json!({}))
            .register("baz", None, json!({"enabled": true}))
    }

    #[test]
    fn override_options_merge_over_defaults() {
        let selected = registry().select(&overrides(json!({"foo": {"foo": 2}})));
        assert_eq!(
            selected,
            vec![SelectedStep {
                handle: StepHandle("foo-step"),
                options: overrides(json!({"foo": 2})),
            }]
        );
    }

    #[test]
    fn disabled_steps_are_absent() {
        let selected = registry().select(&overrides(json!({"foo": {"enabled": false}})));
        assert!(selected.is_empty());
        assert!(registry()
            .select(&overrides(json!({"foo": false})))
            .is_empty());
    }

    #[test]
    fn steps_can_be_enabled_by_override() {
        let selected = registry().select(&overrides(json!({"bar": true})));
        assert_eq!(
            selected
                .iter()
                .map(|s| s.handle.as_str())
                .collect::<Vec<_>>(),
            vec!["foo-step", "bar-step"]
        );
    }

    #[test]
    fn unknown_and_handleless_steps_are_ignored() {
        let selected = registry().select(&overrides(json!({"nope": {"enabled": true}})));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].handle.as_str(), "foo-step");
        assert!(registry().contains("baz"));
        assert!(!registry().contains("nope"));
    }

    #[test]
    fn minifier_defaults() {
        let selected = minifier_registry().select(&JsonObject::new());
        let handles = selected
            .iter()
            .map(|s| s.handle.as_str())
            .collect::<Vec<_>>();
        assert_eq!(handles.first(), Some(&"css-declaration-sorter"));
        assert_eq!(handles.last(), Some(&"cssnano-utils/rawCache"));
        assert!(!handles.contains(&"autoprefixer"));
        assert!(!handles.contains(&"postcss-zindex"));
        assert_eq!(handles.len(), 27);
        let charset = selected
            .iter()
            .find(|s| s.handle.as_str() == "postcss-normalize-charset")
            .unwrap();
        assert_eq!(charset.options, overrides(json!({"add": false})));
    }

    #[test]
    fn selected_step_serializes_as_pair() {
        let step = SelectedStep {
            handle: StepHandle("postcss-calc"),
            options: JsonObject::new(),
        };
        assert_eq!(
            serde_json::to_string(&step).unwrap(),
            r#"["postcss-calc",{}]"#
        );
    }
}
