//! Transform step lists handed to the script and style toolchains.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::config::LoaderOptions;
use crate::merge::{spread, JsonObject};
use crate::registry::{minifier_registry, SelectedStep};

/// One named transform step and its options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub loader: String,
    #[serde(default, skip_serializing_if = "JsonObject::is_empty")]
    pub options: JsonObject,
}

impl Step {
    pub fn new<L: Into<String>>(loader: L, options: JsonObject) -> Self {
        Self {
            loader: loader.into(),
            options,
        }
    }
}

/// A module-processing rule: which files it applies to and how they are
/// transformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleRule {
    /// A regular expression literal, e.g. `/\.scss$/i`.
    pub test: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
    #[serde(rename = "use", default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: JsonObject,
}

/// A plugin-like build step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "JsonObject::is_empty")]
    pub options: JsonObject,
}

impl PluginSpec {
    pub fn new<N: Into<String>>(name: N, options: JsonObject) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

/// The CSS minifier's preset: its enabled sub-steps, in registry order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinifyPreset {
    pub plugins: Vec<SelectedStep>,
}

/// Selects the minifier sub-steps given per-step overrides.
pub fn minify_steps(overrides: &JsonObject) -> MinifyPreset {
    MinifyPreset {
        plugins: minifier_registry().select(overrides),
    }
}

/// The steps applied to script sources.
pub fn script_steps(loaders: &LoaderOptions) -> Vec<Step> {
    let babel = &loaders.babel;
    let mut presets = vec![json!("@wordpress/default")];
    presets.extend(babel.presets.iter().cloned());
    let mut plugins = vec![json!("@babel/plugin-transform-runtime")];
    plugins.extend(babel.plugins.iter().cloned());

    let mut options = babel.rest.clone();
    options.insert("presets".to_string(), JsonValue::Array(presets));
    options.insert("plugins".to_string(), JsonValue::Array(plugins));
    vec![Step::new("babel-loader", options)]
}

/// The steps applied to style sources, ending with compilation from Sass.
pub fn style_steps(loaders: &LoaderOptions) -> Vec<Step> {
    let css = spread(
        object(json!({"url": false, "import": false, "sourceMap": true})),
        &loaders.minicss,
    );

    let mut postcss_plugins = match &loaders.postcss.plugins {
        Some(plugins) => plugins.clone(),
        None => vec![plugin_ref(
            "postcss-preset-env",
            JsonValue::Object(loaders.postcss_preset_env.clone()),
        )],
    };
    postcss_plugins.push(plugin_ref(
        "cssnano",
        json!({ "preset": minify_steps(&loaders.cssnano) }),
    ));
    let mut postcss = spread(
        object(json!({"ident": "postcss", "sourceMap": true})),
        &loaders.postcss.rest,
    );
    postcss.insert("plugins".to_string(), JsonValue::Array(postcss_plugins));
    let mut postcss_loader = JsonObject::new();
    postcss_loader.insert("postcssOptions".to_string(), JsonValue::Object(postcss));

    let sass = spread(object(json!({"sourceMap": true})), &loaders.sass);

    vec![
        Step::new("mini-css-extract-plugin/loader", JsonObject::new()),
        Step::new("css-loader", css),
        Step::new("postcss-loader", postcss_loader),
        Step::new("sass-loader", sass),
    ]
}

fn plugin_ref(name: &str, options: JsonValue) -> JsonValue {
    json!({ "plugin": name, "options": options })
}

fn object(value: JsonValue) -> JsonObject {
    match value {
        JsonValue::Object(o) => o,
        _ => JsonObject::new(),
    }
}
