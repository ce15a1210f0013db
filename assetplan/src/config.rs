//! Configuration-related functionality for assetplan.

use std::{ffi::OsStr, fs, path::Path, str::FromStr};

use eyre::{Result, WrapErr};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::merge::{merge_layers, JsonObject, OptionLayer};
use crate::path_map::{CollisionPolicy, RewriteRule};
use crate::steps::{ModuleRule, PluginSpec};
use crate::Error;

/// Files the dev server watches when nothing else is configured.
pub const DEFAULT_WATCH_FILES: &[&str] = &["**/*.{html,min.js,css}"];

/// The fully merged options that drive one invocation of the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Folder roots searched for sources.
    pub folders: Vec<String>,
    /// Independent groups of sources, each producing its own configuration
    /// unit. When present, `folders` is not used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<CollectionSpec>>,
    /// Replaces the computed entry map.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<EntryOverride>,
    pub output: JsonObject,
    pub terser: JsonObject,
    pub loaders: LoaderOptions,
    pub module_rules: Vec<ModuleRule>,
    pub plugins: Vec<PluginSpec>,
    pub dev_server: bool,
    pub sync_base_dir: ServerBase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_start_path: Option<String>,
    pub sync_watch_files: Vec<JsonValue>,
    pub sync_options: JsonObject,
    pub sync_plugin_options: JsonObject,
    pub debug_paths: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_id: Option<String>,
    pub collision_policy: CollisionPolicy,
    pub rewrite: RewriteRule,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            folders: vec![".".to_string()],
            collections: None,
            entry: None,
            output: JsonObject::new(),
            terser: JsonObject::new(),
            loaders: LoaderOptions::default(),
            module_rules: Vec::new(),
            plugins: Vec::new(),
            dev_server: true,
            sync_base_dir: ServerBase::Enabled(true),
            sync_start_path: None,
            sync_watch_files: DEFAULT_WATCH_FILES.iter().map(|s| JsonValue::from(*s)).collect(),
            sync_options: JsonObject::new(),
            sync_plugin_options: JsonObject::new(),
            debug_paths: false,
            theme_id: None,
            collision_policy: CollisionPolicy::default(),
            rewrite: RewriteRule::default(),
        }
    }
}

impl Options {
    /// The built-in defaults as the lowest option layer.
    pub fn defaults_layer() -> Result<OptionLayer, Error> {
        OptionLayer::from_serialize("defaults", &Self::default())
    }

    /// Merges the given layers, lowest precedence first, and interprets the
    /// result.
    pub fn from_layers(layers: &[OptionLayer]) -> Result<Self, Error> {
        let merged = merge_layers(layers)?;
        serde_json::from_value(JsonValue::Object(merged)).map_err(Error::InvalidOptions)
    }
}

/// Options passed through to the individual loaders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoaderOptions {
    pub babel: BabelOptions,
    pub minicss: JsonObject,
    pub postcss: PostcssOptions,
    pub postcss_preset_env: JsonObject,
    /// Per-step overrides for the CSS minifier, keyed by step name.
    pub cssnano: JsonObject,
    pub sass: JsonObject,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BabelOptions {
    /// Appended to the built-in presets.
    pub presets: Vec<JsonValue>,
    /// Appended to the built-in plugins.
    pub plugins: Vec<JsonValue>,
    #[serde(flatten)]
    pub rest: JsonObject,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostcssOptions {
    /// Replaces the default preset-env plugin when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<JsonValue>>,
    #[serde(flatten)]
    pub rest: JsonObject,
}

/// A named group of sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    /// Folder roots, each searched with the default source glob.
    #[serde(default)]
    pub folders: Vec<String>,
    /// Additional explicit source globs.
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// An explicit entry, used verbatim instead of the discovered sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryOverride {
    Path(String),
    Paths(Vec<String>),
    Named(JsonObject),
}

/// What the dev server serves from: `true`/`false`, a base directory, or
/// anything else the server accepts (a list of base directories, a server
/// object), which is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerBase {
    Enabled(bool),
    Dir(String),
    Spec(JsonValue),
}

/// Whether the build is optimised for production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Production,
    Development,
}

/// The process environment variables that affect generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Environment {
    pub production: bool,
    pub analyzing: bool,
}

impl Environment {
    /// Selects production mode when set to `production`.
    pub const MODE_VAR: &'static str = "NODE_ENV";
    /// Suppresses module concatenation when set to a non-empty value.
    pub const ANALYZER_VAR: &'static str = "WP_BUNDLE_ANALYZER";

    /// Reads the two variables from the process environment. Values that are
    /// not valid unicode count as unset.
    pub fn from_env() -> Self {
        Self::from_vars(
            [Self::MODE_VAR, Self::ANALYZER_VAR]
                .into_iter()
                .filter_map(|k| std::env::var_os(k).and_then(|v| v.into_string().ok()).map(|v| (k, v))),
        )
    }

    /// Interprets the given variables as the process environment.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut env = Self::default();
        for (k, v) in vars {
            match k.as_ref() {
                Self::MODE_VAR => env.production = v.as_ref() == "production",
                Self::ANALYZER_VAR => env.analyzing = !v.as_ref().is_empty(),
                _ => (),
            }
        }
        env
    }

    pub fn mode(&self) -> Mode {
        if self.production {
            Mode::Production
        } else {
            Mode::Development
        }
    }

    /// Modules are only concatenated in production, and not while bundles
    /// are being analysed.
    pub fn concatenate_modules(&self) -> bool {
        self.production && !self.analyzing
    }
}

/// The file formats options can be loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedFormat {
    Json,
    Yaml,
    Toml,
}

impl FromStr for SupportedFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_ref() {
            "json" => Self::Json,
            "yaml" | "yml" => Self::Yaml,
            "toml" => Self::Toml,
            _ => return Err(Error::UnsupportedFileType(s.to_string())),
        })
    }
}

impl SupportedFormat {
    /// Parses `content` into a JSON value.
    pub fn parse(&self, content: &str) -> Result<JsonValue, Error> {
        Ok(match self {
            Self::Json => serde_json::from_str(content)?,
            Self::Yaml => serde_yaml::from_str(content)?,
            Self::Toml => toml::from_str(content)?,
        })
    }
}

/// Loads the caller's option layer from a JSON, YAML or TOML file, detecting
/// the format from the file extension.
pub fn load_layer_from_file<P: AsRef<Path>>(path: P) -> Result<OptionLayer> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(OsStr::to_str)
        .ok_or_else(|| Error::CannotDetermineFileType(path.to_path_buf()))?;
    let fmt = SupportedFormat::from_str(ext)?;
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Io(format!("while trying to read from {}", path.display()), e))?;
    let value = fmt
        .parse(&content)
        .wrap_err_with(|| Error::FailedToLoadOptions(path.to_path_buf()))?;
    debug!("Loaded options from {}", path.display());
    Ok(OptionLayer::new("caller", value)?)
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn environment_from_vars() {
        let env = Environment::from_vars([("NODE_ENV", "production")]);
        assert_eq!(env.mode(), Mode::Production);
        assert!(env.concatenate_modules());

        let env = Environment::from_vars([("NODE_ENV", "production"), ("WP_BUNDLE_ANALYZER", "1")]);
        assert!(!env.concatenate_modules());

        let env = Environment::from_vars([("NODE_ENV", "production"), ("WP_BUNDLE_ANALYZER", "")]);
        assert!(env.concatenate_modules());

        let env = Environment::from_vars([("NODE_ENV", "development")]);
        assert_eq!(env.mode(), Mode::Development);
        assert!(!env.concatenate_modules());
        let env = Environment::from_vars([("NODE_ENV", "development"), ("WP_BUNDLE_ANALYZER", "1")]);
        assert!(!env.concatenate_modules());

        assert_eq!(
            Environment::from_vars(Vec::<(String, String)>::new()).mode(),
            Mode::Development
        );
    }

    #[test]
    fn environment_ignores_unrelated_and_non_unicode_variables() {
        #[cfg(unix)]
        {
            use std::os::unix::ffi::OsStrExt;
            std::env::set_var(
                "ASSETPLAN_TEST_NOT_UNICODE",
                OsStr::from_bytes(&[0x66, 0xff, 0x6f]),
            );
        }
        let env = Environment::from_env();
        let production = std::env::var(Environment::MODE_VAR).map_or(false, |v| v == "production");
        assert_eq!(env.production, production);
    }

    #[test]
    fn server_base_passes_other_shapes_through() {
        let caller = OptionLayer::new(
            "caller",
            json!({
                "syncBaseDir": ["./a", "./b"],
                "syncWatchFiles": ["*.html", {"match": ["*.css"], "options": {"ignored": "x"}}],
            }),
        )
        .unwrap();
        let options = Options::from_layers(&[Options::defaults_layer().unwrap(), caller]).unwrap();
        assert_eq!(options.sync_base_dir, ServerBase::Spec(json!(["./a", "./b"])));
        assert_eq!(options.sync_watch_files[1]["match"], json!(["*.css"]));

        let caller = OptionLayer::new("caller", json!({"syncBaseDir": {"baseDir": "./x"}})).unwrap();
        let options = Options::from_layers(&[caller]).unwrap();
        assert_eq!(options.sync_base_dir, ServerBase::Spec(json!({"baseDir": "./x"})));
    }

    #[test]
    fn defaults_survive_a_round_trip_through_the_layers() {
        let options = Options::from_layers(&[Options::defaults_layer().unwrap()]).unwrap();
        assert_eq!(options, Options::default());
    }

    #[test]
    fn caller_layer_overrides_defaults() {
        let caller = OptionLayer::new(
            "caller",
            json!({
                "folders": ["a", "b"],
                "syncBaseDir": "./themes/x",
                "loaders": {"babel": {"presets": ["p"], "cacheDirectory": true}},
                "collisionPolicy": "error",
                "rewrite": {"suffix": ".min"},
            }),
        )
        .unwrap();
        let options = Options::from_layers(&[Options::defaults_layer().unwrap(), caller]).unwrap();
        assert_eq!(options.folders, vec!["a", "b"]);
        assert_eq!(options.sync_base_dir, ServerBase::Dir("./themes/x".to_string()));
        assert_eq!(options.loaders.babel.presets, vec![json!("p")]);
        assert_eq!(options.loaders.babel.rest.get("cacheDirectory"), Some(&json!(true)));
        assert_eq!(options.collision_policy, CollisionPolicy::Error);
        assert_eq!(options.rewrite.suffix.as_deref(), Some(".min"));
        assert_eq!(options.rewrite.source_segment, "/src/");
        assert!(options.dev_server);
    }

    #[test]
    fn wrongly_shaped_options_are_rejected() {
        let caller = OptionLayer::new("caller", json!({"entry": 42})).unwrap();
        let err = Options::from_layers(&[caller]).unwrap_err();
        assert!(matches!(err, Error::InvalidOptions(_)));

        let caller = OptionLayer::new("caller", json!({"plugins": [{"options": {}}]})).unwrap();
        assert!(Options::from_layers(&[caller]).is_err());
    }

    #[test]
    fn load_layers_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("options.json");
        fs::write(&json_path, r#"{"themeId": "acme", "debugPaths": true}"#).unwrap();
        let yaml_path = dir.path().join("options.yml");
        fs::write(&yaml_path, "themeId: acme\ndebugPaths: true\n").unwrap();
        let toml_path = dir.path().join("options.toml");
        fs::write(&toml_path, "themeId = \"acme\"\ndebugPaths = true\n").unwrap();

        for path in [json_path, yaml_path, toml_path] {
            let layer = load_layer_from_file(&path).unwrap();
            assert_eq!(layer.get("themeId"), Some(&json!("acme")));
            assert_eq!(layer.get("debugPaths"), Some(&json!(true)));
        }
    }

    #[test]
    fn unsupported_file_types_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.ini");
        fs::write(&path, "").unwrap();
        assert!(load_layer_from_file(&path).is_err());
        assert!(SupportedFormat::from_str("ini").is_err());
        assert_eq!(SupportedFormat::from_str("YML").unwrap(), SupportedFormat::Yaml);
    }

    #[test]
    fn options_file_must_hold_an_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        fs::write(&path, "[1, 2]").unwrap();
        let err = load_layer_from_file(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::LayerMustBeObject(_))
        ));
    }
}
