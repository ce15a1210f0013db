//! Assembly of complete build configuration units.

use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::config::{EntryOverride, Environment, Mode, Options, ServerBase};
use crate::hash::sha256;
use crate::merge::{spread, JsonObject};
use crate::path_map::EntryMap;
use crate::steps::{script_steps, style_steps, ModuleRule, PluginSpec};
use crate::Error;

pub const DEV_SERVER_HOST: &str = "localhost";
pub const DEV_SERVER_PORT: u16 = 5759;

/// What a configuration unit builds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Entry {
    Discovered(EntryMap),
    Explicit(EntryOverride),
}

impl Entry {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Discovered(entries) => entries.is_empty(),
            Self::Explicit(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Optimization {
    pub concatenate_modules: bool,
    pub minimizer: Vec<PluginSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleConfig {
    pub rules: Vec<ModuleRule>,
}

/// Options for the file-watching, browser-reloading development server.
///
/// Keys the server itself understands are typed; any other pass-through
/// options are kept in `passthrough`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevServerSpec {
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_path: Option<String>,
    pub server: ServerBase,
    pub files: Vec<JsonValue>,
    #[serde(flatten)]
    pub passthrough: JsonObject,
}

/// The dev server and the options for the plugin that runs it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevServer {
    pub options: DevServerSpec,
    #[serde(skip_serializing_if = "JsonObject::is_empty")]
    pub plugin_options: JsonObject,
}

/// One complete build configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUnit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub mode: Mode,
    pub entry: Entry,
    pub output: JsonObject,
    pub optimization: Optimization,
    pub module: ModuleConfig,
    pub plugins: Vec<PluginSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_server: Option<DevServer>,
}

impl ConfigUnit {
    /// The SHA256 hash of this unit's JSON serialization. Identical inputs
    /// produce identical fingerprints.
    pub fn fingerprint(&self) -> Result<String, Error> {
        Ok(sha256(serde_json::to_string(self)?))
    }
}

/// Builds configuration units from an entry map and merged options.
#[derive(Debug)]
pub struct Assembler<'a> {
    options: &'a Options,
    env: Environment,
    root: &'a Path,
}

impl<'a> Assembler<'a> {
    /// Constructor. `root` is the default output directory.
    pub fn new(options: &'a Options, env: Environment, root: &'a Path) -> Self {
        Self { options, env, root }
    }

    /// Like [`Assembler::assemble`], but produces nothing when there is
    /// nothing to build.
    pub fn assemble_nonempty(
        &self,
        name: Option<&str>,
        entries: EntryMap,
        primary: bool,
    ) -> Result<Option<ConfigUnit>, Error> {
        if entries.is_empty() && self.options.entry.is_none() {
            debug!(
                "Nothing to build for {}, skipping",
                name.unwrap_or("the default collection")
            );
            return Ok(None);
        }
        self.assemble(name, entries, primary).map(Some)
    }

    /// Assembles one configuration unit. The dev server is only attached to
    /// the primary unit, and only if it is enabled.
    pub fn assemble(
        &self,
        name: Option<&str>,
        entries: EntryMap,
        primary: bool,
    ) -> Result<ConfigUnit, Error> {
        let opts = self.options;
        let entry = match &opts.entry {
            Some(explicit) => {
                validate_entry(explicit)?;
                Entry::Explicit(explicit.clone())
            }
            None => Entry::Discovered(entries),
        };

        let mut output = JsonObject::new();
        output.insert("filename".to_string(), json!("[name].js"));
        output.insert(
            "path".to_string(),
            JsonValue::String(self.root.to_string_lossy().into_owned()),
        );
        let output = spread(output, &opts.output);

        let dev_server = if primary && opts.dev_server {
            Some(self.dev_server()?)
        } else {
            None
        };

        Ok(ConfigUnit {
            name: name.map(ToString::to_string),
            mode: self.env.mode(),
            entry,
            output,
            optimization: Optimization {
                concatenate_modules: self.env.concatenate_modules(),
                minimizer: vec![self.script_minimizer()],
            },
            module: ModuleConfig {
                rules: self.module_rules(),
            },
            plugins: self.plugins(),
            dev_server,
        })
    }

    fn script_minimizer(&self) -> PluginSpec {
        let terser_options = spread(
            object(json!({
                "output": {"comments": "/translators:/i"},
                "compress": {"passes": 2},
                "mangle": {"reserved": ["__", "_n", "_nx", "_x"]},
            })),
            &self.options.terser,
        );
        PluginSpec::new(
            "terser-webpack-plugin",
            object(json!({
                "parallel": true,
                "terserOptions": terser_options,
                "extractComments": false,
            })),
        )
    }

    fn module_rules(&self) -> Vec<ModuleRule> {
        let loaders = &self.options.loaders;
        let mut rules = vec![
            ModuleRule {
                test: r"/\.m?(j|t)sx?$/".to_string(),
                exclude: Some("/node_modules/".to_string()),
                steps: script_steps(loaders),
                kind: None,
                extra: JsonObject::new(),
            },
            ModuleRule {
                test: r"/\.(sc|sa)ss$/".to_string(),
                exclude: None,
                steps: style_steps(loaders),
                kind: None,
                extra: JsonObject::new(),
            },
            ModuleRule {
                test: r"/\.(bmp|png|jpe?g|gif|svg|webp|woff|woff2|eot|ttf|otf)$/i".to_string(),
                exclude: None,
                steps: Vec::new(),
                kind: Some("asset/resource".to_string()),
                extra: JsonObject::new(),
            },
        ];
        rules.extend(self.options.module_rules.iter().cloned());
        rules
    }

    fn plugins(&self) -> Vec<PluginSpec> {
        let mut plugins = vec![
            PluginSpec::new(
                "mini-css-extract-plugin",
                object(json!({"filename": "[name].css"})),
            ),
            PluginSpec::new(
                "webpack-remove-empty-scripts",
                object(json!({"stage": "STAGE_AFTER_PROCESS_PLUGINS"})),
            ),
        ];
        plugins.extend(self.options.plugins.iter().cloned());
        plugins
    }

    fn dev_server(&self) -> Result<DevServer, Error> {
        let opts = self.options;
        let mut base = JsonObject::new();
        base.insert("host".to_string(), json!(DEV_SERVER_HOST));
        base.insert("port".to_string(), json!(DEV_SERVER_PORT));
        if let Some(start_path) = &opts.sync_start_path {
            base.insert("startPath".to_string(), json!(start_path));
        }
        base.insert("server".to_string(), serde_json::to_value(&opts.sync_base_dir)?);
        base.insert("files".to_string(), json!(opts.sync_watch_files));
        let merged = spread(base, &opts.sync_options);
        let spec = serde_json::from_value::<DevServerSpec>(JsonValue::Object(merged))
            .map_err(|e| Error::InvalidOptionValue("dev server option", "syncOptions".to_string(), e))?;
        Ok(DevServer {
            options: spec,
            plugin_options: opts.sync_plugin_options.clone(),
        })
    }
}

fn validate_entry(entry: &EntryOverride) -> Result<(), Error> {
    if let EntryOverride::Named(named) = entry {
        for (name, target) in named {
            serde_json::from_value::<NamedEntryTarget>(target.clone())
                .map_err(|e| Error::InvalidOptionValue("entry target", name.clone(), e))?;
        }
    }
    Ok(())
}

/// The accepted shapes of a named entry's target.
#[derive(Deserialize)]
#[serde(untagged)]
#[allow(dead_code)]
enum NamedEntryTarget {
    Path(String),
    Paths(Vec<String>),
    Descriptor { import: JsonValue },
}

fn object(value: JsonValue) -> JsonObject {
    match value {
        JsonValue::Object(o) => o,
        _ => JsonObject::new(),
    }
}
