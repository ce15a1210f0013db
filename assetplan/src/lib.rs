//! Assetplan works out what a front-end asset build should do: which script
//! and style sources exist, where each of them should be built to, and how
//! the transform pipeline for them should be configured.
//!
//! It does not build anything itself. The configuration it produces is handed
//! to external build tooling. For assetplan's command line interface, see the
//! `assetplan-cli` crate.
//!
//! ```no_run
//! use serde_json::json;
//!
//! let generated = assetplan::generate_named("wordpress", json!({"themeId": "acme"}))?;
//! println!("{}", serde_json::to_string_pretty(&generated)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod assembler;
mod config;
mod error;
mod fs;
mod generator;
mod hash;
mod merge;
mod path_map;
mod registry;
mod source;
mod steps;
mod template;

pub use assembler::{
    Assembler, ConfigUnit, DevServer, DevServerSpec, Entry, ModuleConfig, Optimization,
    DEV_SERVER_HOST, DEV_SERVER_PORT,
};
pub use config::{
    load_layer_from_file, BabelOptions, CollectionSpec, EntryOverride, Environment,
    LoaderOptions, Mode, Options, PostcssOptions, ServerBase, SupportedFormat,
    DEFAULT_WATCH_FILES,
};
pub use error::{Error, ErrorKind};
pub use generator::{generate_default, generate_named, Generated, Generator};
pub use merge::{merge_layers, rule_for, JsonObject, MergeRule, OptionLayer, MERGE_TABLE};
pub use path_map::{
    folder_glob, is_pre_minified, CollisionPolicy, EntryMap, PathMapper, RewriteRule,
    DEFAULT_SOURCE_GLOB,
};
pub use registry::{minifier_registry, SelectedStep, StepHandle, StepRegistry};
pub use source::{expand_braces, GlobLister, Lister};
pub use steps::{
    minify_steps, script_steps, style_steps, MinifyPreset, ModuleRule, PluginSpec, Step,
};
pub use template::Template;
