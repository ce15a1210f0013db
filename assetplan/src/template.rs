//! Named templates that pre-populate options for known project layouts.

use std::{fmt, str::FromStr};

use log::warn;
use serde_json::{json, Value as JsonValue};

use crate::merge::OptionLayer;
use crate::Error;

/// A known project layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    /// Sources under `./assets/src`, a dev server serving the project root.
    Default,
    /// A WordPress project with plugins, must-use plugins and themes, whose
    /// dev server serves one theme's mockups.
    WordPress,
    /// A WordPress install with everything under `wp-content`.
    WordPressLegacy,
    /// The [`Template::WordPress`] layout, but with themes, plugins and
    /// must-use plugins each built as a separate named target.
    Multi,
}

impl Template {
    pub const ALL: &'static [Template] = &[
        Self::Default,
        Self::WordPress,
        Self::WordPressLegacy,
        Self::Multi,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::WordPress => "wordpress",
            Self::WordPressLegacy => "wordpress-legacy",
            Self::Multi => "multi",
        }
    }

    /// Looks up a template by name, falling back to [`Template::Default`]
    /// (with a warning) when there is no such template.
    pub fn resolve(id: &str) -> Self {
        match Self::from_str(id) {
            Ok(t) => t,
            Err(_) => {
                warn!("Unknown template \"{}\", using \"default\"", id);
                Self::Default
            }
        }
    }

    /// Produces this template's option layer. Template options sit between
    /// the built-in defaults and the caller's options, so the caller's layer
    /// is only consulted for values the template itself is parameterized by.
    pub fn shape(&self, caller: &OptionLayer) -> Result<OptionLayer, Error> {
        let layer = match self {
            Self::Default => JsonValue::Object(Default::default()),
            Self::WordPress => {
                let theme = theme_id(self, caller)?;
                let base = format!("./themes/{}", theme);
                json!({
                    "syncStartPath": "./mockup/index.html",
                    "syncBaseDir": base,
                    "syncWatchFiles": theme_watch_files(&base),
                    "folders": WORDPRESS_FOLDERS,
                })
            }
            Self::WordPressLegacy => {
                let theme = theme_id(self, caller)?;
                let folder = format!("wp-content/themes/{}", theme);
                let base = format!("./{}", folder);
                json!({
                    "syncStartPath": "./mockup/index.html",
                    "syncBaseDir": base,
                    "syncWatchFiles": theme_watch_files(&base),
                    "folders": [folder, "wp-content/mu-plugins/*", "wp-content/plugins/*"],
                })
            }
            Self::Multi => {
                let mut layer = json!({
                    "collections": [
                        {"name": "themes", "folders": ["themes/*"]},
                        {"name": "plugins", "folders": ["plugins/premise-*"]},
                        {"name": "mu-plugins", "folders": ["mu-plugins/gutenberg"]},
                    ],
                });
                if let Some(theme) = caller.get("themeId").and_then(JsonValue::as_str) {
                    let base = format!("./themes/{}", theme);
                    layer["syncStartPath"] = json!("./mockup/index.html");
                    layer["syncWatchFiles"] = json!(theme_watch_files(&base));
                    layer["syncBaseDir"] = json!(base);
                }
                layer
            }
        };
        OptionLayer::new(self.name(), layer)
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::Default
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Template {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|t| t.name() == s)
            .copied()
            .ok_or_else(|| Error::UnknownTemplate(s.to_string()))
    }
}

const WORDPRESS_FOLDERS: &[&str] = &["mu-plugins/gutenberg", "plugins/premise-*", "themes/*"];

fn theme_id(template: &Template, caller: &OptionLayer) -> Result<String, Error> {
    caller
        .get("themeId")
        .and_then(JsonValue::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(Error::MissingThemeId(template.name()))
}

// Only the theme's own assets and mockups are watched.
fn theme_watch_files(base: &str) -> Vec<String> {
    [
        "assets/img/**",
        "assets/dist/css/theme.css",
        "assets/dist/css/print.css",
        "assets/dist/css/icons.css",
        "assets/dist/js/theme.min.js",
        "mockup/*.html",
        "mockup/*.css",
        "mockup/*.js",
    ]
    .iter()
    .map(|p| format!("{}/{}", base, p))
    .collect()
}
