//! Mapping of discovered source files to the destinations they are built to.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{ser::SerializeMap, Deserialize, Serialize};

use crate::fs::{absolutize, relative_slash_path};
use crate::source::{expand_braces, Lister};
use crate::Error;

/// The glob rule used to find sources beneath each folder root.
pub const DEFAULT_SOURCE_GLOB: &str = "assets/src/{js,scss}/*.{js,scss}";

/// Produces the source glob for a folder root.
pub fn folder_glob(folder: &str) -> String {
    let folder = folder.trim_end_matches('/');
    if folder.is_empty() || folder == "." {
        DEFAULT_SOURCE_GLOB.to_string()
    } else {
        format!("{}/{}", folder, DEFAULT_SOURCE_GLOB)
    }
}

/// Returns whether the given path names an already minified build artifact,
/// e.g. `theme.min.js`.
pub fn is_pre_minified<P: AsRef<Path>>(path: P) -> bool {
    let stem = match path.as_ref().file_stem().and_then(|s| s.to_str()) {
        Some(s) => s,
        None => return false,
    };
    path.as_ref().extension().is_some() && stem.ends_with(".min")
}

/// String substitutions that turn a source path into a destination
/// identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RewriteRule {
    pub source_segment: String,
    pub dest_segment: String,
    pub style_segment: String,
    pub compiled_style_segment: String,
    pub suffix: Option<String>,
}

impl Default for RewriteRule {
    fn default() -> Self {
        Self {
            source_segment: "/src/".to_string(),
            dest_segment: "/dist/".to_string(),
            style_segment: "/scss/".to_string(),
            compiled_style_segment: "/css/".to_string(),
            suffix: None,
        }
    }
}

impl RewriteRule {
    /// Computes the destination identifier for a slash-separated source path.
    ///
    /// Only the first occurrence of each segment is replaced. The file
    /// extension is dropped when it consists of word characters only.
    pub fn rewrite(&self, path: &str) -> String {
        let mut out = path.replacen(&self.source_segment, &self.dest_segment, 1);
        out = out.replacen(&self.style_segment, &self.compiled_style_segment, 1);
        if let Some(dot) = out.rfind('.') {
            let ext = &out[dot + 1..];
            if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                out.truncate(dot);
            }
        }
        if let Some(suffix) = &self.suffix {
            out.push_str(suffix);
        }
        out
    }
}

/// What to do when two source files map to the same destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollisionPolicy {
    /// The later source replaces the earlier one; the destination keeps its
    /// original position.
    LastWriteWins,
    Error,
}

impl Default for CollisionPolicy {
    fn default() -> Self {
        Self::LastWriteWins
    }
}

/// Destination identifier -> absolute source path, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryMap(IndexMap<String, PathBuf>);

impl EntryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, returning the source it replaced if the destination
    /// was already present. A replaced entry keeps its position.
    pub fn insert<K: Into<String>>(&mut self, dest: K, source: PathBuf) -> Option<PathBuf> {
        self.0.insert(dest.into(), source)
    }

    pub fn get(&self, dest: &str) -> Option<&Path> {
        self.0.get(dest).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }
}

impl Serialize for EntryMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut sm = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            sm.serialize_entry(k, &v.to_string_lossy())?;
        }
        sm.end()
    }
}

/// Resolves source patterns into an [`EntryMap`].
pub struct PathMapper<'a> {
    lister: &'a dyn Lister,
    root: &'a Path,
    rule: RewriteRule,
    collisions: CollisionPolicy,
    debug_paths: bool,
}

impl<'a> PathMapper<'a> {
    /// Constructor. Matches are made absolute against `root`.
    pub fn new(lister: &'a dyn Lister, root: &'a Path) -> Self {
        Self {
            lister,
            root,
            rule: RewriteRule::default(),
            collisions: CollisionPolicy::default(),
            debug_paths: false,
        }
    }

    pub fn with_rule(mut self, rule: RewriteRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_collision_policy(mut self, collisions: CollisionPolicy) -> Self {
        self.collisions = collisions;
        self
    }

    /// Logs the resolved mapping once it has been computed.
    pub fn with_debug_paths(mut self, debug_paths: bool) -> Self {
        self.debug_paths = debug_paths;
        self
    }

    /// Resolves the source globs of each folder root, in order.
    pub fn resolve_folders<S: AsRef<str>>(&self, folders: &[S]) -> Result<EntryMap, Error> {
        let patterns = folders
            .iter()
            .map(|f| folder_glob(f.as_ref()))
            .collect::<Vec<_>>();
        self.resolve(&patterns)
    }

    /// Expands each pattern in order and maps every match that is not a
    /// minified artifact to its destination.
    ///
    /// Matches are sorted per pattern so the result does not depend on the
    /// order in which the file system lists directory entries.
    pub fn resolve<S: AsRef<str>>(&self, patterns: &[S]) -> Result<EntryMap, Error> {
        let mut entries = EntryMap::new();
        for pattern in patterns {
            for expanded in expand_braces(pattern.as_ref())? {
                let mut matches = self.lister.list(&expanded)?;
                matches.sort();
                for path in matches {
                    if is_pre_minified(&path) {
                        debug!("Skipping minified artifact {}", path.display());
                        continue;
                    }
                    self.insert(&mut entries, &path)?;
                }
            }
        }
        if self.debug_paths {
            for (dest, source) in entries.iter() {
                info!("{} <- {}", dest, source.display());
            }
        }
        Ok(entries)
    }

    fn insert(&self, entries: &mut EntryMap, path: &Path) -> Result<(), Error> {
        let rel = relative_slash_path(self.root, path);
        let dest = self.rule.rewrite(&rel);
        let source = absolutize(self.root, &rel);
        if let Some(existing) = entries.get(&dest) {
            if existing == source {
                return Ok(());
            }
            match self.collisions {
                CollisionPolicy::Error => {
                    return Err(Error::DestinationCollision(
                        dest,
                        existing.to_path_buf(),
                        source,
                    ))
                }
                CollisionPolicy::LastWriteWins => warn!(
                    "Destination {} was produced by {}, replacing it with {}",
                    dest,
                    existing.display(),
                    source.display()
                ),
            }
        }
        entries.insert(dest, source);
        Ok(())
    }
}
