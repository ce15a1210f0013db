//! Source file discovery.

use std::path::{Path, PathBuf};

use log::debug;

use crate::Error;

/// Lists the files matching a glob-style pattern.
///
/// Implementations may return matches in any order. Relative patterns are
/// interpreted against the lister's own root and matches are returned
/// relative to that root.
pub trait Lister {
    fn list(&self, pattern: &str) -> Result<Vec<PathBuf>, Error>;
}

/// Lists files from the local file system using the [`glob`] crate.
#[derive(Debug, Clone)]
pub struct GlobLister {
    root: PathBuf,
}

impl GlobLister {
    /// Constructor. Relative patterns are resolved against `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl Lister for GlobLister {
    fn list(&self, pattern: &str) -> Result<Vec<PathBuf>, Error> {
        let full = if Path::new(pattern).is_absolute() {
            pattern.to_string()
        } else {
            let root = glob::Pattern::escape(&self.root.to_string_lossy());
            format!("{}/{}", root.trim_end_matches('/'), pattern)
        };
        let paths = glob::glob(&full).map_err(|e| Error::SourceFilePattern(pattern.to_string(), e))?;
        let mut matches = Vec::new();
        for entry in paths {
            let path = entry.map_err(|e| Error::Resolution {
                pattern: pattern.to_string(),
                path: e.path().to_path_buf(),
                source: e.into_error(),
            })?;
            if !path.is_file() {
                continue;
            }
            matches.push(match path.strip_prefix(&self.root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => path,
            });
        }
        debug!("Pattern {} matched {} file(s)", pattern, matches.len());
        Ok(matches)
    }
}

/// Expands `{a,b}` alternatives in a pattern into the equivalent list of
/// plain glob patterns, which the [`glob`] crate cannot handle itself.
///
/// Groups are expanded left to right, so `{js,scss}/*.{js,scss}` produces
/// `js/*.js`, `js/*.scss`, `scss/*.js`, `scss/*.scss`. Groups may not nest.
pub fn expand_braces(pattern: &str) -> Result<Vec<String>, Error> {
    let open = match pattern.find('{') {
        Some(i) => i,
        None => {
            if pattern.contains('}') {
                return Err(Error::UnbalancedBraces(pattern.to_string()));
            }
            return Ok(vec![pattern.to_string()]);
        }
    };
    let close = pattern[open..]
        .find('}')
        .map(|i| open + i)
        .ok_or_else(|| Error::UnbalancedBraces(pattern.to_string()))?;
    let group = &pattern[open + 1..close];
    if group.contains('{') || pattern[..open].contains('}') {
        return Err(Error::UnbalancedBraces(pattern.to_string()));
    }
    let prefix = &pattern[..open];
    let rest = expand_braces(&pattern[close + 1..])?;
    let mut expanded = Vec::new();
    for alt in group.split(',') {
        for tail in &rest {
            expanded.push(format!("{}{}{}", prefix, alt, tail));
        }
    }
    Ok(expanded)
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;

    #[test]
    fn brace_expansion_is_ordered() {
        assert_eq!(
            expand_braces("a/src/{js,scss}/*.{js,scss}").unwrap(),
            vec![
                "a/src/js/*.js",
                "a/src/js/*.scss",
                "a/src/scss/*.js",
                "a/src/scss/*.scss",
            ]
        );
        assert_eq!(expand_braces("plain/*.js").unwrap(), vec!["plain/*.js"]);
    }

    #[test]
    fn brace_expansion_rejects_unbalanced() {
        assert!(matches!(
            expand_braces("a/{js"),
            Err(Error::UnbalancedBraces(_))
        ));
        assert!(matches!(
            expand_braces("a/js}"),
            Err(Error::UnbalancedBraces(_))
        ));
        assert!(matches!(
            expand_braces("a/{js,{x,y}}"),
            Err(Error::UnbalancedBraces(_))
        ));
    }

    #[test]
    fn glob_lister_returns_relative_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("assets/src/js/nested")).unwrap();
        fs::write(dir.path().join("assets/src/js/app.js"), "").unwrap();

        let lister = GlobLister::new(dir.path());
        let found = lister.list("assets/src/js/*").unwrap();
        assert_eq!(found, vec![PathBuf::from("assets/src/js/app.js")]);
    }

    #[test]
    fn glob_lister_rejects_bad_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let lister = GlobLister::new(dir.path());
        let err = lister.list("assets/[").unwrap_err();
        assert!(matches!(err, Error::SourceFilePattern(..)));
    }
}
