use std::path::PathBuf;

use thiserror::Error;

/// Broad classification of failures, used by callers that need to tell a
/// broken file system apart from a broken set of options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The file system listing collaborator failed.
    Resolution,
    /// The options handed to the generator cannot be reconciled.
    Configuration,
    /// An options file could not be read.
    Io,
}

/// The primary error type that can be produced by assetplan.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to list {} for pattern \"{pattern}\": {source}", .path.display())]
    Resolution {
        pattern: String,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse source file pattern \"{0}\": {1}")]
    SourceFilePattern(String, glob::PatternError),
    #[error("unbalanced braces in source file pattern \"{0}\"")]
    UnbalancedBraces(String),
    #[error("option layer \"{0}\" must be an object")]
    LayerMustBeObject(String),
    #[error("option \"{0}\" must be an array or an object of the form {{\"replace\": [...]}}")]
    InvalidListPatch(String),
    #[error("invalid options: {0}")]
    InvalidOptions(serde_json::Error),
    #[error("invalid {0} in option \"{1}\": {2}")]
    InvalidOptionValue(&'static str, String, serde_json::Error),
    #[error("an explicit \"entry\" cannot be combined with {0} collections")]
    EntryWithCollections(usize),
    #[error("collection \"{0}\" is declared more than once")]
    DuplicateCollection(String),
    #[error("destination \"{0}\" is produced by both {1} and {2}")]
    DestinationCollision(String, PathBuf, PathBuf),
    #[error("unknown template \"{0}\"")]
    UnknownTemplate(String),
    #[error("theme identifier is required by the \"{0}\" template")]
    MissingThemeId(&'static str),
    #[error("unsupported options file type: {0}")]
    UnsupportedFileType(String),
    #[error("cannot determine file type of file: {0}")]
    CannotDetermineFileType(PathBuf),
    #[error("failed to load options from file {0}")]
    FailedToLoadOptions(PathBuf),
    #[error("I/O error {0}: {1}")]
    Io(String, std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),
}

impl Error {
    /// Which part of the error taxonomy this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Resolution { .. } => ErrorKind::Resolution,
            Self::Io(..) | Self::FailedToLoadOptions(_) => ErrorKind::Io,
            _ => ErrorKind::Configuration,
        }
    }
}
