use thiserror::Error;

/// Unified error type for git-release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Not a git directory: {0}")]
    NotGit(String),

    #[error("Please stash or commit your changes")]
    NotClean,

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Latest version ({latest}) is greater than {requested}")]
    VersionRegression { latest: String, requested: String },

    #[error("The given version is already released: {0}")]
    AlreadyReleased(String),

    #[error("Cannot rebase when no version exists")]
    NoRebaseTarget,

    #[error("Expected HEAD to be latest: {0}")]
    NotAtLatestRelease(String),

    #[error("A rebase cannot be combined with an explicit version")]
    ConflictingMode,

    #[error("Nothing has changed since v{0}")]
    NoChanges(String),

    #[error("Cannot find commit for v{0}")]
    MissingTagCommit(String),

    #[error("Command failed: {0}")]
    Execution(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rollback failed after '{original}': {cause}")]
    RollbackFailed {
        original: Box<ReleaseError>,
        cause: Box<ReleaseError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Results in git-release
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create an execution error with context
    pub fn execution(msg: impl Into<String>) -> Self {
        ReleaseError::Execution(msg.into())
    }

    /// Create a manifest error with context
    pub fn manifest(msg: impl Into<String>) -> Self {
        ReleaseError::Manifest(msg.into())
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Reason code for classified (expected) failures.
    ///
    /// Unexpected failures - command errors, I/O - have no code and are
    /// surfaced with full detail instead of a single user-facing line.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            ReleaseError::NotGit(_) => Some("NOT_GIT"),
            ReleaseError::NotClean => Some("NOT_CLEAN"),
            ReleaseError::InvalidVersion(_)
            | ReleaseError::VersionRegression { .. }
            | ReleaseError::AlreadyReleased(_) => Some("BAD_VER"),
            ReleaseError::NoRebaseTarget
            | ReleaseError::NotAtLatestRelease(_)
            | ReleaseError::ConflictingMode => Some("BAD_REBASE"),
            ReleaseError::NoChanges(_) => Some("NO_CHANGES"),
            ReleaseError::MissingTagCommit(_) => Some("NO_LATEST_SHA"),
            _ => None,
        }
    }

    /// True for expected, validation-style failures.
    pub fn is_classified(&self) -> bool {
        self.code().is_some()
    }
}
