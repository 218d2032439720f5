/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Number of aggregated problems rendered by `Display` before summarising
pub const MAX_DISPLAYED_PROBLEMS: usize = 30;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// This taxonomy provides a stable, structured classification of all errors
/// raised by the vault. Each kind maps to a stable error code that can be
/// used for programmatic error handling, testing, and CLI exit reporting.
///
/// Store failures form a hierarchy: `MissingBlob` is a `DatabaseIntegrity`
/// error, which is in turn a `Database` error. Not-found failures form a
/// second hierarchy rooted at `MissingResource`. Use the `is_*` classifiers
/// instead of matching on individual kinds when the family is what matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    // Caller errors
    /// Invalid argument (absolute blob subdirectory, escaping path, bad digest text)
    InvalidInput,
    /// Manifest document is malformed or violates snapshot invariants
    InvalidManifest,
    /// Manifest declares a schema newer than this build understands
    UnsupportedSchema,

    // Integration/IO
    Io,
    Serialization,

    // Blob store
    /// Fatal failure while interacting with the blob store; not necessarily corruption
    Database,
    /// The blob store itself is corrupt
    DatabaseIntegrity,
    /// A blob referenced by a manifest is absent from the blob store
    MissingBlob,

    // External resources
    /// Content did not hash to its expected digest
    IntegrityMismatch,
    /// A destination directory (not the vault) is missing or mismatched files
    VerificationFailed,
    /// A requested resource does not exist
    MissingResource,
    /// No manifest exists for the requested artifact
    MissingVersion,
    /// The version string is not present in the catalog
    UnknownVersion,

    // Ingest
    /// The artifact already has a manifest and overwrite was not requested
    AlreadyIngested,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidManifest => "ERR_INVALID_MANIFEST",
            ExErrorKind::UnsupportedSchema => "ERR_UNSUPPORTED_SCHEMA",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Database => "ERR_DATABASE",
            ExErrorKind::DatabaseIntegrity => "ERR_DATABASE_INTEGRITY",
            ExErrorKind::MissingBlob => "ERR_MISSING_BLOB",
            ExErrorKind::IntegrityMismatch => "ERR_INTEGRITY_MISMATCH",
            ExErrorKind::VerificationFailed => "ERR_VERIFICATION_FAILED",
            ExErrorKind::MissingResource => "ERR_MISSING_RESOURCE",
            ExErrorKind::MissingVersion => "ERR_MISSING_VERSION",
            ExErrorKind::UnknownVersion => "ERR_UNKNOWN_VERSION",
            ExErrorKind::AlreadyIngested => "ERR_ALREADY_INGESTED",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// True for every failure of the blob store itself, corrupt or transient
    pub fn is_database_error(&self) -> bool {
        matches!(
            self,
            ExErrorKind::Database | ExErrorKind::DatabaseIntegrity | ExErrorKind::MissingBlob
        )
    }

    /// True when the blob store is known to be corrupt
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            ExErrorKind::DatabaseIntegrity | ExErrorKind::MissingBlob
        )
    }

    /// True for the not-found family (resource, version, catalog entry)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ExErrorKind::MissingResource | ExErrorKind::MissingVersion | ExErrorKind::UnknownVersion
        )
    }
}

/// Canonical structured error type
///
/// Carries a classification kind plus optional context (operation, digest,
/// path). Aggregate failures from verification carry every individual
/// problem found, each of which is itself an `ExError`.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    digest: Option<String>,
    path: Option<String>,
    message: String,
    io_kind: Option<std::io::ErrorKind>,
    source: Option<Box<ExError>>,
    problems: Vec<ExError>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            digest: None,
            path: None,
            message: String::new(),
            io_kind: None,
            source: None,
            problems: Vec::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add digest context
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    /// Add filesystem path context
    pub fn with_path(mut self, path: impl AsRef<std::path::Path>) -> Self {
        self.path = Some(path.as_ref().display().to_string());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Keep the `std::io::ErrorKind` of the underlying filesystem failure
    pub fn with_io_kind(mut self, kind: std::io::ErrorKind) -> Self {
        self.io_kind = Some(kind);
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Attach the individual problems of an aggregate failure
    pub fn with_problems(mut self, problems: Vec<ExError>) -> Self {
        self.problems = problems;
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the digest context, if any
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Get the path context, if any
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Filesystem error kind, looked up through wrapped sources
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        self.io_kind
            .or_else(|| self.source.as_deref().and_then(ExError::io_kind))
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }

    /// Individual problems of an aggregate failure (empty otherwise)
    pub fn problems(&self) -> &[ExError] {
        &self.problems
    }

    /// Digests named by the aggregated problems, deduplicated and sorted
    pub fn problem_digests(&self) -> Vec<&str> {
        let mut digests: Vec<&str> = self.problems.iter().filter_map(|p| p.digest()).collect();
        digests.sort_unstable();
        digests.dedup();
        digests
    }

    /// Shorthand for `self.kind().is_database_error()`
    pub fn is_database_error(&self) -> bool {
        self.kind.is_database_error()
    }

    /// Shorthand for `self.kind().is_integrity_error()`
    pub fn is_integrity_error(&self) -> bool {
        self.kind.is_integrity_error()
    }

    /// Shorthand for `self.kind().is_not_found()`
    pub fn is_not_found(&self) -> bool {
        self.kind.is_not_found()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, " (digest: {})", digest)?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path)?;
        }
        if let Some(source) = &self.source {
            write!(f, " caused by {}", source)?;
        }
        for problem in self.problems.iter().take(MAX_DISPLAYED_PROBLEMS) {
            write!(f, "\n\tProblem - {}", problem)?;
        }
        if self.problems.len() > MAX_DISPLAYED_PROBLEMS {
            write!(
                f,
                "\n\t...and {} additional problems",
                self.problems.len() - MAX_DISPLAYED_PROBLEMS
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========
