use std::error::Error as StdError;
use std::fmt;

/// Result type alias using RepoError
pub type Result<T> = std::result::Result<T, RepoError>;

/// Boxed cause carried by repository and backend errors
pub type BoxedCause = Box<dyn StdError + Send + Sync + 'static>;

// ========== Error Facility ==========

/// Canonical repository error kind taxonomy
///
/// Every backend variant surfaces exactly these kinds. Each kind maps to a
/// stable error code that can be used for programmatic error handling,
/// testing, and external API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepoErrorKind {
    /// Root row/item absent for the requested id, or already gone on delete
    NotFound,
    /// Unique or conditional-write violation
    Duplicate,
    /// Request or connection timeout
    Timeout,
    /// Network or server-side failure
    Connection,
    /// Anything unrecognised, including malformed stored data
    Unknown,
}

impl RepoErrorKind {
    /// All kinds, in declaration order
    pub const ALL: [RepoErrorKind; 5] = [
        RepoErrorKind::NotFound,
        RepoErrorKind::Duplicate,
        RepoErrorKind::Timeout,
        RepoErrorKind::Connection,
        RepoErrorKind::Unknown,
    ];

    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            RepoErrorKind::NotFound => "ERR_NOT_FOUND",
            RepoErrorKind::Duplicate => "ERR_DUPLICATE",
            RepoErrorKind::Timeout => "ERR_TIMEOUT",
            RepoErrorKind::Connection => "ERR_CONNECTION",
            RepoErrorKind::Unknown => "ERR_UNKNOWN",
        }
    }
}

impl fmt::Display for RepoErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RepoErrorKind::NotFound => "not found",
            RepoErrorKind::Duplicate => "duplicate",
            RepoErrorKind::Timeout => "timeout",
            RepoErrorKind::Connection => "connection",
            RepoErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Canonical structured repository error
///
/// Carries the classification kind plus context for debugging. The original
/// backend or decode failure is preserved as the `source()` cause.
#[derive(Debug)]
pub struct RepoError {
    kind: RepoErrorKind,
    op: Option<String>,
    aggregate: Option<String>,
    entity_id: Option<String>,
    message: String,
    cause: Option<BoxedCause>,
}

impl RepoError {
    /// Create a new error with the specified kind
    pub fn new(kind: RepoErrorKind) -> Self {
        Self {
            kind,
            op: None,
            aggregate: None,
            entity_id: None,
            message: String::new(),
            cause: None,
        }
    }

    /// Shorthand for a `NotFound` error on an aggregate id
    pub fn not_found(aggregate: impl Into<String>, id: impl fmt::Display) -> Self {
        let aggregate = aggregate.into();
        Self::new(RepoErrorKind::NotFound)
            .with_message(format!("{} {} not found", aggregate, id))
            .with_entity_id(id.to_string())
            .with_aggregate(aggregate)
    }

    /// Shorthand for an `Unknown` error wrapping an arbitrary cause
    pub fn unknown(cause: impl Into<BoxedCause>) -> Self {
        let cause = cause.into();
        Self::new(RepoErrorKind::Unknown)
            .with_message(cause.to_string())
            .with_cause(cause)
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add aggregate type context
    pub fn with_aggregate(mut self, aggregate: impl Into<String>) -> Self {
        self.aggregate = Some(aggregate.into());
        self
    }

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Attach the underlying cause
    pub fn with_cause(mut self, cause: impl Into<BoxedCause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> RepoErrorKind {
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

    /// Get the aggregate type context, if any
    pub fn aggregate(&self) -> Option<&str> {
        self.aggregate.as_deref()
    }

    /// Get the entity ID context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the preserved cause, if any
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Whether this error is a `NotFound`
    pub fn is_not_found(&self) -> bool {
        self.kind == RepoErrorKind::NotFound
    }
}

impl fmt::Display for RepoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code(), self.kind)?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(aggregate) = &self.aggregate {
            write!(f, " (aggregate: {})", aggregate)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        Ok(())
    }
}

impl StdError for RepoError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

// ========== End Error Facility ==========

/// Raw failure reported by a storage backend
///
/// Backends fill in whichever signals they have: an error identifier
/// (`SQLITE_BUSY`, `ConditionalCheckFailedException`), an HTTP-style status
/// code, and a human-readable message. The rule table in
/// [`crate::error_rules`] classifies it into a [`RepoErrorKind`].
#[derive(Debug)]
pub struct BackendError {
    code: Option<String>,
    status: Option<u16>,
    message: String,
    source: Option<BoxedCause>,
}

impl BackendError {
    /// Create a backend error from a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            status: None,
            message: message.into(),
            source: None,
        }
    }

    /// Add the backend error identifier
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Add an HTTP-style status code
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach the driver-level error
    pub fn with_source(mut self, source: impl Into<BoxedCause>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, self.status) {
            (Some(code), Some(status)) => write!(f, "{} ({}): {}", code, status, self.message),
            (Some(code), None) => write!(f, "{}: {}", code, self.message),
            (None, Some(status)) => write!(f, "status {}: {}", status, self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

impl StdError for BackendError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn StdError + 'static))
    }
}
