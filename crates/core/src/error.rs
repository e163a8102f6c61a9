//! Error types for Strata fixtures
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Errors fall in two groups:
//! - Compilation errors (`InvalidLiteral`, `DuplicateFieldName`, ...) are local
//!   and always raised before any store interaction, wrapped in `Compilation`.
//! - Lifecycle errors (`InstanceUnavailable`, `IndexAlreadyExists`,
//!   `MappingMismatch`, `Teardown`, `Store`) come from driving a store instance.

use std::fmt;
use thiserror::Error;

/// Result type alias for fixture operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for store collaborator calls
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Error types for schema compilation and fixture lifecycle
#[derive(Debug, Error)]
pub enum Error {
    /// Duration or size literal could not be parsed
    #[error("Invalid literal '{literal}': {reason}")]
    InvalidLiteral {
        /// The offending literal
        literal: String,
        /// Why it was rejected
        reason: String,
    },

    /// Index, type or field name is not acceptable to the store
    #[error("Invalid {kind} name '{name}': {reason}")]
    InvalidName {
        /// What was being named ("index", "type", "field")
        kind: &'static str,
        /// The offending name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Two fields (or groups) share a name within one field map
    #[error("Duplicate field name '{field}' in '{owner}'")]
    DuplicateFieldName {
        /// Type or multi-field group owning the field map
        owner: String,
        /// The duplicated name
        field: String,
    },

    /// Two type mappings share a name within one index
    #[error("Duplicate type name '{0}'")]
    DuplicateTypeName(String),

    /// A field sets both a single analyzer and an index/search analyzer pair
    #[error("Field '{0}' sets both 'analyzer' and an index/search analyzer pair")]
    ConflictingAnalyzers(String),

    /// An option was given that the field's type cannot carry
    #[error("Field '{field}' of type '{field_type}' does not accept option '{option}'")]
    InvalidFieldOption {
        /// Field name
        field: String,
        /// Wire type of the field
        field_type: &'static str,
        /// Rejected option
        option: &'static str,
    },

    /// `_parent` names a type that is not part of the index
    #[error("Type '{type_name}' references unknown parent type '{parent}'")]
    UnknownParentType {
        /// Child type
        type_name: String,
        /// Referenced parent type
        parent: String,
    },

    /// Schema compilation failed; wraps the first inner failure
    #[error("Failed to compile schema for index '{index}': {source}")]
    Compilation {
        /// Index being compiled
        index: String,
        /// First failure encountered
        source: Box<Error>,
    },

    /// A store instance did not report ready within its retry budget
    #[error("Instance '{instance}' not ready after {attempts} attempts")]
    InstanceUnavailable {
        /// Instance name or id
        instance: String,
        /// Number of readiness polls issued
        attempts: u32,
    },

    /// Index already exists and force-recreate was not requested
    #[error("Index '{0}' already exists")]
    IndexAlreadyExists(String),

    /// Index creation or deletion did not become visible in time
    #[error("Index '{index}' still {still} after {attempts} attempts")]
    IndexPropagation {
        /// Index name
        index: String,
        /// "missing" after create, "present" after drop
        still: &'static str,
        /// Number of existence polls issued
        attempts: u32,
    },

    /// Stored mapping differs from the compiled one
    #[error("Mapping mismatch for '{index}/{type_name}' at {path}: expected {expected}, found {actual}")]
    MappingMismatch {
        /// Index name
        index: String,
        /// Type name
        type_name: String,
        /// JSON path of the first difference
        path: String,
        /// Compiled value at `path`
        expected: String,
        /// Stored value at `path` (`<missing>` if absent)
        actual: String,
    },

    /// One or more teardown steps failed
    #[error("Teardown failed: {0}")]
    Teardown(TeardownFailure),

    /// Lifecycle operation invoked in a state that does not allow it
    #[error("Invalid state: cannot {operation} while {state}")]
    InvalidState {
        /// Attempted operation
        operation: &'static str,
        /// Current fixture state
        state: String,
    },

    /// Fixture configuration could not be read or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// External store collaborator failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The test body returned an error
    #[error("Test body failed: {0}")]
    Body(Box<dyn std::error::Error + Send + Sync>),

    /// A primary failure followed by teardown failures
    #[error("{source} (teardown also failed: {teardown})")]
    WithTeardown {
        /// The failure that ended the fixture
        source: Box<Error>,
        /// Failures collected while tearing down
        teardown: TeardownFailure,
    },
}

impl Error {
    /// Create an `InvalidLiteral` error
    pub fn invalid_literal(literal: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidLiteral {
            literal: literal.into(),
            reason: reason.into(),
        }
    }

    /// Create an `InvalidName` error
    pub fn invalid_name(
        kind: &'static str,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidName {
            kind,
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an inner failure as a `Compilation` error for `index`
    pub fn compilation(index: impl Into<String>, inner: Error) -> Self {
        Error::Compilation {
            index: index.into(),
            source: Box::new(inner),
        }
    }

    /// Attach teardown failures to this error, unless there are none
    pub fn with_teardown(self, teardown: TeardownFailure) -> Self {
        if teardown.is_empty() {
            self
        } else {
            Error::WithTeardown {
                source: Box::new(self),
                teardown,
            }
        }
    }

    /// Returns the innermost failure, looking through `Compilation` and `WithTeardown`
    pub fn root(&self) -> &Error {
        match self {
            Error::Compilation { source, .. } | Error::WithTeardown { source, .. } => source.root(),
            other => other,
        }
    }

    /// True if this is a compilation failure (raised before any store interaction)
    pub fn is_compilation(&self) -> bool {
        match self {
            Error::Compilation { .. } => true,
            Error::WithTeardown { source, .. } => source.is_compilation(),
            _ => false,
        }
    }
}

/// Errors reported by the external store collaborators
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The instance handle refers to a stopped or unknown instance
    #[error("instance {0} is not running")]
    InstanceNotRunning(String),

    /// The index does not exist
    #[error("index '{0}' not found")]
    IndexNotFound(String),

    /// The index already exists
    #[error("index '{0}' already exists")]
    IndexExists(String),

    /// The store refused the request
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The store could not be reached
    #[error("transport error: {0}")]
    Transport(String),
}

/// One failed teardown step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownIssue {
    /// Resource being released ("index 'library'", "instance ...")
    pub resource: String,
    /// Failure message
    pub message: String,
}

impl fmt::Display for TeardownIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.resource, self.message)
    }
}

/// Aggregated teardown failures
///
/// Teardown never stops at the first failure; every step is attempted and
/// failures are collected here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownFailure {
    /// Failed steps, in the order they were attempted
    pub issues: Vec<TeardownIssue>,
}

impl TeardownFailure {
    /// Record a failed step
    pub fn push(&mut self, resource: impl Into<String>, message: impl fmt::Display) {
        self.issues.push(TeardownIssue {
            resource: resource.into(),
            message: message.to_string(),
        });
    }

    /// True if no step failed
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of failed steps
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// `Ok(())` if no step failed
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Teardown(self))
        }
    }
}

impl fmt::Display for TeardownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", issue)?;
        }
        Ok(())
    }
}
