//! Backend error classification
//!
//! An ordered table of `(predicate, kind, message template)` rules evaluated
//! top-to-bottom. The first matching rule wins; when nothing matches the
//! error is `Unknown`. Classification is total and deterministic: it reads
//! only the code, status and message of the [`BackendError`].

use crate::errors::{BackendError, RepoError, RepoErrorKind};

/// One classification rule
pub struct Rule {
    pub name: &'static str,
    pub kind: RepoErrorKind,
    matches: fn(&BackendError) -> bool,
    /// `{msg}` is replaced with the backend message
    template: &'static str,
}

impl Rule {
    pub fn matches(&self, err: &BackendError) -> bool {
        (self.matches)(err)
    }

    pub fn render(&self, err: &BackendError) -> String {
        self.template.replace("{msg}", err.message())
    }
}

fn code_is(err: &BackendError, codes: &[&str]) -> bool {
    err.code().is_some_and(|code| codes.contains(&code))
}

fn code_starts_with(err: &BackendError, prefixes: &[&str]) -> bool {
    err.code()
        .is_some_and(|code| prefixes.iter().any(|p| code.starts_with(p)))
}

fn message_contains(err: &BackendError, needles: &[&str]) -> bool {
    let message = err.message().to_ascii_lowercase();
    needles.iter().any(|needle| message.contains(needle))
}

/// Identifier used by backends for calls on a closed connection
pub const CONNECTION_CLOSED: &str = "CONNECTION_CLOSED";

/// The rule table, in evaluation order
pub static RULES: &[Rule] = &[
    // Backend identifiers first: they are the most specific signal.
    Rule {
        name: "conditional_write_failed",
        kind: RepoErrorKind::Duplicate,
        matches: |e| code_is(e, &["ConditionalCheckFailedException"]),
        template: "conditional write rejected: {msg}",
    },
    Rule {
        name: "sqlite_unique",
        kind: RepoErrorKind::Duplicate,
        matches: |e| {
            code_is(
                e,
                &["SQLITE_CONSTRAINT_PRIMARYKEY", "SQLITE_CONSTRAINT_UNIQUE"],
            )
        },
        template: "duplicate key: {msg}",
    },
    Rule {
        name: "resource_not_found",
        kind: RepoErrorKind::NotFound,
        matches: |e| code_is(e, &["ResourceNotFoundException"]),
        template: "resource not found: {msg}",
    },
    Rule {
        name: "sqlite_busy",
        kind: RepoErrorKind::Timeout,
        matches: |e| code_starts_with(e, &["SQLITE_BUSY", "SQLITE_LOCKED"]),
        template: "database busy: {msg}",
    },
    Rule {
        name: "throughput_exceeded",
        kind: RepoErrorKind::Timeout,
        matches: |e| {
            code_is(
                e,
                &[
                    "ProvisionedThroughputExceededException",
                    "RequestLimitExceeded",
                ],
            )
        },
        template: "request throttled: {msg}",
    },
    Rule {
        name: "sqlite_unavailable",
        kind: RepoErrorKind::Connection,
        matches: |e| {
            code_starts_with(e, &["SQLITE_CANTOPEN", "SQLITE_IOERR", "SQLITE_NOTADB"])
                || code_is(e, &[CONNECTION_CLOSED, "InternalServerError", "ServiceUnavailable"])
        },
        template: "storage unavailable: {msg}",
    },
    // HTTP-style status codes.
    Rule {
        name: "status_404",
        kind: RepoErrorKind::NotFound,
        matches: |e| e.status() == Some(404),
        template: "not found: {msg}",
    },
    Rule {
        name: "status_409",
        kind: RepoErrorKind::Duplicate,
        matches: |e| e.status() == Some(409),
        template: "conflict: {msg}",
    },
    Rule {
        name: "status_timeout",
        kind: RepoErrorKind::Timeout,
        matches: |e| matches!(e.status(), Some(408 | 504)),
        template: "request timed out: {msg}",
    },
    Rule {
        name: "status_5xx",
        kind: RepoErrorKind::Connection,
        matches: |e| e.status().is_some_and(|s| (500..600).contains(&s)),
        template: "server error: {msg}",
    },
    // Message substrings last.
    Rule {
        name: "message_timeout",
        kind: RepoErrorKind::Timeout,
        matches: |e| message_contains(e, &["timed out", "timeout", "database is locked"]),
        template: "timed out: {msg}",
    },
    Rule {
        name: "message_connection",
        kind: RepoErrorKind::Connection,
        matches: |e| {
            message_contains(
                e,
                &[
                    "connection refused",
                    "connection reset",
                    "broken pipe",
                    "unable to open database",
                ],
            )
        },
        template: "connection failed: {msg}",
    },
    Rule {
        name: "message_duplicate",
        kind: RepoErrorKind::Duplicate,
        matches: |e| message_contains(e, &["unique constraint failed", "duplicate key"]),
        template: "duplicate key: {msg}",
    },
];

const FALLBACK_TEMPLATE: &str = "unrecognized backend error: {msg}";

/// First rule matching `err`, if any
pub fn matching_rule(err: &BackendError) -> Option<&'static Rule> {
    RULES.iter().find(|rule| rule.matches(err))
}

/// Classify a backend error into the repository taxonomy
pub fn classify(err: &BackendError) -> RepoErrorKind {
    matching_rule(err)
        .map(|rule| rule.kind)
        .unwrap_or(RepoErrorKind::Unknown)
}

/// Build the uniform repository error for a backend failure
///
/// The backend error is preserved as the `source()` cause.
pub fn translate(err: BackendError, op: &str) -> RepoError {
    let (kind, message) = match matching_rule(&err) {
        Some(rule) => (rule.kind, rule.render(&err)),
        None => (
            RepoErrorKind::Unknown,
            FALLBACK_TEMPLATE.replace("{msg}", err.message()),
        ),
    };
    RepoError::new(kind)
        .with_op(op)
        .with_message(message)
        .with_cause(err)
}
