//! Error taxonomy shared by every component in the pipeline.

use std::fmt::Display;

/// The failure kinds a caller can observe from any public operation.
///
/// This mirrors the taxonomy of error kinds raised across the pipeline rather
/// than one error type per component: callers compose components (Logger
/// calls Encoder calls ObservationWriter) and want one code to match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    InvalidArguments,
    InvalidConfig,
    ObservationTooBig,
    StoreFull,
    WriteFailed,
    NotFound,
    AlreadyFlushed,
    Other,
}

impl Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StatusCode::Ok => "OK",
            StatusCode::InvalidArguments => "INVALID_ARGUMENTS",
            StatusCode::InvalidConfig => "INVALID_CONFIG",
            StatusCode::ObservationTooBig => "OBSERVATION_TOO_BIG",
            StatusCode::StoreFull => "STORE_FULL",
            StatusCode::WriteFailed => "WRITE_FAILED",
            StatusCode::NotFound => "NOT_FOUND",
            StatusCode::AlreadyFlushed => "ALREADY_FLUSHED",
            StatusCode::Other => "OTHER",
        };
        f.write_str(s)
    }
}

/// A status, optionally carrying a human-readable message.
///
/// Kept as a plain struct rather than `anyhow`/`thiserror`'s `Error` trait
/// object: every component here returns by value and callers match on
/// `code()`, so there's no need for the dynamic dispatch or backtrace
/// capture those crates provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    code: StatusCode,
    message: String,
}

impl Status {
    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: String::new(),
        }
    }

    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }

    /// The worse of two statuses, `Ok` losing to anything else. Used by the
    /// Logger to fold per-report results into one returned status without
    /// rolling back the side effects that already happened.
    pub fn worst(self, other: Status) -> Status {
        if self.is_ok() {
            other
        } else {
            self
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::ok()
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for Status {}

pub type Result<T> = std::result::Result<T, Status>;

#[cfg(test)]
mod test {
    use super::*;

    #[test_log::test]
    fn worst_prefers_non_ok() {
        let ok = Status::ok();
        let err = Status::new(StatusCode::NotFound, "nope");
        assert_eq!(ok.clone().worst(err.clone()), err);
        assert_eq!(err.clone().worst(ok), err);
    }

    #[test_log::test]
    fn worst_keeps_first_error_when_both_fail() {
        let first = Status::new(StatusCode::InvalidArguments, "first");
        let second = Status::new(StatusCode::StoreFull, "second");
        assert_eq!(first.clone().worst(second), first);
    }
}
