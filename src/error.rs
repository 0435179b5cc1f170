//! The DMR++ metadata error.
//!
//! Every failure while parsing or lazily loading a DMR++ document is reported as a [`DmzError`].
//! The surrounding framework is expected to log it and map it to a protocol error response.

use thiserror::Error;

/// An internal error raised while processing a DMR++ document.
///
/// Carries a human readable message and the source location that raised it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct DmzError {
    message: String,
    file: &'static str,
    line: u32,
}

impl DmzError {
    /// Create a new error raised at `file`:`line`.
    ///
    /// Prefer the `dmz_error!` macro, which fills in the location.
    #[must_use]
    pub fn new(message: impl Into<String>, file: &'static str, line: u32) -> Self {
        Self {
            message: message.into(),
            file,
            line,
        }
    }

    /// Return the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Return the source file that raised the error.
    #[must_use]
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// Return the source line that raised the error.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Return the message with the source location appended.
    #[must_use]
    pub fn verbose_message(&self) -> String {
        format!("{} ({}:{})", self.message, self.file, self.line)
    }
}

/// Create a [`DmzError`] from format arguments at the current source location.
macro_rules! dmz_error {
    ($($arg:tt)*) => {
        $crate::error::DmzError::new(format!($($arg)*), file!(), line!())
    };
}

pub(crate) use dmz_error;

#[cfg(test)]
mod tests {
    #[test]
    fn dmz_error_location() {
        let err = dmz_error!("missing attribute '{}'", "name");
        assert_eq!(err.message(), "missing attribute 'name'");
        assert_eq!(err.to_string(), "missing attribute 'name'");
        assert!(err.file().ends_with("error.rs"));
        assert!(err.line() > 0);
        assert!(err.verbose_message().contains("error.rs:"));
    }
}
