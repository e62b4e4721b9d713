//! Error types for bundling operations.
//!
//! Every fatal condition of a bundling run maps onto one variant here. The
//! [`Context`] and [`ErrorExt`] traits attach the failing operation and path
//! so messages always name what was being done and to which file.

use std::{fmt::Display, path::PathBuf};
use thiserror::Error;

/// Result type alias for bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while bundling, signing or packaging.
#[derive(Debug, Error)]
pub enum Error {
    /// Error with additional context.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// Bad setup: missing destination, no files specified, missing credentials.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// Filesystem-level failure that is not tied to a single io call.
    #[error("file error: {0}")]
    FileError(String),

    /// Filesystem operation failed on a specific path.
    #[error("{context} {}: {error}", .path.display())]
    Fs {
        /// Operation being performed.
        context: &'static str,
        /// Path the operation was applied to.
        path: PathBuf,
        /// Underlying OS error.
        error: std::io::Error,
    },

    /// A file failed an integrity precondition before being copied or signed.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// An external tool returned a non-zero exit status.
    #[error("command `{command}` failed with exit code {code}{}", format_output(.output))]
    CommandError {
        /// Command line that was run.
        command: String,
        /// Exit code (-1 when terminated by a signal).
        code: i32,
        /// Captured stderr, if any.
        output: Option<String>,
    },

    /// An external tool could not be spawned at all.
    #[error("failed to run `{command}`: {error}")]
    ToolInvocationFailed {
        /// Command line that was attempted.
        command: String,
        /// Spawn error.
        error: std::io::Error,
    },

    /// A file whose load commands must be read does not exist.
    #[error("cannot find file {} to read its dependencies", .0.display())]
    FileNotFound(PathBuf),

    /// A dependency reference could not be mapped to a file on disk.
    #[error("cannot resolve `{reference}` referenced by {}", .referencing_file.display())]
    FileNotResolvable {
        /// Raw reference as found in the load command.
        reference: String,
        /// File that carries the load command.
        referencing_file: PathBuf,
    },

    /// The operator aborted an interactive library location prompt.
    #[error("user aborted dependency resolution for {0}")]
    UserAborted(String),

    /// The introspection tool output did not follow the expected layout.
    #[error("malformed otool output for {}: {reason}", .path.display())]
    MalformedToolOutput {
        /// File whose output was being parsed.
        path: PathBuf,
        /// What was wrong.
        reason: String,
    },

    /// The destination directory cannot be used.
    #[error("destination directory {} is unavailable: {reason}", .path.display())]
    DestinationUnavailable {
        /// Destination directory.
        path: PathBuf,
        /// Why it cannot be used.
        reason: String,
    },

    /// Ad-hoc signing of a bundled file failed after the retry workaround.
    #[error("failed to sign {}: {reason}", .path.display())]
    SigningFailed {
        /// File that could not be signed.
        path: PathBuf,
        /// Last signing error.
        reason: String,
    },

    /// Recursive code signing or signature verification failed.
    #[error("codesign error: {0}")]
    CodesignError(String),

    /// Notarization or stapling failed.
    #[error("notarization error: {0}")]
    NotarizationError(String),

    /// DMG creation failed.
    #[error("packaging error: {0}")]
    PackagingError(String),

    /// Plain IO error.
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    /// Info.plist serialization error.
    #[error("plist error: {0}")]
    PlistError(#[from] plist::Error),

    /// Generic error.
    #[error("{0}")]
    GenericError(String),
}

fn format_output(output: &Option<String>) -> String {
    match output {
        Some(out) if !out.trim().is_empty() => format!(": {}", out.trim()),
        _ => String::new(),
    }
}

/// Attaches a message to the error of a `Result` or to a missing `Option` value.
pub trait Context<T> {
    /// Wraps the error value with additional context.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Wraps the error value with lazily evaluated context.
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Attaches the failing operation and path to io errors.
pub trait ErrorExt<T> {
    /// Converts an io error into [`Error::Fs`].
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Returns early with a [`Error::GenericError`].
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::bundler::Error::GenericError($msg.into()))
    };
    ($err:expr $(,)?) => {
        return Err($crate::bundler::Error::GenericError($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($fmt, $($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_error_message_includes_stderr() {
        let err = Error::CommandError {
            command: "install_name_tool -id x lib".into(),
            code: 1,
            output: Some("error: no such file\n".into()),
        };
        assert_eq!(
            err.to_string(),
            "command `install_name_tool -id x lib` failed with exit code 1: error: no such file"
        );
    }

    #[test]
    fn context_keeps_command_classification() {
        let res: Result<()> = Err(Error::CommandError {
            command: "codesign".into(),
            code: 1,
            output: None,
        });
        let err = res.context("signing libfoo.dylib").unwrap_err();
        assert!(matches!(
            &err,
            Error::Context(_, inner) if matches!(**inner, Error::CommandError { .. })
        ));
        assert!(err.to_string().starts_with("signing libfoo.dylib: "));
    }

    #[test]
    fn fs_context_names_path() {
        let io: std::io::Result<()> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let err = io.fs_context("failed to copy", "/tmp/a.dylib").unwrap_err();
        assert_eq!(err.to_string(), "failed to copy /tmp/a.dylib: gone");
    }
}
