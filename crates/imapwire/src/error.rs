//! Error types for the parser.

use thiserror::Error;

/// Errors that can occur while parsing the response stream.
///
/// Lines that match no known grammar shape are not errors: they degrade to
/// [`Event::Other`](crate::Event::Other) so the stream keeps making progress.
/// Everything below aborts the current response unit; the parser itself stays
/// usable and the caller decides whether to keep the connection.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error while reading from the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unbalanced brackets, an unterminated quote, or a literal placeholder
    /// with no collected literal left to substitute.
    #[error("malformed expression in {fragment:?}: {message}")]
    MalformedExpression {
        /// The offending line or fragment, for diagnostics.
        fragment: String,
        /// Description of what went wrong.
        message: String,
    },

    /// A builder encountered a field whose parsed shape does not match any
    /// expected variant, or a mandatory positional field was missing.
    #[error("unexpected shape in {context}: {message}")]
    UnexpectedShape {
        /// Which structure was being built.
        context: &'static str,
        /// Description of the mismatch.
        message: String,
    },

    /// The transport closed before a declared literal byte count was
    /// satisfied.
    #[error("literal ended {missing} bytes short")]
    LiteralUnderrun {
        /// How many declared bytes never arrived.
        missing: usize,
    },
}

impl Error {
    pub(crate) fn malformed(fragment: &str, message: impl Into<String>) -> Self {
        Self::MalformedExpression {
            fragment: fragment.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn shape(context: &'static str, message: impl Into<String>) -> Self {
        Self::UnexpectedShape {
            context,
            message: message.into(),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
