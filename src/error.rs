use thiserror::Error;

/// Parse failure with the offending expression attached.
///
/// The original input is echoed back so that the rendered message reads
/// `Invalid cron expression [<input>]. <reason>`.
#[derive(Debug, Error, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[error("Invalid cron expression [{pattern}]. {kind}")]
pub struct CronError {
    pattern: String,
    kind: ErrorKind,
}

impl CronError {
    pub(crate) fn new(pattern: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            pattern: pattern.into(),
            kind,
        }
    }

    /// The expression text as it was passed to the parser.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The reason the expression was rejected.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

/// Reason part of a [`CronError`].
#[derive(Debug, Error, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Input is empty or contains only whitespace.
    #[error("Empty expression")]
    EmptyExpression,
    /// Field count after whitespace splitting is not 4 or 5.
    #[error("Expected [4 to 5] fields but found [{0}] fields")]
    WrongFieldCount(usize),
    /// An `@`-prefixed input with no entry in the macro table.
    #[error("Unknown macro [{0}]")]
    UnknownMacro(String),
    /// A sub-part of a field does not lex.
    #[error("Invalid token [{token}] in field [{field}]")]
    BadToken {
        /// Field the token was found in.
        field: &'static str,
        /// The offending token.
        token: String,
    },
    /// A numeric literal outside the field's allowed range.
    #[error("Value [{value}] out of range for field [{field}]")]
    OutOfRange {
        /// Field the value was found in.
        field: &'static str,
        /// The offending value.
        value: u32,
    },
    /// An extension (`?`, `L`, `LW`, `W`, `#`) used in a field which does not
    /// support it.
    #[error("Token [{token}] is not allowed in field [{field}]")]
    MisplacedExtension {
        /// Field the token was found in.
        field: &'static str,
        /// The offending token.
        token: String,
    },
}
