//! Definition parse errors.

use thiserror::Error;

/// Why a definition file was rejected. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: `{keyword}` requires a value")]
    MissingValue { line: usize, keyword: String },

    #[error("line {line}: invalid value `{value}` for `{keyword}`: {reason}")]
    InvalidValue {
        line: usize,
        keyword: String,
        value: String,
        reason: String,
    },

    #[error("`{block}` block opened on line {opened_at} has no matching `end`")]
    UnterminatedBlock { block: String, opened_at: usize },

    #[error("line {line}: unknown data-source kind `{kind}`")]
    UnknownProvider { line: usize, kind: String },

    #[error("line {line}: duplicate {what} `{key}`")]
    Duplicate {
        line: usize,
        what: &'static str,
        key: String,
    },

    #[error("line {line}: only one data-source is allowed per definition")]
    MultipleProviders { line: usize },

    #[error("missing required directive `{0}`")]
    MissingDirective(&'static str),
}

/// Result type for definition parsing.
pub type ParseResult<T> = Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ParseError::UnterminatedBlock {
            block: "data-source mssql".to_string(),
            opened_at: 4,
        };
        assert_eq!(
            err.to_string(),
            "`data-source mssql` block opened on line 4 has no matching `end`"
        );
    }
}
