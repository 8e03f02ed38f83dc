use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error code Node.js attaches to ESM-syntax lexer failures.
pub const ESM_SYNTAX_CODE: &str = "ERR_LEXER_ESM_SYNTAX";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LexErrorKind {
    /// A `)` or `}` with nothing open to close.
    UnexpectedToken,
    /// String, comment, template or regex literal reached end of input.
    UnterminatedLiteral,
    /// End of input with brackets still open.
    UnterminatedBracket,
    /// A quoted name or specifier contained a malformed escape.
    UnescapeFailure,
    /// `import`/`export` statement syntax: the source is not CommonJS.
    EsmSyntaxDetected,
    /// Input exceeded a configured size or nesting limit.
    ResourceLimit,
}

impl LexErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LexErrorKind::UnexpectedToken => "UnexpectedToken",
            LexErrorKind::UnterminatedLiteral => "UnterminatedLiteral",
            LexErrorKind::UnterminatedBracket => "UnterminatedBracket",
            LexErrorKind::UnescapeFailure => "UnescapeFailure",
            LexErrorKind::EsmSyntaxDetected => "EsmSyntaxDetected",
            LexErrorKind::ResourceLimit => "ResourceLimit",
        }
    }
}

/// A fatal lexing failure. Offsets count Unicode codepoints, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message} at {label}:{offset}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub message: String,
    pub offset: usize,
    pub label: String,
}

impl LexError {
    pub(crate) fn new(kind: LexErrorKind, message: impl Into<String>, offset: usize) -> Self {
        Self { kind, message: message.into(), offset, label: String::new() }
    }

    pub(crate) fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn is_esm_syntax(&self) -> bool {
        self.kind == LexErrorKind::EsmSyntaxDetected
    }

    /// Machine-readable code, only set for ESM detection.
    pub fn code(&self) -> Option<&'static str> {
        self.is_esm_syntax().then_some(ESM_SYNTAX_CODE)
    }
}

pub type LexResult<T> = Result<T, LexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_label_and_offset() {
        let err = LexError::new(LexErrorKind::UnexpectedToken, "unexpected closing brace", 7)
            .with_label("lib/index.js");
        assert_eq!(err.to_string(), "unexpected closing brace at lib/index.js:7");
        assert_eq!(err.code(), None);
    }

    #[test]
    fn esm_errors_carry_node_code() {
        let err = LexError::new(LexErrorKind::EsmSyntaxDetected, "unexpected export statement", 0);
        assert!(err.is_esm_syntax());
        assert_eq!(err.code(), Some(ESM_SYNTAX_CODE));
    }
}
