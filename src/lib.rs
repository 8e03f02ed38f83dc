pub mod cache;
pub mod error;
pub mod index;
pub mod lexer;
pub mod logger;
pub mod options;

#[cfg(feature = "node")]
pub mod bridge;

// Re-export selected API for consumers
pub use error::{LexError, LexErrorKind, LexResult, ESM_SYNTAX_CODE};
pub use index::{ExportIndex, FileReport, IndexError, IndexOptions};
pub use lexer::{parse_cjs, parse_cjs_with, CjsExports, DEFAULT_LABEL};
pub use options::LexerOptions;
