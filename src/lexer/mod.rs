//! Heuristic CommonJS export lexer.
//!
//! A single forward pass over the source that tracks just enough JavaScript
//! structure (brackets, literals, regex/division ambiguity) to recognise the
//! export idioms emitted by hand-written CJS and by Babel, TypeScript, esbuild
//! and Rollup. Nothing is evaluated and no syntax tree is built.

mod cursor;
mod literals;
mod recognizers;
mod scanner;
mod unescape;

#[cfg(test)]
mod tests;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LexError, LexErrorKind, LexResult};
use crate::options::LexerOptions;
use scanner::Scanner;

/// Label used in diagnostics when the caller does not name the source.
pub const DEFAULT_LABEL: &str = "@";

/// Statically detected exports of one CommonJS module, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CjsExports {
    pub exports: IndexSet<String>,
    pub reexports: IndexSet<String>,
}

/// Detects the named exports and re-exported specifiers of `source`.
///
/// `label` only appears in error diagnostics.
pub fn parse_cjs(source: &str, label: Option<&str>) -> LexResult<CjsExports> {
    parse_cjs_with(source, label, &LexerOptions::default())
}

pub fn parse_cjs_with(source: &str, label: Option<&str>, options: &LexerOptions) -> LexResult<CjsExports> {
    let label = label.unwrap_or(DEFAULT_LABEL);
    if let Some(limit) = options.max_source_len {
        // byte length bounds the codepoint count from above
        if source.len() > limit {
            let count = source.chars().count();
            if count > limit {
                let message = format!("source of {count} codepoints exceeds limit of {limit}");
                return Err(LexError::new(LexErrorKind::ResourceLimit, message, limit).with_label(label));
            }
        }
    }

    let chars: Vec<char> = source.chars().collect();
    let mut scanner = Scanner::new(&chars, options);
    match scanner.run() {
        Ok(()) => {
            let out = scanner.into_candidates().finish();
            debug!(label, exports = out.exports.len(), reexports = out.reexports.len(), "lexed module");
            Ok(out)
        }
        Err(err) => {
            let err = err.with_label(label);
            debug!(label, kind = err.kind.as_str(), offset = err.offset, "lex failed");
            Err(err)
        }
    }
}
