use serde::{Deserialize, Serialize};

/// Default cap on simultaneously open `(`/`{` frames.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Resource limits applied to a single parse call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexerOptions {
    /// Maximum number of open brackets (template expressions included).
    pub max_depth: usize,
    /// Maximum source length in codepoints; `None` means unlimited.
    pub max_source_len: Option<usize>,
}

impl Default for LexerOptions {
    fn default() -> Self {
        Self { max_depth: DEFAULT_MAX_DEPTH, max_source_len: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let opts: LexerOptions = serde_json::from_str(r#"{"max_source_len": 4096}"#).unwrap();
        assert_eq!(opts.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(opts.max_source_len, Some(4096));
    }
}
