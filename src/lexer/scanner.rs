//! The single-pass scanner loop.

use std::collections::HashMap;

use indexmap::IndexSet;

use super::cursor::{is_expression_punctuator, is_id_start, is_whitespace, Cursor, Span};
use super::recognizers;
use super::unescape;
use super::CjsExports;
use crate::error::{LexError, LexErrorKind, LexResult};
use crate::options::LexerOptions;

const PAREN_KEYWORDS: &[&str] = &["if", "for", "while"];
const TERMINATOR_KEYWORDS: &[&str] = &["catch", "finally", "else"];
const EXPRESSION_KEYWORDS: &[&str] = &[
    "await", "case", "debugger", "delete", "do", "else", "in", "instanceof", "new", "return",
    "throw", "typeof", "void", "yield",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Opener {
    Paren,
    Brace,
    /// The `{` of a template literal's `${`.
    TemplateExpr,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Frame {
    pub opener: Opener,
    /// Last significant token before the opener.
    pub preceding: Option<usize>,
    pub is_class_body: bool,
}

/// Everything the recognizers record during a scan.
#[derive(Debug, Default)]
pub(crate) struct Candidates {
    pub exports: IndexSet<String>,
    pub unsafe_getters: IndexSet<String>,
    pub reexports: IndexSet<String>,
    /// Local binding -> specifier, from `var x = require("...")`.
    pub star_bindings: HashMap<String, String>,
}

impl Candidates {
    /// Drops unsafe getters and empty names.
    pub fn finish(self) -> CjsExports {
        let Candidates { exports, unsafe_getters, reexports, .. } = self;
        CjsExports {
            exports: exports.into_iter().filter(|e| !e.is_empty() && !unsafe_getters.contains(e)).collect(),
            reexports: reexports.into_iter().filter(|r| !r.is_empty()).collect(),
        }
    }
}

/// Scan context for one parse call.
pub(crate) struct Scanner<'src> {
    pub(crate) cur: Cursor<'src>,
    frames: Vec<Frame>,
    template_depth: Option<usize>,
    template_stack: Vec<Option<usize>>,
    last_token: Option<usize>,
    last_closed: Option<Frame>,
    last_slash_was_division: bool,
    pub(crate) next_brace_is_class: bool,
    pub(crate) found: Candidates,
    max_depth: usize,
}

impl<'src> Scanner<'src> {
    pub fn new(src: &'src [char], options: &LexerOptions) -> Self {
        Self {
            cur: Cursor::new(src),
            frames: Vec::new(),
            template_depth: None,
            template_stack: Vec::new(),
            last_token: None,
            last_closed: None,
            last_slash_was_division: false,
            next_brace_is_class: false,
            found: Candidates::default(),
            max_depth: options.max_depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn into_candidates(self) -> Candidates {
        self.found
    }

    pub fn run(&mut self) -> LexResult<()> {
        if self.cur.starts_with("#!") {
            self.cur.skip_line_comment();
        }
        while let Some(ch) = self.cur.peek() {
            if is_whitespace(ch) {
                self.cur.bump();
                continue;
            }
            let start = self.cur.pos();
            if is_id_start(ch) {
                self.word(start)?;
                continue;
            }
            match ch {
                '(' => {
                    self.cur.bump();
                    self.open(Opener::Paren, start)?;
                }
                '{' => {
                    self.cur.bump();
                    self.open(Opener::Brace, start)?;
                }
                ')' => self.close_paren(start)?,
                '}' => self.close_brace(start)?,
                '\'' | '"' => self.string_literal()?,
                '`' => {
                    self.cur.bump();
                    self.template_literal(start)?;
                }
                '/' => match self.cur.peek_at(1) {
                    Some('/') => {
                        self.cur.skip_line_comment();
                        continue;
                    }
                    Some('*') => {
                        self.block_comment()?;
                        continue;
                    }
                    _ => self.slash(start)?,
                },
                _ => self.cur.bump(),
            }
            self.last_token = self.cur.pos().checked_sub(1);
        }

        let end = self.cur.len();
        if self.template_depth.is_some() {
            return Err(LexError::new(LexErrorKind::UnterminatedLiteral, "unterminated template", end));
        }
        if !self.frames.is_empty() {
            return Err(LexError::new(LexErrorKind::UnterminatedBracket, "unterminated braces", end));
        }
        Ok(())
    }

    /// An identifier run: offered to the recognizer table, else an ordinary token.
    fn word(&mut self, start: usize) -> LexResult<()> {
        let end = self.cur.word_end(start);
        let span = Span { start, end };
        if let Some(recognizer) = recognizers::lookup(self, span) {
            self.cur.set_pos(end);
            self.last_token = Some(end - 1);
            if (recognizer.run)(self, span)? {
                self.last_token = self.cur.pos().checked_sub(1);
                self.last_closed = None;
                return Ok(());
            }
        }
        self.cur.set_pos(end);
        self.last_token = Some(end - 1);
        Ok(())
    }

    /// Pushes a frame for the opener at `at` (already consumed).
    pub(crate) fn open(&mut self, opener: Opener, at: usize) -> LexResult<()> {
        if self.frames.len() >= self.max_depth {
            return Err(LexError::new(
                LexErrorKind::ResourceLimit,
                format!("nesting exceeds {} levels", self.max_depth),
                at,
            ));
        }
        let is_class_body = opener == Opener::Brace && std::mem::take(&mut self.next_brace_is_class);
        self.frames.push(Frame { opener, preceding: self.last_token, is_class_body });
        Ok(())
    }

    fn close_paren(&mut self, at: usize) -> LexResult<()> {
        match self.frames.pop() {
            Some(frame) if frame.opener != Opener::TemplateExpr => {
                self.cur.bump();
                self.last_closed = Some(frame);
                Ok(())
            }
            _ => Err(LexError::new(LexErrorKind::UnexpectedToken, "unexpected closing parenthesis", at)),
        }
    }

    fn close_brace(&mut self, at: usize) -> LexResult<()> {
        let depth = self.frames.len();
        // closers need not match their opener kind: `f(a}` scans cleanly
        let Some(frame) = self.frames.pop() else {
            return Err(LexError::new(LexErrorKind::UnexpectedToken, "unexpected closing brace", at));
        };
        self.cur.bump();
        if self.template_depth == Some(depth) {
            self.template_depth = self.template_stack.pop().flatten();
            return self.template_literal(at);
        }
        if frame.opener == Opener::TemplateExpr {
            return Err(LexError::new(LexErrorKind::UnexpectedToken, "unexpected closing brace", at));
        }
        self.last_closed = Some(frame);
        Ok(())
    }

    /// Enters a template expression after `${`; `brace` is the `{` offset.
    pub(crate) fn enter_template_expr(&mut self, brace: usize) -> LexResult<()> {
        self.template_stack.push(self.template_depth);
        self.open(Opener::TemplateExpr, brace)?;
        self.template_depth = Some(self.frames.len());
        Ok(())
    }

    fn slash(&mut self, start: usize) -> LexResult<()> {
        if self.slash_starts_regex() {
            self.regex_literal(start)?;
            self.last_slash_was_division = false;
        } else {
            self.cur.bump();
            self.last_slash_was_division = true;
        }
        Ok(())
    }

    fn slash_starts_regex(&self) -> bool {
        let Some(last) = self.last_token else {
            return true;
        };
        let Some(token) = self.cur.char_at(last) else {
            return true;
        };
        let before = self.cur.step_back(last).map(|(_, c)| c);
        match token {
            '.' if before.is_some_and(|c| c.is_ascii_digit()) => false,
            '+' | '-' if before == Some(token) => false,
            ')' => self.last_closed.is_some_and(|f| self.cur.preceding_keyword(f.preceding, PAREN_KEYWORDS)),
            '}' => self.last_closed.is_some_and(|f| f.is_class_body || self.is_expression_terminator(f.preceding)),
            '/' => self.last_slash_was_division,
            c if is_expression_punctuator(c) => true,
            _ => self.cur.preceding_keyword(Some(last), EXPRESSION_KEYWORDS),
        }
    }

    /// Tokens after which a `{` opens a statement block.
    fn is_expression_terminator(&self, at: Option<usize>) -> bool {
        let Some(i) = at else {
            return false;
        };
        match self.cur.char_at(i) {
            Some(';' | ')') => true,
            Some('>') => self.cur.step_back(i).is_some_and(|(_, c)| c == '='),
            _ => self.cur.preceding_keyword(at, TERMINATOR_KEYWORDS),
        }
    }

    /// Decodes a quoted literal (or identifier) span.
    pub(crate) fn decode(&self, span: Span) -> LexResult<String> {
        unescape::decode(self.cur.slice(span)).map_err(|err| {
            LexError::new(LexErrorKind::UnescapeFailure, err.to_string(), span.start + err.offset)
        })
    }

    pub(crate) fn add_export(&mut self, span: Span) -> LexResult<()> {
        let name = self.decode(span)?;
        self.found.exports.insert(name);
        Ok(())
    }

    pub(crate) fn add_reexport(&mut self, span: Span) -> LexResult<()> {
        let specifier = self.decode(span)?;
        self.found.reexports.insert(specifier);
        Ok(())
    }
}
