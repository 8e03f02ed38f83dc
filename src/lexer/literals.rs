//! Skippers for comments, strings, templates and regular expressions.
//!
//! All of these are fatal on end of input. Recognizers use the softer
//! cursor helpers instead and simply fail to match.

use super::cursor::is_line_terminator;
use super::scanner::Scanner;
use crate::error::{LexError, LexErrorKind, LexResult};

fn unterminated(what: &str, at: usize) -> LexError {
    LexError::new(LexErrorKind::UnterminatedLiteral, format!("unterminated {what}"), at)
}

impl Scanner<'_> {
    pub(crate) fn block_comment(&mut self) -> LexResult<()> {
        let start = self.cur.pos();
        if self.cur.skip_block_comment() {
            Ok(())
        } else {
            Err(unterminated("block comment", start))
        }
    }

    /// Cursor on the opening quote.
    pub(crate) fn string_literal(&mut self) -> LexResult<()> {
        let start = self.cur.pos();
        let Some(quote) = self.cur.peek() else {
            return Err(unterminated("string", start));
        };
        self.cur.bump();
        while let Some(ch) = self.cur.peek() {
            self.cur.bump();
            if ch == quote {
                return Ok(());
            }
            match ch {
                '\\' => {
                    if self.cur.peek() == Some('\r') && self.cur.peek_at(1) == Some('\n') {
                        self.cur.bump();
                    }
                    self.cur.bump();
                }
                '\n' | '\r' => break,
                _ => {}
            }
        }
        Err(unterminated("string", start))
    }

    /// Cursor just past a backtick or a template expression's closing `}`.
    /// Returns at the closing backtick or after entering a `${`.
    pub(crate) fn template_literal(&mut self, opened_at: usize) -> LexResult<()> {
        while let Some(ch) = self.cur.peek() {
            match ch {
                '`' => {
                    self.cur.bump();
                    return Ok(());
                }
                '\\' => self.cur.advance(2),
                '$' if self.cur.peek_at(1) == Some('{') => {
                    self.cur.bump();
                    let brace = self.cur.pos();
                    self.cur.bump();
                    return self.enter_template_expr(brace);
                }
                _ => self.cur.bump(),
            }
        }
        Err(unterminated("template", opened_at))
    }

    /// Cursor on the opening `/`.
    pub(crate) fn regex_literal(&mut self, start: usize) -> LexResult<()> {
        self.cur.bump();
        while let Some(ch) = self.cur.peek() {
            self.cur.bump();
            match ch {
                '/' => return Ok(()),
                '[' => self.regex_class(start)?,
                '\\' => {
                    if self.cur.peek().is_some_and(is_line_terminator) {
                        break;
                    }
                    self.cur.bump();
                }
                c if is_line_terminator(c) => break,
                _ => {}
            }
        }
        Err(unterminated("regular expression", start))
    }

    /// Cursor just past `[`; a `/` inside a class does not end the regex.
    fn regex_class(&mut self, start: usize) -> LexResult<()> {
        while let Some(ch) = self.cur.peek() {
            self.cur.bump();
            match ch {
                ']' => return Ok(()),
                '\\' => {
                    if self.cur.peek().is_some_and(is_line_terminator) {
                        break;
                    }
                    self.cur.bump();
                }
                c if is_line_terminator(c) => break,
                _ => {}
            }
        }
        Err(unterminated("regular expression", start))
    }
}
