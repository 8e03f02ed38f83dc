//! Codepoint cursor and character classification.
//!
//! The source is decoded once into a `[char]` slice so every offset is a
//! codepoint offset. Backward scans (binding recovery, preceding-keyword
//! checks) therefore step over whole codepoints, never storage units.

/// Half-open codepoint range into the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(self) -> usize {
        self.end - self.start
    }
}

/// ECMAScript *LineTerminator*.
pub(crate) fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// ECMAScript *WhiteSpace* or *LineTerminator*.
pub(crate) fn is_whitespace(c: char) -> bool {
    matches!(
        c,
        '\t' | '\x0B'
            | '\x0C'
            | ' '
            | '\u{00A0}'
            | '\u{FEFF}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
    ) || is_line_terminator(c)
}

pub(crate) fn is_id_start(c: char) -> bool {
    c == '$' || c == '_' || unicode_ident::is_xid_start(c)
}

pub(crate) fn is_id_continue(c: char) -> bool {
    c == '$' || c == '\u{200C}' || c == '\u{200D}' || unicode_ident::is_xid_continue(c)
}

pub(crate) fn is_punctuator(c: char) -> bool {
    matches!(
        c,
        '!' | '%' | '&' | '(' | ')' | '*' | '+' | ',' | '-' | '.' | '/' | ':' | ';' | '<' | '='
            | '>' | '?' | '[' | ']' | '^' | '{' | '|' | '}' | '~'
    )
}

/// Punctuators after which an expression (and so a regex) may start.
pub(crate) fn is_expression_punctuator(c: char) -> bool {
    matches!(
        c,
        '!' | '%' | '&' | '(' | '*' | '+' | ',' | '-' | '.' | ':' | ';' | '<' | '=' | '>' | '?'
            | '[' | '^' | '{' | '|' | '~'
    )
}

#[derive(Debug, Clone)]
pub(crate) struct Cursor<'src> {
    src: &'src [char],
    pos: usize,
}

impl<'src> Cursor<'src> {
    pub fn new(src: &'src [char]) -> Self {
        Self { src, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.src.len());
    }

    pub fn len(&self) -> usize {
        self.src.len()
    }

    pub fn char_at(&self, i: usize) -> Option<char> {
        self.src.get(i).copied()
    }

    pub fn peek(&self) -> Option<char> {
        self.char_at(self.pos)
    }

    pub fn peek_at(&self, offset: usize) -> Option<char> {
        self.char_at(self.pos + offset)
    }

    pub fn bump(&mut self) {
        if self.pos < self.src.len() {
            self.pos += 1;
        }
    }

    pub fn advance(&mut self, n: usize) {
        self.set_pos(self.pos + n);
    }

    pub fn starts_with_at(&self, i: usize, lit: &str) -> bool {
        let mut at = i;
        for c in lit.chars() {
            if self.char_at(at) != Some(c) {
                return false;
            }
            at += 1;
        }
        true
    }

    pub fn starts_with(&self, lit: &str) -> bool {
        self.starts_with_at(self.pos, lit)
    }

    /// The codepoint ending just before offset `i`, with its offset.
    pub fn step_back(&self, i: usize) -> Option<(usize, char)> {
        let at = i.checked_sub(1)?;
        self.char_at(at).map(|c| (at, c))
    }

    pub fn slice(&self, span: Span) -> &'src [char] {
        &self.src[span.start..span.end]
    }

    pub fn text(&self, span: Span) -> String {
        self.slice(span).iter().collect()
    }

    pub fn span_is(&self, span: Span, lit: &str) -> bool {
        span.len() == lit.chars().count() && self.starts_with_at(span.start, lit)
    }

    /// Offset 0, or preceded by whitespace or a punctuator other than `.`.
    pub fn is_keyword_start(&self, i: usize) -> bool {
        match self.step_back(i) {
            None => true,
            Some((_, c)) => is_whitespace(c) || (is_punctuator(c) && c != '.'),
        }
    }

    /// End offset of the identifier-continue run starting at `start`.
    pub fn word_end(&self, start: usize) -> usize {
        let mut end = start;
        while self.char_at(end).is_some_and(is_id_continue) {
            end += 1;
        }
        end
    }

    /// The identifier run whose last codepoint sits at offset `last`.
    pub fn word_ending_at(&self, last: usize) -> Option<Span> {
        if !self.char_at(last).is_some_and(is_id_continue) {
            return None;
        }
        let mut start = last;
        while let Some((prev, c)) = self.step_back(start) {
            if !is_id_continue(c) {
                break;
            }
            start = prev;
        }
        Some(Span { start, end: last + 1 })
    }

    /// True when the word ending at `last` is one of `words` at a keyword start.
    pub fn preceding_keyword(&self, last: Option<usize>, words: &[&str]) -> bool {
        let Some(span) = last.and_then(|i| self.word_ending_at(i)) else {
            return false;
        };
        words.iter().any(|w| self.span_is(span, w)) && self.is_keyword_start(span.start)
    }

    pub fn skip_line_comment(&mut self) {
        self.advance(2);
        while let Some(c) = self.peek() {
            if is_line_terminator(c) {
                break;
            }
            self.pos += 1;
        }
    }

    /// Skips a `/* ... */` comment; returns false (cursor unmoved) if unterminated.
    pub fn skip_block_comment(&mut self) -> bool {
        let mut i = self.pos + 2;
        while i + 1 < self.src.len() {
            if self.src[i] == '*' && self.src[i + 1] == '/' {
                self.pos = i + 2;
                return true;
            }
            i += 1;
        }
        false
    }

    /// Skips whitespace and comments, returning the next significant codepoint.
    ///
    /// An unterminated block comment moves the cursor to the end and yields
    /// `None`, so the recognizer in progress simply fails to match.
    pub fn skip_trivia(&mut self) -> Option<char> {
        loop {
            let ch = self.peek()?;
            if is_whitespace(ch) {
                self.pos += 1;
                continue;
            }
            if ch == '/' {
                match self.peek_at(1) {
                    Some('/') => {
                        self.skip_line_comment();
                        continue;
                    }
                    Some('*') => {
                        if !self.skip_block_comment() {
                            self.pos = self.src.len();
                            return None;
                        }
                        continue;
                    }
                    _ => {}
                }
            }
            return Some(ch);
        }
    }

    /// Runs `f`, rewinding the cursor if it does not match.
    pub fn attempt<T>(&mut self, f: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let saved = self.pos;
        let out = f(self);
        if out.is_none() {
            self.pos = saved;
        }
        out
    }

    /// Identifier at the cursor (no trivia skipped). Escaped identifiers are rejected.
    pub fn ident_here(&mut self) -> Option<Span> {
        if !self.peek().is_some_and(is_id_start) {
            return None;
        }
        let start = self.pos;
        let end = self.word_end(start);
        if self.char_at(end) == Some('\\') {
            return None;
        }
        self.pos = end;
        Some(Span { start, end })
    }

    pub fn expect_ident(&mut self) -> Option<Span> {
        self.skip_trivia()?;
        self.ident_here()
    }

    pub fn expect(&mut self, ch: char) -> Option<()> {
        (self.skip_trivia()? == ch).then(|| self.pos += 1)
    }

    /// Consumes a multi-character punctuator such as `===` or `&&`.
    pub fn expect_punct(&mut self, punct: &str) -> Option<()> {
        self.skip_trivia()?;
        self.starts_with(punct).then(|| self.advance(punct.chars().count()))
    }

    /// True when `word` (not followed by an identifier codepoint) is next.
    pub fn at_word(&mut self, word: &str) -> bool {
        if self.skip_trivia().is_none() || !self.starts_with(word) {
            return false;
        }
        let end = self.pos + word.chars().count();
        !self.char_at(end).is_some_and(is_id_continue)
    }

    pub fn expect_word(&mut self, word: &str) -> Option<()> {
        self.at_word(word).then(|| self.advance(word.chars().count()))
    }

    /// Consumes the same identifier text as `span`.
    pub fn expect_same(&mut self, span: Span) -> Option<()> {
        self.skip_trivia()?;
        let matches = (0..span.len()).all(|k| self.char_at(self.pos + k) == self.char_at(span.start + k));
        let end = self.pos + span.len();
        if !matches || self.char_at(end).is_some_and(is_id_continue) {
            return None;
        }
        self.pos = end;
        Some(())
    }

    /// Consumes `'word'` or `"word"`.
    pub fn expect_quoted_word(&mut self, word: &str) -> Option<()> {
        let quote = self.skip_trivia()?;
        if quote != '\'' && quote != '"' {
            return None;
        }
        let len = word.chars().count();
        if !self.starts_with_at(self.pos + 1, word) || self.char_at(self.pos + 1 + len) != Some(quote) {
            return None;
        }
        self.advance(len + 2);
        Some(())
    }

    /// An assignment `=` that is not part of `==`, `===` or `=>`.
    pub fn expect_assign(&mut self) -> Option<()> {
        if self.skip_trivia()? != '=' || matches!(self.peek_at(1), Some('=' | '>')) {
            return None;
        }
        self.pos += 1;
        Some(())
    }

    /// Consumes a string literal, returning its span including the quotes.
    pub fn expect_string(&mut self) -> Option<Span> {
        let quote = self.skip_trivia()?;
        if quote != '\'' && quote != '"' {
            return None;
        }
        let start = self.pos;
        let mut i = start + 1;
        loop {
            match self.char_at(i)? {
                c if c == quote => {
                    self.pos = i + 1;
                    return Some(Span { start, end: i + 1 });
                }
                '\\' => {
                    i += if self.char_at(i + 1) == Some('\r') && self.char_at(i + 2) == Some('\n') { 3 } else { 2 };
                }
                '\n' | '\r' => return None,
                _ => i += 1,
            }
        }
    }
}
