//! Export-idiom recognizers.
//!
//! Each entry of [`RECOGNIZERS`] fires on one keyword. A recognizer either
//! consumes a balanced stretch of input and records what it found, or leaves
//! the cursor where it was and reports no match. Shape mismatches are never
//! errors; only malformed escapes in decoded names and ESM syntax are fatal.

use super::cursor::{is_id_continue, is_id_start, is_punctuator, is_whitespace, Cursor, Span};
use super::scanner::{Opener, Scanner};
use crate::error::{LexError, LexErrorKind, LexResult};

type Recognize = fn(&mut Scanner<'_>, Span) -> LexResult<bool>;

pub(crate) struct Recognizer {
    pub keyword: &'static str,
    /// Only fires at bracket depth 0.
    pub top_level_only: bool,
    /// Also fires after a `.` (`tslib.__exportStar(...)`).
    pub after_dot: bool,
    pub run: Recognize,
}

pub(crate) const RECOGNIZERS: &[Recognizer] = &[
    Recognizer { keyword: "import", top_level_only: true, after_dot: false, run: import_statement },
    Recognizer { keyword: "export", top_level_only: true, after_dot: false, run: export_statement },
    Recognizer { keyword: "exports", top_level_only: false, after_dot: false, run: exports_assign },
    Recognizer { keyword: "module", top_level_only: false, after_dot: false, run: module_exports_assign },
    Recognizer { keyword: "require", top_level_only: true, after_dot: false, run: require_binding },
    Recognizer { keyword: "_interopRequireWildcard", top_level_only: true, after_dot: true, run: interop_wildcard },
    Recognizer { keyword: "__importStar", top_level_only: true, after_dot: true, run: interop_wildcard },
    Recognizer { keyword: "__export", top_level_only: true, after_dot: true, run: export_star_helper },
    Recognizer { keyword: "__exportStar", top_level_only: true, after_dot: true, run: export_star_helper },
    Recognizer { keyword: "Object", top_level_only: false, after_dot: false, run: object_define_or_keys },
    Recognizer { keyword: "class", top_level_only: false, after_dot: false, run: class_keyword },
];

/// Finds the recognizer for the identifier run at `span`, honouring depth and boundary rules.
pub(crate) fn lookup(scanner: &Scanner<'_>, span: Span) -> Option<&'static Recognizer> {
    let rec = RECOGNIZERS.iter().find(|r| scanner.cur.span_is(span, r.keyword))?;
    if rec.top_level_only && scanner.depth() != 0 {
        return None;
    }
    let boundary = scanner.cur.is_keyword_start(span.start)
        || (rec.after_dot && scanner.cur.step_back(span.start).is_some_and(|(_, c)| c == '.'));
    boundary.then_some(rec)
}

fn esm_error(message: &str, at: usize) -> LexError {
    LexError::new(LexErrorKind::EsmSyntaxDetected, message, at)
}

fn import_statement(s: &mut Scanner<'_>, word: Span) -> LexResult<bool> {
    match s.cur.skip_trivia() {
        // dynamic import()
        Some('(') | None => {}
        Some('.') => return Err(esm_error("unexpected import.meta in CJS module", word.start)),
        Some(ch) => {
            let spaced = s.cur.pos() != word.end;
            if spaced || matches!(ch, '"' | '\'' | '{' | '*') {
                return Err(esm_error("unexpected import statement in CJS module", word.start));
            }
        }
    }
    s.cur.set_pos(word.end);
    Ok(false)
}

fn export_statement(s: &mut Scanner<'_>, word: Span) -> LexResult<bool> {
    if let Some(ch) = s.cur.skip_trivia() {
        if s.cur.pos() != word.end || is_punctuator(ch) {
            return Err(esm_error("unexpected export statement in CJS module", word.start));
        }
    }
    s.cur.set_pos(word.end);
    Ok(false)
}

fn class_keyword(s: &mut Scanner<'_>, word: Span) -> LexResult<bool> {
    if s.cur.char_at(word.end).is_some_and(|c| is_whitespace(c) || c == '{') {
        s.next_brace_is_class = true;
    }
    Ok(false)
}

fn exports_assign(s: &mut Scanner<'_>, word: Span) -> LexResult<bool> {
    match s.member_assign_target() {
        Some(name) => {
            s.add_export(name)?;
            Ok(true)
        }
        None => {
            s.cur.set_pos(word.end);
            Ok(false)
        }
    }
}

fn module_exports_assign(s: &mut Scanner<'_>, word: Span) -> LexResult<bool> {
    let dotted = s.cur.attempt(|c| {
        c.expect('.')?;
        c.expect_word("exports")
    });
    if dotted.is_none() {
        s.cur.set_pos(word.end);
        return Ok(false);
    }
    let after_exports = s.cur.pos();
    if let Some(name) = s.member_assign_target() {
        s.add_export(name)?;
        return Ok(true);
    }
    s.cur.set_pos(after_exports);
    if s.cur.expect_assign().is_none() {
        s.cur.set_pos(word.end);
        return Ok(false);
    }

    let after_assign = s.cur.pos();
    match s.cur.skip_trivia() {
        Some('{') => {
            // a fresh module.exports discards earlier re-exports
            s.found.reexports.clear();
            if !s.object_literal_exports()? {
                s.cur.set_pos(after_assign);
            }
        }
        Some('r') => match s.cur.attempt(|c| c.require_call()) {
            Some(spec) => {
                s.found.reexports.clear();
                s.add_reexport(spec)?;
            }
            None => s.cur.set_pos(after_assign),
        },
        _ => s.cur.set_pos(after_assign),
    }
    Ok(true)
}

fn require_binding(s: &mut Scanner<'_>, word: Span) -> LexResult<bool> {
    let Some(spec) = s.cur.attempt(|c| c.require_args()) else {
        return Ok(false);
    };
    let specifier = s.decode(spec)?;
    s.bind_star_export(word.start, specifier);
    Ok(true)
}

fn interop_wildcard(s: &mut Scanner<'_>, word: Span) -> LexResult<bool> {
    if !s.open_helper_call(word)? {
        return Ok(false);
    }
    if let Some(spec) = s.cur.attempt(|c| c.require_call()) {
        let specifier = s.decode(spec)?;
        s.bind_star_export(word.start, specifier);
    }
    Ok(true)
}

fn export_star_helper(s: &mut Scanner<'_>, word: Span) -> LexResult<bool> {
    if !s.open_helper_call(word)? {
        return Ok(false);
    }
    if let Some(spec) = s.cur.attempt(|c| c.require_call()) {
        s.add_reexport(spec)?;
        return Ok(true);
    }
    let bound = s.cur.attempt(|c| {
        let id = c.expect_ident()?;
        let after = c.pos();
        matches!(c.skip_trivia()?, ',' | ')').then(|| {
            c.set_pos(after);
            id
        })
    });
    if let Some(id) = bound {
        let name = s.cur.text(id);
        if let Some(specifier) = s.found.star_bindings.get(&name).cloned() {
            s.found.reexports.insert(specifier);
        }
    }
    Ok(true)
}

fn object_define_or_keys(s: &mut Scanner<'_>, word: Span) -> LexResult<bool> {
    let matched = match s.cur.attempt(|c| c.expect('.').and_then(|_| c.skip_trivia())) {
        Some('d') => s.define_property()?,
        Some('k') if s.depth() == 0 => s.keys_for_each(),
        _ => false,
    };
    if !matched {
        s.cur.set_pos(word.end);
    }
    Ok(matched)
}

enum Descriptor {
    Value,
    Getter,
}

impl Scanner<'_> {
    /// `.NAME =` or `['NAME'] =` after `exports` / `module.exports`.
    fn member_assign_target(&mut self) -> Option<Span> {
        self.cur.attempt(|c| match c.skip_trivia()? {
            '.' => {
                c.bump();
                let name = c.expect_ident()?;
                c.expect_assign()?;
                Some(name)
            }
            '[' => {
                c.bump();
                let name = c.expect_string()?;
                c.expect(']')?;
                c.expect_assign()?;
                Some(name)
            }
            _ => None,
        })
    }

    /// `{ a, b: c, 'd': e, ...require('x'), ...f }` with the cursor on `{`.
    ///
    /// Names are recorded as they are read; on an unsupported member the
    /// literal is abandoned (keeping those names) and `false` is returned.
    fn object_literal_exports(&mut self) -> LexResult<bool> {
        self.cur.bump();
        loop {
            let Some(ch) = self.cur.skip_trivia() else {
                return Ok(false);
            };
            if ch == '}' {
                self.cur.bump();
                return Ok(true);
            }
            if let Some(key) = self.cur.ident_here() {
                if self.cur.skip_trivia() == Some(':') {
                    self.cur.bump();
                    if self.cur.expect_ident().is_none() {
                        return Ok(false);
                    }
                }
                self.add_export(key)?;
            } else if self.cur.starts_with("...") {
                self.cur.advance(3);
                if let Some(spec) = self.cur.attempt(|c| c.require_call()) {
                    self.add_reexport(spec)?;
                } else if self.cur.expect_ident().is_none() {
                    return Ok(false);
                }
            } else if ch == '\'' || ch == '"' {
                let Some(key) = self.cur.attempt(|c| {
                    let key = c.expect_string()?;
                    c.expect(':')?;
                    c.expect_ident()?;
                    Some(key)
                }) else {
                    return Ok(false);
                };
                self.add_export(key)?;
            } else {
                return Ok(false);
            }
            match self.cur.skip_trivia() {
                Some('}') => {
                    self.cur.bump();
                    return Ok(true);
                }
                Some(',') => self.cur.bump(),
                _ => return Ok(false),
            }
        }
    }

    /// Consumes the `(` after a helper name as a scanner frame.
    fn open_helper_call(&mut self, word: Span) -> LexResult<bool> {
        if self.cur.skip_trivia() != Some('(') {
            self.cur.set_pos(word.end);
            return Ok(false);
        }
        let paren = self.cur.pos();
        self.cur.bump();
        self.open(Opener::Paren, paren)?;
        Ok(true)
    }

    /// Recovers `X` from `var|let|const X = <call at call_start>`.
    fn bind_star_export(&mut self, call_start: usize, specifier: String) {
        let cur = &self.cur;
        if !cur.is_keyword_start(call_start) {
            return;
        }
        let skip_ws_back = |mut p: usize| {
            while let Some((q, c)) = cur.step_back(p) {
                if !is_whitespace(c) {
                    break;
                }
                p = q;
            }
            p
        };
        let p = skip_ws_back(call_start);
        let Some((eq, '=')) = cur.step_back(p) else {
            return;
        };
        let id_end = skip_ws_back(eq);
        let mut id_start = id_end;
        while let Some((q, c)) = cur.step_back(id_start) {
            if c == '\\' {
                return;
            }
            if !is_id_continue(c) {
                break;
            }
            id_start = q;
        }
        let id = Span { start: id_start, end: id_end };
        let starts_ok = cur.char_at(id_start).is_some_and(is_id_start);
        let spaced = cur.step_back(id_start).is_some_and(|(_, c)| is_whitespace(c));
        if id.len() == 0 || !starts_ok || !spaced {
            return;
        }
        let decl_end = skip_ws_back(id_start);
        let is_decl = decl_end
            .checked_sub(1)
            .is_some_and(|last| cur.preceding_keyword(Some(last), &["var", "let", "const"]));
        if is_decl {
            let name = cur.text(id);
            self.found.star_bindings.insert(name, specifier);
        }
    }

    /// `defineProperty(EXPORTS, 'NAME', { ... })` after `Object.`.
    fn define_property(&mut self) -> LexResult<bool> {
        if self.cur.expect_word("defineProperty").is_none() {
            return Ok(false);
        }
        let after_call_name = self.cur.pos();
        let Some(name) = self.cur.attempt(|c| {
            c.expect('(')?;
            c.expect_exports_ref()?;
            c.expect(',')?;
            c.expect_string()
        }) else {
            return Ok(false);
        };
        let name = self.decode(name)?;
        match self.cur.attempt(|c| c.property_descriptor()) {
            Some(Descriptor::Value) => {
                self.found.exports.insert(name);
                self.cur.set_pos(after_call_name);
                Ok(true)
            }
            Some(Descriptor::Getter) => {
                self.found.exports.insert(name);
                Ok(true)
            }
            None => {
                self.found.unsafe_getters.insert(name);
                Ok(false)
            }
        }
    }

    /// `keys(ID).forEach(function (K) { ... })` after `Object.`; returns whether it matched.
    fn keys_for_each(&mut self) -> bool {
        let Some(id) = self.cur.attempt(|c| c.reexport_loop()) else {
            return false;
        };
        let name = self.cur.text(id);
        if let Some(specifier) = self.found.star_bindings.get(&name).cloned() {
            self.found.reexports.insert(specifier);
        }
        true
    }
}

impl Cursor<'_> {
    /// `require ( 'spec' )`, returning the specifier span.
    fn require_call(&mut self) -> Option<Span> {
        self.expect_word("require")?;
        self.require_args()
    }

    fn require_args(&mut self) -> Option<Span> {
        self.expect('(')?;
        let spec = self.expect_string()?;
        self.expect(')')?;
        Some(spec)
    }

    /// `exports` or `module.exports`.
    fn expect_exports_ref(&mut self) -> Option<()> {
        if self.at_word("module") {
            self.expect_word("module")?;
            self.expect('.')?;
        }
        self.expect_word("exports")
    }

    fn eat_semicolon(&mut self) {
        if self.skip_trivia() == Some(';') {
            self.bump();
        }
    }

    /// `{ enumerable: true?, value:` or `{ enumerable: true?, get ... })`.
    fn property_descriptor(&mut self) -> Option<Descriptor> {
        self.expect(',')?;
        self.expect('{')?;
        if self.at_word("enumerable") {
            self.expect_word("enumerable")?;
            self.expect(':')?;
            self.expect_word("true")?;
            self.expect(',')?;
        }
        if self.at_word("value") {
            self.expect_word("value")?;
            self.expect(':')?;
            return Some(Descriptor::Value);
        }
        self.getter_head()?;
        self.expect_word("return")?;
        self.expect_ident()?;
        match self.skip_trivia()? {
            '.' => {
                self.bump();
                self.expect_ident()?;
            }
            '[' => {
                self.bump();
                self.expect_string()?;
                self.expect(']')?;
            }
            _ => {}
        }
        self.getter_tail()?;
        self.expect(')')?;
        Some(Descriptor::Getter)
    }

    /// `get: function NAME? () {` or `get() {`.
    fn getter_head(&mut self) -> Option<()> {
        self.expect_word("get")?;
        if self.skip_trivia()? == ':' {
            self.bump();
            self.expect_word("function")?;
            if self.skip_trivia()? != '(' {
                self.expect_ident()?;
            }
        }
        self.expect('(')?;
        self.expect(')')?;
        self.expect('{')
    }

    /// `;? } ,? }` closing a getter body and its descriptor.
    fn getter_tail(&mut self) -> Option<()> {
        self.eat_semicolon();
        self.expect('}')?;
        if self.skip_trivia()? == ',' {
            self.bump();
        }
        self.expect('}')
    }

    /// The generated re-export loop; returns the span of the iterated binding.
    fn reexport_loop(&mut self) -> Option<Span> {
        self.expect_word("keys")?;
        self.expect('(')?;
        let id = self.expect_ident()?;
        self.expect(')')?;
        self.expect('.')?;
        self.expect_word("forEach")?;
        self.expect('(')?;
        self.expect_word("function")?;
        self.expect('(')?;
        let key = self.expect_ident()?;
        self.expect(')')?;
        self.expect('{')?;
        self.expect_word("if")?;
        self.expect('(')?;
        self.expect_same(key)?;
        match self.skip_trivia()? {
            '=' => self.early_return_guards(id, key)?,
            '!' => {
                self.expect_punct("!==")?;
                self.expect_quoted_word("default")?;
                if self.skip_trivia()? == '&' {
                    self.expect_punct("&&")?;
                    self.expect('!')?;
                    self.has_own_property_guard(key)?;
                }
                self.expect(')')?;
            }
            _ => return None,
        }
        if self.skip_trivia()? == 'O' {
            self.define_getter_body(id, key)?;
        } else {
            self.assign_body(id, key)?;
        }
        self.expect('}')?;
        self.expect(')')?;
        Some(id)
    }

    /// `=== 'default' || K === '__esModule') return;` then the optional
    /// own-property and already-exported guards.
    fn early_return_guards(&mut self, id: Span, key: Span) -> Option<()> {
        self.expect_punct("===")?;
        self.expect_quoted_word("default")?;
        self.expect_punct("||")?;
        self.expect_same(key)?;
        self.expect_punct("===")?;
        self.expect_quoted_word("__esModule")?;
        self.expect(')')?;
        self.expect_word("return")?;
        self.eat_semicolon();

        let _ = self.attempt(|c| {
            c.expect_word("if")?;
            c.expect('(')?;
            c.has_own_property_guard(key)?;
            c.expect(')')?;
            c.expect_word("return")?;
            c.eat_semicolon();
            Some(())
        });
        let _ = self.attempt(|c| {
            c.expect_word("if")?;
            c.expect('(')?;
            c.expect_same(key)?;
            c.expect_word("in")?;
            c.expect_exports_ref()?;
            c.expect_punct("&&")?;
            c.expect_exports_ref()?;
            c.expect_keyed(key)?;
            c.expect_punct("===")?;
            c.expect_same(id)?;
            c.expect_keyed(key)?;
            c.expect(')')?;
            c.expect_word("return")?;
            c.eat_semicolon();
            Some(())
        });
        Some(())
    }

    /// `Object(.prototype)?.hasOwnProperty.call(X, K)` or `X.hasOwnProperty(K)`.
    fn has_own_property_guard(&mut self, key: Span) -> Option<()> {
        let receiver = self.expect_ident()?;
        if self.span_is(receiver, "module") {
            self.expect('.')?;
            self.expect_word("exports")?;
        }
        let _ = self.attempt(|c| {
            c.expect('.')?;
            c.expect_word("prototype")
        });
        self.expect('.')?;
        self.expect_word("hasOwnProperty")?;
        if self.skip_trivia()? == '.' {
            self.bump();
            self.expect_word("call")?;
            self.expect('(')?;
            if self.attempt(|c| c.expect_exports_ref()).is_none() {
                self.expect_ident()?;
            }
            self.expect(',')?;
        } else {
            self.expect('(')?;
        }
        self.expect_same(key)?;
        self.expect(')')
    }

    /// `[K]`
    fn expect_keyed(&mut self, key: Span) -> Option<()> {
        self.expect('[')?;
        self.expect_same(key)?;
        self.expect(']')
    }

    /// `EXPORTS[K] = ID[K];`
    fn assign_body(&mut self, id: Span, key: Span) -> Option<()> {
        self.expect_exports_ref()?;
        self.expect_keyed(key)?;
        self.expect_assign()?;
        self.expect_same(id)?;
        self.expect_keyed(key)?;
        self.eat_semicolon();
        Some(())
    }

    /// `Object.defineProperty(EXPORTS, K, { enumerable: true, get ... { return ID[K]; } });`
    fn define_getter_body(&mut self, id: Span, key: Span) -> Option<()> {
        self.expect_word("Object")?;
        self.expect('.')?;
        self.expect_word("defineProperty")?;
        self.expect('(')?;
        self.expect_exports_ref()?;
        self.expect(',')?;
        self.expect_same(key)?;
        self.expect(',')?;
        self.expect('{')?;
        self.expect_word("enumerable")?;
        self.expect(':')?;
        self.expect_word("true")?;
        self.expect(',')?;
        self.getter_head()?;
        self.expect_word("return")?;
        self.expect_same(id)?;
        self.expect_keyed(key)?;
        self.getter_tail()?;
        self.expect(')')?;
        self.eat_semicolon();
        Some(())
    }
}
