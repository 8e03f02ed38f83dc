use proptest::prelude::*;

use super::*;
use crate::error::{LexErrorKind, ESM_SYNTAX_CODE};

fn lex(src: &str) -> CjsExports {
    parse_cjs(src, None).unwrap_or_else(|err| panic!("unexpected failure: {err}"))
}

fn exports(src: &str) -> Vec<String> {
    lex(src).exports.into_iter().collect()
}

fn reexports(src: &str) -> Vec<String> {
    lex(src).reexports.into_iter().collect()
}

fn failure(src: &str) -> LexError {
    match parse_cjs(src, None) {
        Ok(out) => panic!("expected failure, got {out:?}"),
        Err(err) => err,
    }
}

#[test]
fn exports_member_assignments() {
    let src = r#"
        exports.a = 1;
        exports['b'] = function () {};
        exports["c d"] = 3;
        exports /* gap */ . /* gap */ e /* gap */ = 4;
    "#;
    assert_eq!(exports(src), ["a", "b", "c d", "e"]);
}

#[test]
fn names_keep_first_seen_order_without_duplicates() {
    assert_eq!(exports("exports.b = 1; exports.a = 2; exports.b = 3;"), ["b", "a"]);
}

#[test]
fn comparisons_are_not_assignments() {
    assert!(exports("if (exports.a == 1) {} exports.b === c; x = exports.c => 1;").is_empty());
}

#[test]
fn keyword_boundaries_are_respected() {
    let src = "myexports.a = 1; _exports.b = 2; exports2.c = 3; obj.exports.d = 4; modules.exports.e = 5;";
    assert!(exports(src).is_empty());
}

#[test]
fn exports_inside_functions_are_found() {
    assert_eq!(exports("(function () { if (x) { exports.inner = 1; } })();"), ["inner"]);
}

#[test]
fn module_exports_members() {
    let src = "module.exports.a = 1; module.exports['b'] = 2; module . exports . c = 3;";
    assert_eq!(exports(src), ["a", "b", "c"]);
}

#[test]
fn module_exports_require_is_a_reexport() {
    assert_eq!(reexports(r#"module.exports = require("foo");"#), ["foo"]);
}

#[test]
fn module_exports_replacement_clears_earlier_reexports() {
    let src = "__exportStar(require('./z'), exports);\nmodule.exports = require('./a');";
    assert_eq!(reexports(src), ["./a"]);

    let src = "__exportStar(require('./z'), exports);\nmodule.exports = { a };";
    let out = lex(src);
    assert!(out.reexports.is_empty());
    assert_eq!(out.exports.iter().collect::<Vec<_>>(), ["a"]);
}

#[test]
fn module_exports_other_values_keep_reexports() {
    let src = "__exportStar(require('./z'), exports);\nmodule.exports = function () {};";
    assert_eq!(reexports(src), ["./z"]);
}

#[test]
fn module_exports_object_literal() {
    let out = lex("module.exports = { a, b: c, 'd': e, ...require('f'), ...g };");
    assert_eq!(out.exports.iter().collect::<Vec<_>>(), ["a", "b", "d"]);
    assert_eq!(out.reexports.iter().collect::<Vec<_>>(), ["f"]);
}

#[test]
fn object_literal_stops_at_unsupported_member() {
    assert_eq!(exports("module.exports = { a, b: 1, c };"), ["a"]);
    assert_eq!(exports("module.exports = { a: b.c, d };"), ["a"]);
}

#[test]
fn esbuild_annotation_is_recognised() {
    let src = "var src_exports = {};\nmodule.exports = __toCommonJS(src_exports);\n0 && (module.exports = { a, b });";
    assert_eq!(exports(src), ["a", "b"]);
}

#[test]
fn define_property_value_form() {
    let src = r#"
        Object.defineProperty(exports, '__esModule', { value: true });
        Object.defineProperty(exports, 'a', { enumerable: true, value: 1 });
        Object.defineProperty(module.exports, "b", { value: function () {} });
    "#;
    assert_eq!(exports(src), ["__esModule", "a", "b"]);
}

#[test]
fn define_property_safe_getters() {
    let src = r#"
        Object.defineProperty(exports,"x",{enumerable:true,get:function(){return a.b;}});
        Object.defineProperty(exports, 'y', { get() { return m['y']; } });
        Object.defineProperty(exports, 'z', { enumerable: true, get: function get() { return _z.default } });
        Object.defineProperty(exports, 'w', { get: function () { return w; }, });
    "#;
    assert_eq!(exports(src), ["x", "y", "z", "w"]);
}

#[test]
fn define_property_unsafe_getters_are_excluded() {
    assert!(exports(r#"Object.defineProperty(exports,"x",{get:function(){sideEffect();return a.b;}})"#).is_empty());
    let src = "exports.x = 1;\nObject.defineProperty(exports, 'x', { get: function () { return compute(); } });\nexports.y = 2;";
    assert_eq!(exports(src), ["y"]);
}

#[test]
fn define_property_without_exports_target_records_nothing() {
    let src = "var __defProp = Object.defineProperty;\nObject.defineProperty(foo, 'x', { value: 1 });\nObject.defineProperty(exports, name, { value: 1 });";
    assert!(exports(src).is_empty());
}

#[test]
fn babel_reexport_loop() {
    let src = r#""use strict";

Object.defineProperty(exports, "__esModule", {
  value: true
});
var _foo = require("./foo");
Object.keys(_foo).forEach(function (key) {
  if (key === "default" || key === "__esModule") return;
  if (key in exports && exports[key] === _foo[key]) return;
  Object.defineProperty(exports, key, {
    enumerable: true,
    get: function () {
      return _foo[key];
    }
  });
});
"#;
    let out = lex(src);
    assert_eq!(out.exports.iter().collect::<Vec<_>>(), ["__esModule"]);
    assert_eq!(out.reexports.iter().collect::<Vec<_>>(), ["./foo"]);
}

#[test]
fn babel_loop_with_export_names_guard() {
    let src = r#"
var _exportNames = { a: true };
exports.a = void 0;
var _b = require("./b");
Object.keys(_b).forEach(function (key) {
  if (key === "default" || key === "__esModule") return;
  if (Object.prototype.hasOwnProperty.call(_exportNames, key)) return;
  if (key in exports && exports[key] === _b[key]) return;
  exports[key] = _b[key];
});
"#;
    let out = lex(src);
    assert_eq!(out.exports.iter().collect::<Vec<_>>(), ["a"]);
    assert_eq!(out.reexports.iter().collect::<Vec<_>>(), ["./b"]);
}

#[test]
fn rollup_reexport_loop() {
    let src = r#"
var x = require('x');
Object.keys(x).forEach(function (k) {
	if (k !== 'default' && !exports.hasOwnProperty(k)) Object.defineProperty(exports, k, {
		enumerable: true,
		get: function () { return x[k]; }
	});
});
const y = require('y');
Object.keys(y).forEach(function (k) {
	if (k !== 'default' && !Object.prototype.hasOwnProperty.call(exports, k)) exports[k] = y[k];
});
let z = require('z');
Object.keys(z).forEach(function (k) {
	if (k !== 'default') exports[k] = z[k];
});
"#;
    assert_eq!(reexports(src), ["x", "y", "z"]);
}

#[test]
fn reexport_loop_guard_and_body_variants() {
    let loops = [
        // Object.hasOwnProperty without .prototype
        "if (key === 'default' || key === '__esModule') return;\n\
         if (Object.hasOwnProperty.call(_e, key)) return;\n\
         exports[key] = _x[key];",
        // module.exports in the guard and the body
        "if (key === 'default' || key === '__esModule') return;\n\
         if (key in module.exports && module.exports[key] === _x[key]) return;\n\
         module.exports[key] = _x[key];",
        // getter shorthand
        "if (key === 'default' || key === '__esModule') return;\n\
         Object.defineProperty(module.exports, key, { enumerable: true, get() { return _x[key]; } });",
        // comments between tokens
        "if /* a */ (key === 'default' || key === '__esModule') // b\n\
         return; /* c */ exports /* d */ [key] = _x[ /* e */ key];",
        "if (key !== 'default' && !module.exports.hasOwnProperty(key)) module.exports[key] = _x[key];",
    ];
    for body in loops {
        let src = format!(
            "var _x = require('x');\nObject /* o */ .keys(_x).forEach(function (key) {{\n{body}\n}});"
        );
        let out = lex(&src);
        assert_eq!(out.reexports.iter().collect::<Vec<_>>(), ["x"], "{src}");
        assert!(out.exports.is_empty(), "{src}");
    }
}

#[test]
fn reexport_loop_with_wrong_default_guard_records_nothing() {
    let src = "var _x = require('x');\nObject.keys(_x).forEach(function (k) {\n  if (k !== \"__esModule\") exports[k] = _x[k];\n});";
    let out = lex(src);
    assert!(out.reexports.is_empty());
    assert!(out.exports.is_empty());
}

#[test]
fn reexport_loop_over_unknown_binding_records_nothing() {
    let src = "Object.keys(y).forEach(function (k) { if (k === 'default' || k === '__esModule') return; exports[k] = y[k]; });";
    let out = lex(src);
    assert!(out.reexports.is_empty());
    assert!(out.exports.is_empty());
}

#[test]
fn deviating_loop_records_nothing() {
    let src = "var _x = require('x');\nObject.keys(_x).forEach(function (key) { console.log(key); });";
    assert!(reexports(src).is_empty());
}

#[test]
fn non_ascii_bindings_resolve() {
    let src = r#"var _ñ = require("ñ");
Object.keys(_ñ).forEach(function (key) {
  if (key === "default" || key === "__esModule") return;
  exports[key] = _ñ[key];
});"#;
    assert_eq!(reexports(src), ["ñ"]);
}

#[test]
fn nested_require_does_not_bind() {
    let src = "function f() { var _x = require('x'); }\nObject.keys(_x).forEach(function (key) { if (key === 'default' || key === '__esModule') return; exports[key] = _x[key]; });";
    assert!(reexports(src).is_empty());
}

#[test]
fn plain_assignment_does_not_bind() {
    let src = "_x = require('x');\nObject.keys(_x).forEach(function (key) { if (key === 'default' || key === '__esModule') return; exports[key] = _x[key]; });";
    assert!(reexports(src).is_empty());
}

#[test]
fn typescript_export_star_helpers() {
    let src = r#""use strict";
var __exportStar = (this && this.__exportStar) || function(m, exports) {
    for (var p in m) if (p !== "default" && !Object.prototype.hasOwnProperty.call(exports, p)) __createBinding(exports, m, p);
};
Object.defineProperty(exports, "__esModule", { value: true });
__exportStar(require("./a"), exports);
tslib_1.__exportStar(require("./b"), exports);
__export(require("./c"));
const foo_1 = require("./d");
__exportStar(foo_1, exports);
var m = __importStar(require("./e"));
__exportStar(m, exports);
"#;
    let out = lex(src);
    assert_eq!(out.exports.iter().collect::<Vec<_>>(), ["__esModule"]);
    assert_eq!(out.reexports.iter().collect::<Vec<_>>(), ["./a", "./b", "./c", "./d", "./e"]);
}

#[test]
fn interop_wildcard_binding_feeds_reexport_loop() {
    let src = r#"var _y = _interopRequireWildcard(require("./y"));
Object.keys(_y).forEach(function (key) {
  if (key === "default" || key === "__esModule") return;
  if (key in exports && exports[key] === _y[key]) return;
  exports[key] = _y[key];
});"#;
    assert_eq!(reexports(src), ["./y"]);
}

#[test]
fn escaped_names_are_decoded() {
    assert_eq!(exports(r#"exports['ab'] = 1; exports["\x63"] = 2;"#), ["ab", "c"]);
    assert_eq!(reexports(r#"module.exports = require('\u{1F600}');"#), ["😀"]);
}

#[test]
fn malformed_escape_is_fatal() {
    let err = failure(r"exports['\x4'] = 1;");
    assert_eq!(err.kind, LexErrorKind::UnescapeFailure);
    assert_eq!(err.offset, 9);
    assert_eq!(failure(r"module.exports = require('\uD800');").kind, LexErrorKind::UnescapeFailure);
}

#[test]
fn esm_syntax_is_rejected() {
    for src in [
        "export default 1;",
        "export const a = 1;",
        "export{a};",
        "import x from 'y';",
        "import{a}from'b';",
        "import * as ns from 'c';",
        "import 'side-effect';",
        "const u = import.meta.url;",
    ] {
        let err = failure(src);
        assert_eq!(err.kind, LexErrorKind::EsmSyntaxDetected, "{src}");
        assert_eq!(err.code(), Some(ESM_SYNTAX_CODE));
    }
}

#[test]
fn cjs_uses_of_import_and_export_words_are_fine() {
    let src = "import('x').then(m => m); import ('y'); exports.export = 1; exports.import = 2; var o = { export: 1, import: 2 };";
    assert_eq!(exports(src), ["export", "import"]);
}

#[test]
fn esm_error_reports_label_and_offset() {
    let err = parse_cjs("exports.a = 1;\nexport default a;", Some("lib/mod.js")).unwrap_err();
    assert_eq!(err.offset, 15);
    assert_eq!(err.label, "lib/mod.js");
    assert_eq!(parse_cjs("export default 1", None).unwrap_err().label, DEFAULT_LABEL);
}

#[test]
fn division_and_regex_are_told_apart() {
    assert_eq!(exports("a = b / c / d; exports.x = 1;"), ["x"]);
    assert_eq!(exports("a = /re/.test(x); exports.x = 1;"), ["x"]);
    assert_eq!(exports("x = {} / 2; exports.b = '/';"), ["b"]);
    assert_eq!(exports("x = (a) / 2; exports.b = '/';"), ["b"]);
    assert_eq!(exports("x = a++ / 2; exports.b = '/';"), ["b"]);
    assert_eq!(exports("x = a / b // c\nexports.b = 1;"), ["b"]);
}

#[test]
fn regex_after_statement_boundaries() {
    assert_eq!(exports("if (a) /'/.test(b);\nexports.c = 1;"), ["c"]);
    assert_eq!(exports("function f(s) { return /'}/.test(s); }\nexports.c = 1;"), ["c"]);
    assert_eq!(exports("function f() {}\n/'/.test(s);\nexports.c = 1;"), ["c"]);
    assert_eq!(exports("class A { m() { return 1; } }\n/'/.test(s);\nexports.c = 1;"), ["c"]);
    assert_eq!(exports("x = typeof /'/;\nexports.c = 1;"), ["c"]);
}

#[test]
fn nested_templates_keep_depth_accounting() {
    assert_eq!(exports("x = `a${ `b${c}d` }e`; exports.ok = 1;"), ["ok"]);
    assert_eq!(exports("x = `${ {a: 1}.a } ${ '}' }`; exports.ok = 1;"), ["ok"]);
}

#[test]
fn missing_closing_brace_is_fatal() {
    assert_eq!(failure("exports.x = {").kind, LexErrorKind::UnterminatedBracket);
    assert_eq!(failure("f(").kind, LexErrorKind::UnterminatedBracket);
}

#[test]
fn stray_closer_offset_counts_codepoints() {
    let err = failure("ñ = 1;\n}");
    assert_eq!(err.kind, LexErrorKind::UnexpectedToken);
    assert_eq!(err.offset, 7);
}

#[test]
fn source_length_limit_counts_codepoints() {
    let opts = LexerOptions { max_source_len: Some(3), ..LexerOptions::default() };
    assert!(parse_cjs_with("ñññ", None, &opts).is_ok());
    let err = parse_cjs_with("exports.a = 1;", Some("big.js"), &opts).unwrap_err();
    assert_eq!(err.kind, LexErrorKind::ResourceLimit);
    assert_eq!(err.label, "big.js");
}

#[test]
fn oversized_source_is_rejected_before_scanning() {
    let opts = LexerOptions { max_source_len: Some(1024), ..LexerOptions::default() };
    let src = "exports.a = 1;\n".repeat(100_000);
    let err = parse_cjs_with(&src, None, &opts).unwrap_err();
    assert_eq!(err.kind, LexErrorKind::ResourceLimit);
    assert_eq!(err.offset, 1024);
    assert!(parse_cjs_with(&"ñ".repeat(1024), None, &opts).is_ok());
}

#[test]
fn default_depth_limit_applies() {
    let src = "(".repeat(2000);
    assert_eq!(failure(&src).kind, LexErrorKind::ResourceLimit);
}

#[test]
fn concurrent_parses_agree() {
    let src = "var _x = require('x');\nexports.a = 1;\nObject.keys(_x).forEach(function (k) { if (k !== 'default') exports[k] = _x[k]; });";
    let expected = lex(src);
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4).map(|_| scope.spawn(|| parse_cjs(src, None))).collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), expected);
        }
    });
}

fn export_value() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "1",
        "'s'",
        "\"}\"",
        "function () { return 1; }",
        "{ a: 1 }",
        "[1, 2]",
        "a / b",
        "/re}/g",
        "`t${x}`",
        "require('dep')",
    ])
}

proptest! {
    #[test]
    fn exports_only_sources_yield_exactly_their_names(
        items in prop::collection::vec(("[a-zA-Z_$][a-zA-Z0-9_$]{0,8}", export_value()), 0..12)
    ) {
        let src: String = items.iter().map(|(name, value)| format!("exports.{name} = {value};\n")).collect();
        let out = parse_cjs(&src, None).unwrap();
        let expected: IndexSet<String> = items.into_iter().map(|(name, _)| name).collect();
        prop_assert_eq!(out.exports, expected);
        prop_assert!(out.reexports.is_empty());
    }

    #[test]
    fn arbitrary_input_never_panics(src in "\\PC{0,200}") {
        let _ = parse_cjs(&src, None);
    }

    #[test]
    fn js_like_input_is_deterministic(src in "[ -~\n]{0,300}") {
        prop_assert_eq!(parse_cjs(&src, None), parse_cjs(&src, None));
    }
}
