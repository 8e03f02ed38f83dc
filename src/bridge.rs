use crate::error::LexError;
use crate::lexer;
use napi::bindgen_prelude::*;
use napi_derive::napi;

#[napi(object)]
pub struct ParsedExports {
    pub exports: Vec<String>,
    pub reexports: Vec<String>,
}

fn to_js_error(err: LexError) -> Error {
    let reason = match err.code() {
        Some(code) => format!("{code}: {err}"),
        None => format!("{}: {err}", err.kind.as_str()),
    };
    Error::new(Status::GenericFailure, reason)
}

/// `parseCjs(source, name?)` for Node.js callers.
#[napi(js_name = "parseCjs")]
pub fn parse_cjs(source: String, name: Option<String>) -> Result<ParsedExports> {
    let out = lexer::parse_cjs(&source, name.as_deref()).map_err(to_js_error)?;
    Ok(ParsedExports {
        exports: out.exports.into_iter().collect(),
        reexports: out.reexports.into_iter().collect(),
    })
}
