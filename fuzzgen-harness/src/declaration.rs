//! Best-effort recovery of a function declaration from C/C++ source text.
//!
//! The contract is: given a function name and a source buffer, return its
//! declaration string. Signatures produced by macros or hidden behind
//! preprocessor conditionals are not reliably recoverable; every failure
//! is a `None` and the caller skips the target.

use log::debug;
use regex::Regex;

/// Extract `name`'s declaration from `source`.
///
/// A definition (`... name(...) {`) is preferred; an existing prototype
/// (`... name(...);`) is the fallback. The captured signature is collapsed
/// onto one line and terminated with a semicolon.
pub fn extract_declaration(source: &str, name: &str) -> Option<String> {
    let escaped = regex::escape(name);

    // Return type and qualifiers, then the name, then a parameter list
    // free of braces and semicolons. Anchoring at line starts keeps call
    // sites out.
    let signature = format!(r"[A-Za-z_][\w \t\*&:<>,\[\]]*?[ \t\*&][ \t]*{escaped}[ \t]*\([^;{{}}]*\)");

    let definition = Regex::new(&format!(r"(?m)^[ \t]*({signature})[ \t\r\n]*\{{")).ok()?;
    if let Some(captures) = definition.captures(source) {
        return captures.get(1).map(|m| normalize(m.as_str()));
    }

    let prototype = Regex::new(&format!(r"(?m)^[ \t]*({signature})[ \t]*;")).ok()?;
    if let Some(captures) = prototype.captures(source) {
        return captures.get(1).map(|m| normalize(m.as_str()));
    }

    debug!("no declaration found for {}", name);
    None
}

/// Collapse whitespace runs (including newlines inside the parameter
/// list) and close the declaration.
fn normalize(signature: &str) -> String {
    let mut declaration = signature.split_whitespace().collect::<Vec<_>>().join(" ");
    declaration.push(';');
    declaration
}
