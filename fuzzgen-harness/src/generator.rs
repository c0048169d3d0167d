//! Fuzz-driver synthesis.
//!
//! Generation is pure: the same declaration and dump always produce the
//! same bytes. A target is either fully lowerable or rejected; the
//! recognized-but-unsupported shapes are rejected explicitly rather than
//! papered over.

use fuzzgen_analysis::{ArgumentDump, BaseKind, FunctionDump};

const HEADERS: &str = "#include <cstdio>\n#include <cstdint>\n";

/// Builds the driver source for one target function.
pub struct FuzzerGenerator<'a> {
    declaration: &'a str,
    target: &'a FunctionDump,
}

impl<'a> FuzzerGenerator<'a> {
    pub fn new(declaration: &'a str, target: &'a FunctionDump) -> Self {
        Self {
            declaration,
            target,
        }
    }

    /// The complete driver file, or `None` when the signature cannot be
    /// fed from a raw byte buffer.
    pub fn generate(&self) -> Option<String> {
        let arguments = self.lower_arguments()?;

        let mut driver = String::new();
        driver.push_str(HEADERS);
        driver.push_str(self.declaration);
        driver.push('\n');
        driver.push_str(
            "\nextern \"C\" int LLVMFuzzerTestOneInput(const uint8_t* data, size_t size) {\n",
        );
        driver.push_str("    (void) ");
        driver.push_str(&self.target.name);
        driver.push('(');
        driver.push_str(&arguments);
        driver.push_str(");\n    return 0;\n}\n");
        Some(driver)
    }

    /// Comma-separated argument expressions in signature order. A target
    /// without arguments has nothing to feed bytes into and is rejected.
    fn lower_arguments(&self) -> Option<String> {
        if self.target.arguments.is_empty() {
            return None;
        }

        let mut rendered = Vec::with_capacity(self.target.arguments.len());
        for argument in &self.target.arguments {
            rendered.push(lower_argument(argument)?);
        }
        Some(rendered.join(", "))
    }
}

/// The lowering table: only single-indirection byte sinks are supported.
fn lower_argument(argument: &ArgumentDump) -> Option<&'static str> {
    if argument.ty.pointer_depth() != 1 {
        return None;
    }
    match argument.ty.base() {
        BaseKind::Void => Some("(void*) data"),
        // Cast away const so C and C++ prototypes both accept the buffer.
        BaseKind::Int8 => Some("(char*) data"),
        _ => None,
    }
}
