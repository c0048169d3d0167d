//! The analysis result handed to the rest of the pipeline.
//!
//! A dump is created empty, filled by one analyzer run and immutable
//! afterwards. Function records are shared (`Rc`) so the standalone subset
//! aliases the main storage instead of copying it.

use std::rc::Rc;

use crate::types::{StructDump, TypeDump};

/// Linkage of a dumped function, reduced to what the pipeline cares about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Linkage {
    #[default]
    Unknown,
    Internal,
    External,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDump {
    /// Position in the IR signature.
    pub index: u16,
    pub ty: TypeDump,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDump {
    pub name: String,
    pub return_type: TypeDump,
    pub arguments: Vec<ArgumentDump>,
    /// Negation of variadic.
    pub arguments_fixed: bool,
    /// Whether the function has a definition in this module.
    pub is_local: bool,
    pub is_standalone: bool,
    pub linkage: Linkage,
}

impl FunctionDump {
    pub fn arguments_number(&self) -> u16 {
        self.arguments.len() as u16
    }
}

/// Everything one analyzer run learned about a module.
#[derive(Debug, Default)]
pub struct ModuleDump {
    /// Authoritative outcome of the run; failures are reported, not thrown.
    pub success: bool,
    pub name: String,
    pub source_file: String,
    /// Struct definitions only; references live inside the types that use
    /// them.
    pub structs: Vec<StructDump>,
    /// Internal + external.
    pub function_count_total: u64,
    pub standalone_count: u64,
    /// Every locally defined function discovered in a graph.
    pub functions: Vec<Rc<FunctionDump>>,
    /// Subset of `functions`, shared, in dump order.
    pub standalone_functions: Vec<Rc<FunctionDump>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BaseKind;

    fn leaf(name: &str, standalone: bool) -> Rc<FunctionDump> {
        Rc::new(FunctionDump {
            name: name.into(),
            return_type: TypeDump::plain(BaseKind::Void, 0),
            arguments: Vec::new(),
            arguments_fixed: true,
            is_local: true,
            is_standalone: standalone,
            linkage: Linkage::External,
        })
    }

    #[test]
    fn standalone_subset_shares_storage() {
        let f = leaf("f", true);
        let g = leaf("g", false);

        let dump = ModuleDump {
            success: true,
            functions: vec![Rc::clone(&f), Rc::clone(&g)],
            standalone_functions: vec![Rc::clone(&f)],
            standalone_count: 1,
            ..ModuleDump::default()
        };

        assert_eq!(dump.standalone_functions.len() as u64, dump.standalone_count);
        assert!(Rc::ptr_eq(&dump.functions[0], &dump.standalone_functions[0]));
    }
}
