// IR analysis: typed dumps, control-flow graphs, standalone detection

pub mod analyzer;
pub mod cfg;
pub mod dump;
pub mod resolve;
pub mod types;

pub use analyzer::ModuleAnalyzer;
pub use cfg::{BlockGraph, FunctionGraph, Graph, Vertex};
pub use dump::{ArgumentDump, FunctionDump, Linkage, ModuleDump};
pub use resolve::TypeResolver;
pub use types::{BaseKind, StructBody, StructDump, TypeDump, TypeHeader};
