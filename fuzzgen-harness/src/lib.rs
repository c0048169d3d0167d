// Driver synthesis: declaration recovery and fuzzer source generation

pub mod declaration;
pub mod generator;
pub mod source;

pub use declaration::extract_declaration;
pub use generator::FuzzerGenerator;
pub use source::{SourceError, SourceFile};
