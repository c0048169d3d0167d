// IR transformation passes: target isolation and symbol-name repair

pub mod corrector;
pub mod launcher;
pub mod sanitizer;

pub use corrector::NameCorrector;
pub use launcher::{LaunchError, PassLauncher};
pub use sanitizer::Sanitizer;
