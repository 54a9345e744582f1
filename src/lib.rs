//! fragua — declarative service schemas to Java sources.
//!
//! Schema model → type mapping → structure building → deterministic
//! emission, with BLAKE3 manifests and drift tracking over the generated
//! tree.

pub mod audit;
pub mod cli;
pub mod core;
pub mod emit;
