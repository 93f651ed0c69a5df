//! Page generation.

pub mod content;
pub mod generator;

pub use content::{ContentStore, FsContentStore};
pub use generator::{BatchInterrupted, Generator, GeneratorConfig, GeneratorOutput, MAX_RETRY_DELAY};
