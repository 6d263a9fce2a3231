pub mod document;
pub mod error;

pub use document::{Document, DocumentKind, DocumentMetadata};
pub use error::{ErrorCategory, ErrorClassifier, LlmError, RagError, Result, ResultExt};
