pub mod client;
pub mod error;
pub mod parser;
pub mod sse;

pub use client::{ChatCompletionsClient, GenerationRequest, TextDeltaStream, TextGenerator};
pub use error::GenerationError;
pub use parser::{parse_array, strip_code_fences};
