use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation endpoint error (HTTP {status}): {body}")]
    Http { status: u16, body: String },
}
