pub mod media;
pub mod openai;

pub use media::{normalize_images, InvalidImageError};
pub use openai::{call_chat_completion, CompletionError, CompletionRequest};
