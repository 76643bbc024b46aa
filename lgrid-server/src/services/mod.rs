//! External services

pub mod anthropic_client;
pub mod anthropic_generator;
pub mod generator;

pub use anthropic_client::AnthropicClient;
pub use anthropic_generator::AnthropicGenerator;
pub use generator::{GenerationError, Generator, ResearchOutput, UnconfiguredGenerator};
