pub mod knowledge;
pub mod llm_client;
pub mod service;

pub use llm_client::{LlmClient, LlmError};
pub use service::RecommendationService;
