pub mod chat;
pub mod dataset;
pub mod generative;
pub mod pipeline;
pub mod providers;
pub mod recommendations;

pub use chat::{ChatMessage, ChatResponse, ChatService};
pub use dataset::MovieStore;
pub use generative::{GeminiClient, GenerativeModel};
pub use pipeline::{DatasetPipeline, PipelineConfig, RetryPolicy};
pub use providers::{MovieProvider, TmdbProvider};
