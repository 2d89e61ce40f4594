mod traits;
mod openai;
pub mod model;

pub use traits::*;
pub use openai::OpenAIClient;
pub use model::{ModelProvider, ModelRef, ModelRegistry, ProviderEndpoint};
