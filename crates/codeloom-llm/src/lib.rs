pub mod providers;
pub mod throttle;

use codeloom_core::config::ModelConfig;
use codeloom_core::traits::GenerationService;

pub use providers::anthropic::AnthropicService;
pub use providers::openai::OpenAiService;
pub use throttle::ThrottledService;

/// Create a generation service based on the provider name.
pub fn create_service(config: &ModelConfig) -> Box<dyn GenerationService> {
    match config.provider.as_str() {
        "anthropic" | "claude" => Box::new(AnthropicService::new()),
        // Everything else uses the OpenAI-compatible client
        _ => Box::new(OpenAiService::new()),
    }
}
