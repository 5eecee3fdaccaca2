use futures::future::BoxFuture;

use crate::config::ModelConfig;
use crate::error::Result;

/// Text-generation backend — the only external capability the workflow
/// engine consumes.
///
/// Implementations clone what they need out of the borrowed arguments
/// before constructing the returned future.
pub trait GenerationService: Send + Sync + 'static {
    /// Complete a single system-instruction + user-text exchange and return
    /// the response text.
    fn complete(
        &self,
        config: &ModelConfig,
        system: &str,
        user: &str,
    ) -> BoxFuture<'_, Result<String>>;
}
