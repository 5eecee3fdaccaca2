use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Semaphore;
use tracing::trace;

use codeloom_core::config::ModelConfig;
use codeloom_core::error::{CodeloomError, Result};
use codeloom_core::traits::GenerationService;

/// Caps concurrent in-flight generation requests across the process.
///
/// Wraps any [`GenerationService`]; requests beyond the cap queue on the
/// semaphore in arrival order.
pub struct ThrottledService {
    inner: Box<dyn GenerationService>,
    permits: Arc<Semaphore>,
}

impl ThrottledService {
    pub fn new(inner: Box<dyn GenerationService>, max_concurrent: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }
}

impl GenerationService for ThrottledService {
    fn complete(
        &self,
        config: &ModelConfig,
        system: &str,
        user: &str,
    ) -> BoxFuture<'_, Result<String>> {
        let config = config.clone();
        let system = system.to_string();
        let user = user.to_string();

        Box::pin(async move {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| CodeloomError::Cancelled)?;
            trace!(available = self.permits.available_permits(), "permit acquired");
            self.inner.complete(&config, &system, &user).await
        })
    }
}
