use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, info};

use crate::{InMemoryMapSession, MapError, MapSession};

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Settings for creating a map instance.
#[derive(Clone)]
pub struct MapConfig {
    pub api_key: String,
    /// Mount target the map renders into (element id, window name...).
    pub container: String,
}

impl std::fmt::Debug for MapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapConfig")
            .field("api_key", &"***")
            .field("container", &self.container)
            .finish()
    }
}

/// Creates map sessions.
///
/// Methods return boxed futures for dyn-compatibility.
pub trait MapProvider: Send + Sync {
    fn create_session(&self, config: MapConfig)
    -> BoxFuture<'_, Result<Box<dyn MapSession>, MapError>>;
}

/// Provider backed by [`InMemoryMapSession`].
#[derive(Debug, Default, Clone)]
pub struct InMemoryMapProvider {
    startup_delay: Duration,
}

impl InMemoryMapProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the time the embedded map takes to load.
    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }
}

impl MapProvider for InMemoryMapProvider {
    fn create_session(
        &self,
        config: MapConfig,
    ) -> BoxFuture<'_, Result<Box<dyn MapSession>, MapError>> {
        Box::pin(async move {
            if config.api_key.trim().is_empty() {
                return Err(MapError::Unauthorized);
            }
            if config.container.trim().is_empty() {
                return Err(MapError::Mount(config.container));
            }
            if !self.startup_delay.is_zero() {
                debug!("map startup delay {:?}", self.startup_delay);
                tokio::time::sleep(self.startup_delay).await;
            }
            info!("map session mounted into {}", config.container);
            Ok(Box::new(InMemoryMapSession::new(config.container)) as Box<dyn MapSession>)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: &str, container: &str) -> MapConfig {
        MapConfig {
            api_key: api_key.to_string(),
            container: container.to_string(),
        }
    }

    #[tokio::test]
    async fn creates_empty_session() {
        let provider = InMemoryMapProvider::new();
        let session = provider
            .create_session(config("key", "map-container"))
            .await
            .unwrap();
        assert!(session.list_datasets().is_empty());
        assert_eq!(session.container(), "map-container");
    }

    #[tokio::test]
    async fn rejects_missing_credentials_and_mount() {
        let provider = InMemoryMapProvider::new();
        let err = provider.create_session(config("  ", "map")).await.err();
        assert_eq!(err, Some(MapError::Unauthorized));
        let err = provider.create_session(config("key", "")).await.err();
        assert_eq!(err, Some(MapError::Mount(String::new())));
    }

    #[tokio::test(start_paused = true)]
    async fn honours_startup_delay() {
        let provider = InMemoryMapProvider::new().with_startup_delay(Duration::from_secs(5));
        let start = tokio::time::Instant::now();
        provider.create_session(config("key", "map")).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[test]
    fn debug_redacts_api_key() {
        let s = format!("{:?}", config("secret-key", "map"));
        assert!(!s.contains("secret-key"));
        assert!(s.contains("map"));
    }
}
