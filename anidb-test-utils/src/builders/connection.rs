//! Handler wired to mock collaborators

use crate::mocks::{CountingRateLimiter, MockTransportFactory};
use anidb_udp_core::{AniDbSettings, MemorySettingsProvider, UdpConfig, UdpConnectionHandler};
use std::sync::Arc;

/// A [`UdpConnectionHandler`] over a mock network
pub struct TestConnection {
    pub handler: UdpConnectionHandler,
    pub network: MockTransportFactory,
    pub rate_limiter: Arc<CountingRateLimiter>,
    pub settings: Arc<MemorySettingsProvider>,
}

impl TestConnection {
    /// Handler with test credentials and [`UdpConfig::test`]
    pub fn new() -> Self {
        Self::with_settings(AniDbSettings::with_credentials("testuser", "testpass"))
    }

    pub fn with_settings(settings: AniDbSettings) -> Self {
        Self::with_config(UdpConfig::test(), settings)
    }

    pub fn with_config(config: UdpConfig, settings: AniDbSettings) -> Self {
        let network = MockTransportFactory::new();
        let rate_limiter = Arc::new(CountingRateLimiter::new());
        let settings = Arc::new(MemorySettingsProvider::new(settings));
        let handler = UdpConnectionHandler::with_collaborators(
            config,
            settings.clone(),
            Arc::new(network.clone()),
            rate_limiter.clone(),
        );

        Self {
            handler,
            network,
            rate_limiter,
            settings,
        }
    }

    /// Create and initialize; panics if init does not succeed
    pub async fn initialized() -> Self {
        let connection = Self::new();
        let initialized = connection
            .handler
            .init()
            .await
            .expect("init should not fail with test settings");
        assert!(initialized, "init should succeed with test credentials");
        connection
    }
}

impl Default for TestConnection {
    fn default() -> Self {
        Self::new()
    }
}
