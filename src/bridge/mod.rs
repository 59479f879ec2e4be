//! Optional bridge to a live verification backend.
//!
//! The player never depends on the backend being up. [`Bridge`] probes
//! `/health` once when it connects; if the probe fails, or any later live
//! call fails in transport, it drops to fixture mode and answers from the
//! local catalog. Nothing is retried internally. Callers that want another
//! try call [`Bridge::reprobe`].

mod fixture;
#[cfg(feature = "bridge")]
mod http;
mod stream;
pub mod wire;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::error::{AxiomResult, ValidationError};

pub use fixture::{replay, FixtureBackend, SESSION_CAPACITY};
#[cfg(feature = "bridge")]
pub use http::HttpBackend;
pub use stream::{RemoteRun, RemoteStatus, StreamItem, VerificationStream};
pub use wire::{
    AgentInfo, HealthStatus, SessionSummary, StreamEvent, VerificationSession, VerifyRequest,
    WireClaim,
};

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Backend root, e.g. `http://localhost:8000`. Unset means fixture mode.
    pub base_url: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// How often the stream reader checks for cancellation.
    pub stream_poll: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(5),
            stream_poll: Duration::from_millis(100),
        }
    }
}

impl BridgeConfig {
    /// Checks the URL scheme and durations.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` for a non-HTTP URL or a zero duration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(url) = &self.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ValidationError::InvalidConfig {
                    key: "base_url".to_string(),
                    value: url.clone(),
                });
            }
        }
        if self.timeout.is_zero() {
            return Err(ValidationError::InvalidConfig {
                key: "timeout".to_string(),
                value: "0ms".to_string(),
            });
        }
        if self.stream_poll.is_zero() {
            return Err(ValidationError::InvalidConfig {
                key: "stream_poll".to_string(),
                value: "0ms".to_string(),
            });
        }
        Ok(())
    }
}

/// The verification backend's operations.
pub trait VerificationBackend: Send + Sync + fmt::Debug {
    /// `GET /health`.
    fn health(&self) -> AxiomResult<HealthStatus>;
    /// `POST /api/verify`.
    fn verify(&self, request: &VerifyRequest) -> AxiomResult<VerificationSession>;
    /// `POST /api/extract-claims`.
    fn extract_claims(&self, request: &VerifyRequest) -> AxiomResult<Vec<WireClaim>>;
    /// `GET /api/sessions/{id}`.
    fn session(&self, id: &str) -> AxiomResult<VerificationSession>;
    /// `GET /api/sessions`.
    fn sessions(&self) -> AxiomResult<Vec<SessionSummary>>;
    /// `POST /api/demo/{scenario}`.
    fn demo(&self, scenario_id: &str) -> AxiomResult<VerificationSession>;
    /// `GET /api/agents`.
    fn agents(&self) -> AxiomResult<Vec<AgentInfo>>;
    /// `/ws/verify`.
    fn stream(&self, request: &VerifyRequest) -> AxiomResult<VerificationStream>;
}

/// Which backend the bridge is answering from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeMode {
    Live,
    Fixture,
}

impl fmt::Display for BridgeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => f.write_str("live"),
            Self::Fixture => f.write_str("fixture"),
        }
    }
}

/// Live backend with silent fallback to catalog fixtures.
#[derive(Debug)]
pub struct Bridge {
    live: Option<Box<dyn VerificationBackend>>,
    fixture: FixtureBackend,
    mode: BridgeMode,
}

impl Bridge {
    /// A bridge that only ever serves fixtures.
    #[must_use]
    pub fn fixture_only(catalog: Arc<Catalog>) -> Self {
        Self {
            live: None,
            fixture: FixtureBackend::new(catalog),
            mode: BridgeMode::Fixture,
        }
    }

    /// Connects to `config.base_url` if set and probes it.
    #[must_use]
    pub fn connect(config: &BridgeConfig, catalog: Arc<Catalog>) -> Self {
        if config.base_url.is_none() {
            debug!("no backend configured; using fixtures");
            return Self::fixture_only(catalog);
        }

        #[cfg(feature = "bridge")]
        {
            match HttpBackend::new(config) {
                Ok(http) => Self::with_backend(Box::new(http), catalog),
                Err(e) => {
                    warn!(error = %e, "backend unavailable; using fixtures");
                    Self::fixture_only(catalog)
                }
            }
        }

        #[cfg(not(feature = "bridge"))]
        {
            warn!("built without the bridge feature; using fixtures");
            Self::fixture_only(catalog)
        }
    }

    /// Wraps an arbitrary live backend and probes it.
    #[must_use]
    pub fn with_backend(live: Box<dyn VerificationBackend>, catalog: Arc<Catalog>) -> Self {
        let mut bridge = Self {
            live: Some(live),
            fixture: FixtureBackend::new(catalog),
            mode: BridgeMode::Fixture,
        };
        bridge.reprobe();
        bridge
    }

    /// Current mode; the status indicator.
    #[must_use]
    pub const fn mode(&self) -> BridgeMode {
        self.mode
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.mode == BridgeMode::Live
    }

    /// Probes the live backend again. The caller's explicit retry.
    pub fn reprobe(&mut self) -> BridgeMode {
        let Some(live) = &self.live else {
            self.mode = BridgeMode::Fixture;
            return self.mode;
        };
        self.mode = match live.health() {
            Ok(health) if health.is_healthy() => {
                info!(demo_mode = health.demo_mode, "verification backend is live");
                BridgeMode::Live
            }
            Ok(health) => {
                warn!(status = %health.status, "backend unhealthy; using fixtures");
                BridgeMode::Fixture
            }
            Err(e) => {
                warn!(error = %e, "backend unreachable; using fixtures");
                BridgeMode::Fixture
            }
        };
        self.mode
    }

    /// The fixture backend, for callers that want fixture data regardless of mode.
    #[must_use]
    pub const fn fixtures(&self) -> &FixtureBackend {
        &self.fixture
    }

    fn call<T>(
        &mut self,
        operation: &str,
        live: impl FnOnce(&dyn VerificationBackend) -> AxiomResult<T>,
        fixture: impl FnOnce(&FixtureBackend) -> AxiomResult<T>,
    ) -> AxiomResult<T> {
        if self.mode == BridgeMode::Live {
            if let Some(backend) = &self.live {
                match live(backend.as_ref()) {
                    Ok(value) => return Ok(value),
                    Err(e) if e.is_transport() => {
                        warn!(operation, error = %e, "backend call failed; falling back to fixtures");
                        self.mode = BridgeMode::Fixture;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        fixture(&self.fixture)
    }

    /// See [`VerificationBackend::health`].
    ///
    /// # Errors
    ///
    /// Only non-transport errors surface; transport failures fall back.
    pub fn health(&mut self) -> AxiomResult<HealthStatus> {
        self.call("health", |b| b.health(), |f| f.health())
    }

    /// See [`VerificationBackend::verify`].
    ///
    /// # Errors
    ///
    /// Fixture mode fails with `LookupError::NoFixtureForResponse` for a
    /// response the catalog does not contain.
    pub fn verify(&mut self, request: &VerifyRequest) -> AxiomResult<VerificationSession> {
        self.call("verify", |b| b.verify(request), |f| f.verify(request))
    }

    /// See [`VerificationBackend::extract_claims`].
    ///
    /// # Errors
    ///
    /// As [`Bridge::verify`].
    pub fn extract_claims(&mut self, request: &VerifyRequest) -> AxiomResult<Vec<WireClaim>> {
        self.call(
            "extract_claims",
            |b| b.extract_claims(request),
            |f| f.extract_claims(request),
        )
    }

    /// See [`VerificationBackend::session`].
    ///
    /// # Errors
    ///
    /// Fixture mode fails with `LookupError::UnknownSession`.
    pub fn session(&mut self, id: &str) -> AxiomResult<VerificationSession> {
        self.call("session", |b| b.session(id), |f| f.session(id))
    }

    /// See [`VerificationBackend::sessions`].
    ///
    /// # Errors
    ///
    /// Only non-transport errors surface.
    pub fn sessions(&mut self) -> AxiomResult<Vec<SessionSummary>> {
        self.call("sessions", |b| b.sessions(), |f| f.sessions())
    }

    /// See [`VerificationBackend::demo`].
    ///
    /// # Errors
    ///
    /// Fixture mode fails with `PlaybackError::UnknownScenario`.
    pub fn demo(&mut self, scenario_id: &str) -> AxiomResult<VerificationSession> {
        self.call("demo", |b| b.demo(scenario_id), |f| f.demo(scenario_id))
    }

    /// See [`VerificationBackend::agents`].
    ///
    /// # Errors
    ///
    /// Only non-transport errors surface.
    pub fn agents(&mut self) -> AxiomResult<Vec<AgentInfo>> {
        self.call("agents", |b| b.agents(), |f| f.agents())
    }

    /// See [`VerificationBackend::stream`].
    ///
    /// # Errors
    ///
    /// Only non-transport errors surface.
    pub fn stream(&mut self, request: &VerifyRequest) -> AxiomResult<VerificationStream> {
        self.call("stream", |b| b.stream(request), |f| f.stream(request))
    }
}
