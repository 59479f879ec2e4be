//! Live backend over HTTP and the `/ws/verify` stream.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Sender};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use crate::error::{AxiomError, AxiomResult, TransportError};

use super::stream::{StreamItem, VerificationStream};
use super::wire::{
    AgentInfo, AgentList, ExtractedClaims, HealthStatus, SessionList, SessionSummary,
    StreamEvent, VerificationSession, VerifyRequest, VerifyResponse, WireClaim,
};
use super::{BridgeConfig, VerificationBackend};

/// Blocking HTTP client for the verification backend.
#[derive(Debug)]
pub struct HttpBackend {
    base_url: String,
    agent: ureq::Agent,
    stream_poll: Duration,
}

impl HttpBackend {
    /// Client for `config.base_url`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::BackendUnavailable` when no base URL is configured.
    pub fn new(config: &BridgeConfig) -> AxiomResult<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or_else(|| TransportError::BackendUnavailable {
                message: "no backend URL configured".to_string(),
            })?;

        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();

        Ok(Self {
            base_url,
            agent,
            stream_poll: config.stream_poll,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn stream_url(&self) -> String {
        let rest = self
            .base_url
            .strip_prefix("https://")
            .map(|r| format!("wss://{r}"))
            .or_else(|| {
                self.base_url
                    .strip_prefix("http://")
                    .map(|r| format!("ws://{r}"))
            })
            .unwrap_or_else(|| self.base_url.clone());
        format!("{rest}/ws/verify")
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        let response = self.agent.get(&self.url(path)).call().map_err(from_ureq)?;
        response.into_json::<T>().map_err(|e| TransportError::DeserializationFailed {
            message: e.to_string(),
        })
    }

    fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, TransportError> {
        let request = self.agent.post(&self.url(path));
        let response = match body {
            Some(body) => {
                let value = serde_json::to_value(body).map_err(|e| {
                    TransportError::SerializationFailed {
                        message: e.to_string(),
                    }
                })?;
                request.send_json(value)
            }
            None => request.call(),
        }
        .map_err(from_ureq)?;

        response.into_json::<T>().map_err(|e| TransportError::DeserializationFailed {
            message: e.to_string(),
        })
    }
}

impl VerificationBackend for HttpBackend {
    fn health(&self) -> AxiomResult<HealthStatus> {
        Ok(self.get("/health")?)
    }

    fn verify(&self, request: &VerifyRequest) -> AxiomResult<VerificationSession> {
        let response: VerifyResponse = self.post("/api/verify", Some(request))?;
        Ok(response.session)
    }

    fn extract_claims(&self, request: &VerifyRequest) -> AxiomResult<Vec<WireClaim>> {
        let response: ExtractedClaims = self.post("/api/extract-claims", Some(request))?;
        Ok(response.claims)
    }

    fn session(&self, id: &str) -> AxiomResult<VerificationSession> {
        Ok(self.get(&format!("/api/sessions/{id}"))?)
    }

    fn sessions(&self) -> AxiomResult<Vec<SessionSummary>> {
        let list: SessionList = self.get("/api/sessions")?;
        Ok(list.sessions)
    }

    fn demo(&self, scenario_id: &str) -> AxiomResult<VerificationSession> {
        let path = format!("/api/demo/{}", scenario_id.replace('_', "-"));
        let response: VerifyResponse = self.post::<(), _>(&path, None)?;
        Ok(response.session)
    }

    fn agents(&self) -> AxiomResult<Vec<AgentInfo>> {
        let list: AgentList = self.get("/api/agents")?;
        Ok(list.agents)
    }

    fn stream(&self, request: &VerifyRequest) -> AxiomResult<VerificationStream> {
        let url = self.stream_url();
        let (mut socket, _) =
            tungstenite::connect(url.as_str()).map_err(|e| TransportError::ConnectionFailed {
                message: format!("{url}: {e}"),
            })?;

        let body = serde_json::to_string(request).map_err(|e| TransportError::SerializationFailed {
            message: e.to_string(),
        })?;
        socket
            .send(Message::text(body))
            .map_err(|e| TransportError::ConnectionFailed {
                message: e.to_string(),
            })?;

        if let MaybeTlsStream::Plain(tcp) = socket.get_ref() {
            tcp.set_read_timeout(Some(self.stream_poll))
                .map_err(|e| TransportError::ConnectionFailed {
                    message: e.to_string(),
                })?;
        }

        let (tx, rx) = unbounded();
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let worker = thread::Builder::new()
            .name("axiom-ws-reader".to_string())
            .spawn(move || read_frames(socket, &tx, &flag))
            .map_err(|e| AxiomError::internal(format!("failed to spawn stream reader: {e}")))?;

        debug!(%url, "verification stream opened");
        Ok(VerificationStream::new(rx, cancel, Some(worker)))
    }
}

/// Reads frames until a terminal event, closure, error, or cancellation.
/// Dropping `tx` on exit is what the consumer observes as `Closed`.
fn read_frames(
    mut socket: WebSocket<MaybeTlsStream<TcpStream>>,
    tx: &Sender<StreamItem>,
    cancel: &AtomicBool,
) {
    loop {
        if cancel.load(Ordering::Acquire) {
            break;
        }
        match socket.read() {
            Ok(Message::Text(text)) => {
                let item = match StreamEvent::parse(text.as_str()) {
                    Ok(event) => {
                        let terminal = event.is_terminal();
                        if tx.send(StreamItem::Event(event)).is_err() || terminal {
                            break;
                        }
                        continue;
                    }
                    Err(e) => StreamItem::Failed(e.to_string()),
                };
                let _ = tx.send(item);
                break;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => break,
            Err(e) => {
                warn!(error = %e, "verification stream read failed");
                let _ = tx.send(StreamItem::Failed(e.to_string()));
                break;
            }
        }
    }
    let _ = socket.close(None);
    let _ = socket.flush();
}

fn from_ureq(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["detail"].as_str().map(str::to_string))
                .unwrap_or(body);
            TransportError::ServerError { code, message }
        }
        ureq::Error::Transport(t) => TransportError::ConnectionFailed {
            message: t.to_string(),
        },
    }
}
