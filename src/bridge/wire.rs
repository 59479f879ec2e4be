//! Wire shapes of the verification backend.
//!
//! Timestamps on the wire carry no offset, so they decode as
//! `NaiveDateTime` (UTC by convention).

use std::str::FromStr;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::assessment::{AgentAssessment, AgentName, Finding, FindingKind, Stance};
use crate::claim::{Claim, ClaimType, Severity, Verdict};
use crate::error::{AxiomResult, TransportError, ValidationError};
use crate::policy::{overall_action, RiskAction};
use crate::scenario::Scenario;
use crate::settlement::{EvidenceCounts, Settlement};

/// Body of `POST /api/verify`, `POST /api/extract-claims`, and the first
/// frame of `/ws/verify`.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub prompt: String,
    pub response: String,
    #[serde(default = "default_domain")]
    pub domain: String,
}

fn default_domain() -> String {
    "finance".to_string()
}

impl From<&Scenario> for VerifyRequest {
    fn from(scenario: &Scenario) -> Self {
        Self {
            prompt: scenario.prompt.clone(),
            response: scenario.response.clone(),
            domain: scenario.domain.clone(),
        }
    }
}

/// Backend verdict; `Uncertain` has no playback equivalent.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireVerdict {
    True,
    False,
    Uncertain,
}

impl From<Verdict> for WireVerdict {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::True => Self::True,
            Verdict::False => Self::False,
        }
    }
}

/// An extracted claim as the backend reports it.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireClaim {
    pub id: String,
    pub text: String,
    /// Kept as text: the backend knows claim types playback does not.
    #[serde(rename = "type")]
    pub claim_type: String,
    pub severity: Severity,
    #[serde(default)]
    pub source_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
}

impl WireClaim {
    fn from_claim(claim: &Claim) -> Self {
        Self {
            id: claim.id.clone(),
            text: claim.text.clone(),
            claim_type: enum_text(&claim.claim_type),
            severity: claim.severity,
            source_text: claim.highlight.clone().unwrap_or_default(),
            created_at: None,
        }
    }

    /// The playback claim type.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnsupportedClaimType` for types such as
    /// `QUOTE` or `CAUSAL`.
    pub fn playback_type(&self) -> Result<ClaimType, ValidationError> {
        serde_json::from_value(Value::String(self.claim_type.clone())).map_err(|_| {
            ValidationError::UnsupportedClaimType {
                claim: self.id.clone(),
                claim_type: self.claim_type.clone(),
            }
        })
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFinding {
    #[serde(rename = "type")]
    pub kind: FindingKind,
    pub text: String,
    pub source: String,
    pub relevance: f64,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireAssessment {
    pub agent_name: String,
    pub claim_id: String,
    pub position: Stance,
    pub confidence: f64,
    pub summary: String,
    #[serde(default)]
    pub findings: Vec<WireFinding>,
    #[serde(default)]
    pub latency_ms: f64,
}

/// A claim with its aggregated verification.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimVerification {
    pub claim: WireClaim,
    pub risk_score: f64,
    pub verdict: WireVerdict,
    pub action: RiskAction,
    pub rationale: String,
    #[serde(default)]
    pub assessments: Vec<WireAssessment>,
}

impl ClaimVerification {
    fn from_claim(claim: &Claim) -> Self {
        let assessments = claim
            .assessments
            .values()
            .map(|a| WireAssessment {
                agent_name: a.agent.as_str().to_string(),
                claim_id: claim.id.clone(),
                position: a.stance,
                confidence: a.confidence,
                summary: a.summary.clone(),
                findings: a
                    .findings
                    .iter()
                    .map(|f| WireFinding {
                        kind: f.kind,
                        text: f.text.clone(),
                        source: f.source.clone(),
                        relevance: f.relevance,
                    })
                    .collect(),
                latency_ms: 0.0,
            })
            .collect();

        Self {
            claim: WireClaim::from_claim(claim),
            risk_score: claim.risk_score,
            verdict: claim.verdict.into(),
            action: claim.action,
            rationale: claim.rationale.clone(),
            assessments,
        }
    }

    /// Converts to a playback claim.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for an `UNCERTAIN` verdict or an unknown
    /// claim type, and a `LookupError` for an assessment by an unknown agent.
    pub fn to_claim(&self) -> AxiomResult<Claim> {
        let verdict = match self.verdict {
            WireVerdict::True => Verdict::True,
            WireVerdict::False => Verdict::False,
            WireVerdict::Uncertain => {
                return Err(ValidationError::UnsupportedVerdict {
                    claim: self.claim.id.clone(),
                    verdict: "UNCERTAIN".to_string(),
                }
                .into())
            }
        };

        let mut assessments = std::collections::BTreeMap::new();
        for wire in &self.assessments {
            let agent = AgentName::from_str(&wire.agent_name).map_err(|_| {
                crate::error::LookupError::UnknownAgent {
                    agent: wire.agent_name.clone(),
                    claim_id: self.claim.id.clone(),
                }
            })?;
            assessments.insert(
                agent,
                AgentAssessment {
                    agent,
                    stance: wire.position,
                    confidence: wire.confidence,
                    summary: wire.summary.clone(),
                    findings: wire
                        .findings
                        .iter()
                        .map(|f| Finding {
                            kind: f.kind,
                            text: f.text.clone(),
                            source: f.source.clone(),
                            relevance: f.relevance,
                        })
                        .collect(),
                },
            );
        }

        let source = self.claim.source_text.trim();
        Ok(Claim {
            id: self.claim.id.clone(),
            text: self.claim.text.clone(),
            claim_type: self.claim.playback_type()?,
            severity: self.claim.severity,
            is_adverse: verdict == Verdict::False,
            highlight: (!source.is_empty()).then(|| source.to_string()),
            risk_score: self.risk_score,
            verdict,
            action: self.action,
            rationale: self.rationale.clone(),
            assessments,
        })
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSettlement {
    pub session_id: String,
    #[serde(default = "default_oracle")]
    pub oracle: String,
    pub confidence: f64,
    pub summary: String,
    #[serde(default)]
    pub evidence_supporting: u32,
    #[serde(default)]
    pub evidence_contradicting: u32,
    #[serde(default)]
    pub evidence_neutral: u32,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settled_at: Option<NaiveDateTime>,
}

fn default_oracle() -> String {
    "Sphinx Reasoning Engine".to_string()
}

impl WireSettlement {
    /// The playback settlement.
    #[must_use]
    pub fn to_settlement(&self) -> Settlement {
        Settlement {
            oracle: self.oracle.clone(),
            confidence: self.confidence,
            summary: self.summary.clone(),
            evidence: EvidenceCounts {
                supporting: self.evidence_supporting,
                contradicting: self.evidence_contradicting,
                neutral: self.evidence_neutral,
            },
            recommendation: self.recommendation.clone(),
        }
    }
}

/// A complete verification run.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSession {
    pub id: String,
    pub prompt: String,
    pub llm_response: String,
    #[serde(default)]
    pub claims: Vec<WireClaim>,
    #[serde(default)]
    pub verifications: Vec<ClaimVerification>,
    #[serde(default)]
    pub settlement: Option<WireSettlement>,
    #[serde(default)]
    pub overall_action: Option<RiskAction>,
    pub created_at: NaiveDateTime,
}

impl VerificationSession {
    /// Renders an authored scenario as a finished backend session.
    #[must_use]
    pub fn from_scenario(scenario: &Scenario) -> Self {
        let id = new_session_id();
        let s = &scenario.settlement;
        Self {
            prompt: scenario.prompt.clone(),
            llm_response: scenario.response.clone(),
            claims: scenario.claims.iter().map(WireClaim::from_claim).collect(),
            verifications: scenario
                .claims
                .iter()
                .map(ClaimVerification::from_claim)
                .collect(),
            settlement: Some(WireSettlement {
                session_id: id.clone(),
                oracle: s.oracle.clone(),
                confidence: s.confidence,
                summary: s.summary.clone(),
                evidence_supporting: s.evidence.supporting,
                evidence_contradicting: s.evidence.contradicting,
                evidence_neutral: s.evidence.neutral,
                recommendation: s.recommendation.clone(),
                settled_at: Some(Utc::now().naive_utc()),
            }),
            overall_action: Some(overall_action(&scenario.claims)),
            created_at: Utc::now().naive_utc(),
            id,
        }
    }

    /// Converts a finished session into a playable scenario.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MalformedFixture` when the session has no
    /// settlement, plus any error from [`ClaimVerification::to_claim`].
    pub fn to_scenario(&self, domain: &str) -> AxiomResult<Scenario> {
        let settlement = self
            .settlement
            .as_ref()
            .ok_or_else(|| ValidationError::MalformedFixture {
                name: self.id.clone(),
                message: "session has no settlement".to_string(),
            })?
            .to_settlement();
        let claims = self
            .verifications
            .iter()
            .map(ClaimVerification::to_claim)
            .collect::<AxiomResult<Vec<_>>>()?;

        Ok(Scenario {
            id: self.id.clone(),
            label: format!("Live session {}", self.id),
            domain: domain.to_string(),
            tagline: String::new(),
            context: String::new(),
            prompt: self.prompt.clone(),
            response: self.llm_response.clone(),
            claims,
            settlement,
            impact: String::new(),
        })
    }

    /// List-view summary.
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            prompt: self.prompt.chars().take(100).collect(),
            overall_action: self.overall_action,
            claims_count: self.claims.len(),
            created_at: self.created_at,
        }
    }
}

/// `SES-` followed by eight uppercase hex digits.
#[must_use]
pub fn new_session_id() -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("SES-{}", &hex[..8])
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub session: VerificationSession,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedClaims {
    pub claims: Vec<WireClaim>,
}

/// Row of `GET /api/sessions`.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub prompt: String,
    pub overall_action: Option<RiskAction>,
    pub claims_count: usize,
    pub created_at: NaiveDateTime,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionList {
    pub sessions: Vec<SessionSummary>,
}

/// Row of `GET /api/agents`.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub name: String,
    pub specialty: String,
}

impl From<AgentName> for AgentInfo {
    fn from(agent: AgentName) -> Self {
        Self {
            name: agent.as_str().to_string(),
            specialty: agent.profile().specialty.to_string(),
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentList {
    pub agents: Vec<AgentInfo>,
}

/// `GET /health`.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub demo_mode: bool,
}

impl HealthStatus {
    /// Whether the backend reports itself usable.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.as_str(), "healthy" | "ok")
    }
}

/// Stream event type tags.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventKind {
    SessionCreated,
    ClaimsExtracted,
    AgentQuote,
    RiskUpdate,
    Settlement,
    Action,
    Error,
}

/// One frame of `/ws/verify`: `{type, data, timestamp}`.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEnvelope {
    #[serde(rename = "type")]
    pub kind: StreamEventKind,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentQuote {
    pub claim_id: String,
    pub agent_name: String,
    pub position: Stance,
    pub confidence: f64,
    pub summary: String,
    #[serde(default)]
    pub findings_count: usize,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskUpdate {
    pub claim_id: String,
    pub risk_score: f64,
    pub verdict: WireVerdict,
    pub action: RiskAction,
    pub rationale: String,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementEvent {
    #[serde(flatten)]
    pub settlement: WireSettlement,
    pub overall_action: RiskAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionCreatedData {
    session_id: String,
    #[serde(default)]
    prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ActionData {
    action: RiskAction,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ErrorData {
    #[serde(default)]
    message: String,
}

/// Decoded stream event.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    SessionCreated { session_id: String, prompt: String },
    ClaimsExtracted { claims: Vec<WireClaim> },
    AgentQuote(AgentQuote),
    RiskUpdate(RiskUpdate),
    Settlement(SettlementEvent),
    /// Response-level action without a settlement (no verifiable claims).
    Action { action: RiskAction, reason: String },
    Error { message: String },
}

impl StreamEvent {
    /// Whether the server sends nothing further after this event.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Settlement(_) | Self::Action { .. } | Self::Error { .. })
    }

    /// The envelope tag for this event.
    #[must_use]
    pub const fn kind(&self) -> StreamEventKind {
        match self {
            Self::SessionCreated { .. } => StreamEventKind::SessionCreated,
            Self::ClaimsExtracted { .. } => StreamEventKind::ClaimsExtracted,
            Self::AgentQuote(_) => StreamEventKind::AgentQuote,
            Self::RiskUpdate(_) => StreamEventKind::RiskUpdate,
            Self::Settlement(_) => StreamEventKind::Settlement,
            Self::Action { .. } => StreamEventKind::Action,
            Self::Error { .. } => StreamEventKind::Error,
        }
    }

    /// Decodes one text frame.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::DeserializationFailed` for malformed JSON or
    /// a payload that does not match its tag.
    pub fn parse(text: &str) -> Result<Self, TransportError> {
        let envelope: StreamEnvelope = serde_json::from_str(text).map_err(deserialization)?;
        Self::from_envelope(envelope)
    }

    /// Decodes an envelope's payload according to its tag.
    ///
    /// # Errors
    ///
    /// See [`StreamEvent::parse`].
    pub fn from_envelope(envelope: StreamEnvelope) -> Result<Self, TransportError> {
        let data = envelope.data;
        let event = match envelope.kind {
            StreamEventKind::SessionCreated => {
                let d: SessionCreatedData = serde_json::from_value(data).map_err(deserialization)?;
                Self::SessionCreated {
                    session_id: d.session_id,
                    prompt: d.prompt,
                }
            }
            StreamEventKind::ClaimsExtracted => {
                let d: ExtractedClaims = serde_json::from_value(data).map_err(deserialization)?;
                Self::ClaimsExtracted { claims: d.claims }
            }
            StreamEventKind::AgentQuote => {
                Self::AgentQuote(serde_json::from_value(data).map_err(deserialization)?)
            }
            StreamEventKind::RiskUpdate => {
                Self::RiskUpdate(serde_json::from_value(data).map_err(deserialization)?)
            }
            StreamEventKind::Settlement => {
                Self::Settlement(serde_json::from_value(data).map_err(deserialization)?)
            }
            StreamEventKind::Action => {
                let d: ActionData = serde_json::from_value(data).map_err(deserialization)?;
                Self::Action {
                    action: d.action,
                    reason: d.reason,
                }
            }
            StreamEventKind::Error => {
                let d: ErrorData = serde_json::from_value(data).map_err(deserialization)?;
                Self::Error { message: d.message }
            }
        };
        Ok(event)
    }

    /// Encodes the event as an envelope stamped now.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::SerializationFailed` if the payload cannot be encoded.
    pub fn to_envelope(&self) -> Result<StreamEnvelope, TransportError> {
        let data = match self {
            Self::SessionCreated { session_id, prompt } => serde_json::to_value(SessionCreatedData {
                session_id: session_id.clone(),
                prompt: prompt.clone(),
            }),
            Self::ClaimsExtracted { claims } => serde_json::to_value(ExtractedClaims {
                claims: claims.clone(),
            }),
            Self::AgentQuote(q) => serde_json::to_value(q),
            Self::RiskUpdate(u) => serde_json::to_value(u),
            Self::Settlement(s) => serde_json::to_value(s),
            Self::Action { action, reason } => serde_json::to_value(ActionData {
                action: *action,
                reason: reason.clone(),
            }),
            Self::Error { message } => serde_json::to_value(ErrorData {
                message: message.clone(),
            }),
        }
        .map_err(|e| TransportError::SerializationFailed {
            message: e.to_string(),
        })?;

        Ok(StreamEnvelope {
            kind: self.kind(),
            data,
            timestamp: Some(Utc::now().naive_utc()),
        })
    }
}

fn deserialization(err: serde_json::Error) -> TransportError {
    TransportError::DeserializationFailed {
        message: err.to_string(),
    }
}

fn enum_text<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(s)) => s,
        _ => String::new(),
    }
}
