//! Streaming verification: the queued event feed and the run it folds into.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, TryRecvError};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::policy::RiskAction;

use super::wire::{AgentQuote, RiskUpdate, SettlementEvent, StreamEvent};

/// One queued item from a stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    Event(StreamEvent),
    /// The transport failed mid-stream.
    Failed(String),
    /// The channel closed. Always the last item.
    Closed,
}

/// A subscription to a streaming verification.
///
/// Frames are produced elsewhere (a reader thread, or a fixture replay) and
/// queued; the owner drains them on its own processing step. Cancelling is
/// idempotent, and dropping the stream cancels it.
#[derive(Debug)]
pub struct VerificationStream {
    rx: Receiver<StreamItem>,
    cancel: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    closed: bool,
}

impl VerificationStream {
    pub(crate) fn new(
        rx: Receiver<StreamItem>,
        cancel: Arc<AtomicBool>,
        worker: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            rx,
            cancel,
            worker,
            closed: false,
        }
    }

    /// A stream that yields `events` and then closes.
    #[must_use]
    pub fn from_events(events: impl IntoIterator<Item = StreamEvent>) -> Self {
        let (tx, rx) = unbounded();
        for event in events {
            let _ = tx.send(StreamItem::Event(event));
        }
        drop(tx);
        Self::new(rx, Arc::new(AtomicBool::new(false)), None)
    }

    /// A stream fed by `items` as they are sent.
    #[must_use]
    pub fn from_channel(rx: Receiver<StreamItem>) -> Self {
        Self::new(rx, Arc::new(AtomicBool::new(false)), None)
    }

    /// Next queued item without blocking.
    ///
    /// A disconnected channel yields `Closed` exactly once, then `None`.
    pub fn try_next(&mut self) -> Option<StreamItem> {
        if self.closed {
            return None;
        }
        match self.rx.try_recv() {
            Ok(item) => Some(self.observe(item)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.observe(StreamItem::Closed)),
        }
    }

    /// Next item, waiting up to `timeout`.
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<StreamItem> {
        if self.closed {
            return None;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Some(self.observe(item)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(self.observe(StreamItem::Closed)),
        }
    }

    /// Stops the subscription. Non-blocking and idempotent.
    pub fn cancel(&mut self) {
        if self.cancel.swap(true, Ordering::AcqRel) {
            return;
        }
        self.closed = true;
        // The reader notices the flag at its next poll and exits on its own.
        drop(self.worker.take());
    }

    /// Whether `cancel` has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Whether the stream has delivered `Closed` or been cancelled.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    fn observe(&mut self, item: StreamItem) -> StreamItem {
        if matches!(item, StreamItem::Closed) {
            self.closed = true;
        }
        item
    }
}

impl Drop for VerificationStream {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Release);
    }
}

/// Where a remote run stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RemoteStatus {
    Streaming,
    Settled,
    Failed { message: String },
    /// The channel closed before a settlement arrived.
    Incomplete,
    Cancelled,
}

impl RemoteStatus {
    /// Whether the run can still change.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Streaming)
    }
}

/// A streaming verification folded into a view model.
#[derive(Debug)]
pub struct RemoteRun {
    stream: VerificationStream,
    status: RemoteStatus,
    session_id: Option<String>,
    claim_ids: Vec<String>,
    quotes: Vec<AgentQuote>,
    risk_updates: Vec<RiskUpdate>,
    settlement: Option<SettlementEvent>,
    overall_action: Option<RiskAction>,
}

impl RemoteRun {
    /// Folds `stream` as it is drained.
    #[must_use]
    pub fn new(stream: VerificationStream) -> Self {
        Self {
            stream,
            status: RemoteStatus::Streaming,
            session_id: None,
            claim_ids: Vec::new(),
            quotes: Vec::new(),
            risk_updates: Vec::new(),
            settlement: None,
            overall_action: None,
        }
    }

    /// Applies every queued item. Returns how many were applied.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while self.status.is_open() {
            let Some(item) = self.stream.try_next() else {
                break;
            };
            self.apply(item);
            applied += 1;
        }
        applied
    }

    /// Blocks until the run leaves `Streaming` or `timeout` passes with no item.
    pub fn drain_blocking(&mut self, timeout: Duration) -> &RemoteStatus {
        while self.status.is_open() {
            let Some(item) = self.stream.next_timeout(timeout) else {
                break;
            };
            self.apply(item);
        }
        &self.status
    }

    /// Cancels the underlying stream. Idempotent.
    pub fn cancel(&mut self) {
        self.stream.cancel();
        if self.status.is_open() {
            info!(session = ?self.session_id, "remote verification cancelled");
            self.status = RemoteStatus::Cancelled;
        }
    }

    fn apply(&mut self, item: StreamItem) {
        match item {
            StreamItem::Event(event) => self.apply_event(event),
            StreamItem::Failed(message) => {
                warn!(%message, "remote verification stream failed");
                self.status = RemoteStatus::Failed { message };
            }
            StreamItem::Closed => {
                if self.status.is_open() {
                    warn!(session = ?self.session_id, "stream closed without a settlement");
                    self.status = RemoteStatus::Incomplete;
                }
            }
        }
    }

    fn apply_event(&mut self, event: StreamEvent) {
        debug!(kind = ?event.kind(), "stream event");
        match event {
            StreamEvent::SessionCreated { session_id, .. } => self.session_id = Some(session_id),
            StreamEvent::ClaimsExtracted { claims } => {
                self.claim_ids = claims.into_iter().map(|c| c.id).collect();
            }
            StreamEvent::AgentQuote(quote) => self.quotes.push(quote),
            StreamEvent::RiskUpdate(update) => self.risk_updates.push(update),
            StreamEvent::Settlement(settlement) => {
                self.overall_action = Some(settlement.overall_action);
                self.settlement = Some(settlement);
                self.status = RemoteStatus::Settled;
                self.stream.cancel();
            }
            StreamEvent::Action { action, .. } => {
                self.overall_action = Some(action);
                self.status = RemoteStatus::Settled;
                self.stream.cancel();
            }
            StreamEvent::Error { message } => {
                warn!(%message, "backend reported a verification error");
                self.status = RemoteStatus::Failed { message };
                self.stream.cancel();
            }
        }
    }

    /// Where the run stands.
    #[must_use]
    pub const fn status(&self) -> &RemoteStatus {
        &self.status
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Claim ids in extraction order.
    #[must_use]
    pub fn claim_ids(&self) -> &[String] {
        &self.claim_ids
    }

    #[must_use]
    pub fn quotes(&self) -> &[AgentQuote] {
        &self.quotes
    }

    #[must_use]
    pub fn risk_updates(&self) -> &[RiskUpdate] {
        &self.risk_updates
    }

    /// The settlement, present only once `Settled` by a settlement event.
    #[must_use]
    pub const fn settlement(&self) -> Option<&SettlementEvent> {
        self.settlement.as_ref()
    }

    #[must_use]
    pub const fn overall_action(&self) -> Option<RiskAction> {
        self.overall_action
    }
}

impl Drop for RemoteRun {
    fn drop(&mut self) {
        self.stream.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::Stance;
    use crate::bridge::wire::{WireSettlement, WireVerdict};

    fn quote(claim_id: &str) -> StreamEvent {
        StreamEvent::AgentQuote(AgentQuote {
            claim_id: claim_id.to_string(),
            agent_name: "RetrieverAgent".to_string(),
            position: Stance::Support,
            confidence: 0.8,
            summary: String::new(),
            findings_count: 1,
        })
    }

    fn settlement() -> StreamEvent {
        StreamEvent::Settlement(SettlementEvent {
            settlement: WireSettlement {
                session_id: "SES-00000001".to_string(),
                oracle: "Sphinx Reasoning Engine".to_string(),
                confidence: 0.97,
                summary: String::new(),
                evidence_supporting: 10,
                evidence_contradicting: 0,
                evidence_neutral: 1,
                recommendation: "Allow output.".to_string(),
                settled_at: None,
            },
            overall_action: RiskAction::Allow,
        })
    }

    #[test]
    fn test_settled_run() {
        let mut run = RemoteRun::new(VerificationStream::from_events(vec![
            StreamEvent::SessionCreated {
                session_id: "SES-00000001".to_string(),
                prompt: String::new(),
            },
            quote("CLM-001"),
            StreamEvent::RiskUpdate(RiskUpdate {
                claim_id: "CLM-001".to_string(),
                risk_score: 0.96,
                verdict: WireVerdict::True,
                action: RiskAction::Allow,
                rationale: String::new(),
            }),
            settlement(),
        ]));
        assert_eq!(run.drain(), 4);
        assert_eq!(run.status(), &RemoteStatus::Settled);
        assert_eq!(run.session_id(), Some("SES-00000001"));
        assert_eq!(run.quotes().len(), 1);
        assert_eq!(run.overall_action(), Some(RiskAction::Allow));
        assert!(run.settlement().is_some());
        assert_eq!(run.drain(), 0);
    }

    #[test]
    fn test_closure_without_settlement_is_incomplete() {
        let mut run = RemoteRun::new(VerificationStream::from_events(vec![quote("CLM-001")]));
        run.drain();
        assert_eq!(run.status(), &RemoteStatus::Incomplete);
        assert!(run.settlement().is_none());
        assert!(run.overall_action().is_none());
    }

    #[test]
    fn test_error_event_fails_run() {
        let mut run = RemoteRun::new(VerificationStream::from_events(vec![
            StreamEvent::Error {
                message: "Response text is required.".to_string(),
            },
            settlement(),
        ]));
        run.drain();
        assert_eq!(
            run.status(),
            &RemoteStatus::Failed {
                message: "Response text is required.".to_string()
            }
        );
    }

    #[test]
    fn test_cancel_is_idempotent_and_sticky() {
        let (tx, rx) = unbounded();
        let mut run = RemoteRun::new(VerificationStream::from_channel(rx));
        tx.send(StreamItem::Event(quote("CLM-001"))).unwrap();
        assert_eq!(run.drain(), 1);

        run.cancel();
        run.cancel();
        assert_eq!(run.status(), &RemoteStatus::Cancelled);

        tx.send(StreamItem::Event(settlement())).unwrap();
        assert_eq!(run.drain(), 0);
        assert_eq!(run.status(), &RemoteStatus::Cancelled);
    }

    #[test]
    fn test_drain_blocking_waits_for_settlement() {
        let (tx, rx) = unbounded();
        let mut run = RemoteRun::new(VerificationStream::from_channel(rx));
        let sender = std::thread::spawn(move || {
            for event in [quote("CLM-001"), quote("CLM-002"), settlement()] {
                std::thread::sleep(Duration::from_millis(20));
                tx.send(StreamItem::Event(event)).unwrap();
            }
        });
        assert_eq!(run.drain(), 0);
        assert_eq!(
            run.drain_blocking(Duration::from_secs(2)),
            &RemoteStatus::Settled
        );
        assert_eq!(run.quotes().len(), 2);
        sender.join().unwrap();
    }

    #[test]
    fn test_drain_blocking_gives_up_on_a_quiet_stream() {
        let (tx, rx) = unbounded();
        let mut run = RemoteRun::new(VerificationStream::from_channel(rx));
        tx.send(StreamItem::Event(quote("CLM-001"))).unwrap();
        assert_eq!(
            run.drain_blocking(Duration::from_millis(30)),
            &RemoteStatus::Streaming
        );
        assert_eq!(run.quotes().len(), 1);

        drop(tx);
        assert_eq!(
            run.drain_blocking(Duration::from_millis(30)),
            &RemoteStatus::Incomplete
        );
    }

    #[test]
    fn test_stream_closed_once() {
        let mut stream = VerificationStream::from_events(Vec::new());
        assert_eq!(stream.try_next(), Some(StreamItem::Closed));
        assert_eq!(stream.try_next(), None);
        assert!(stream.is_closed());
    }
}
