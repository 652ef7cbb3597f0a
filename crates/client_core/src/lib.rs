use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{
    domain::{MessageKind, RiskLevel, Sender, Urgency, MAX_MESSAGE_UTF16_UNITS},
    error::{TransportError, TurnError},
    protocol::TriageReply,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

pub mod http_transport;
pub mod presenter;
pub use http_transport::HttpTriageTransport;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const EMERGENCY_BANNER_AUTO_HIDE: Duration = Duration::from_secs(30);

const GREETING: &str = "Hello! I'm your medical triage assistant. Describe your symptoms or ask \
a health question, and I'll help you work out how urgent it might be.";

/// Outbound seam to the remote triage service.
#[async_trait]
pub trait TriageTransport: Send + Sync {
    async fn send_chat(&self, message: &str) -> Result<TriageReply, TransportError>;
    async fn fetch_health_tips(&self) -> Result<Vec<String>, TransportError>;
}

pub struct MissingTriageTransport;

#[async_trait]
impl TriageTransport for MissingTriageTransport {
    async fn send_chat(&self, _message: &str) -> Result<TriageReply, TransportError> {
        Err(TransportError::Network(
            "triage service transport is unavailable".to_string(),
        ))
    }

    async fn fetch_health_tips(&self) -> Result<Vec<String>, TransportError> {
        Err(TransportError::Network(
            "triage service transport is unavailable".to_string(),
        ))
    }
}

#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub sender: Sender,
    pub kind: MessageKind,
    pub body: String,
    /// Full structured reply for assistant entries, for layered rendering.
    pub reply: Option<TriageReply>,
    pub sent_at: DateTime<Utc>,
}

impl TranscriptEntry {
    fn greeting() -> Self {
        Self {
            sender: Sender::Assistant,
            kind: MessageKind::Greeting,
            body: GREETING.to_string(),
            reply: None,
            sent_at: Utc::now(),
        }
    }

    fn user(body: &str) -> Self {
        Self {
            sender: Sender::User,
            kind: MessageKind::Normal,
            body: body.to_string(),
            reply: None,
            sent_at: Utc::now(),
        }
    }

    fn assistant(reply: TriageReply) -> Self {
        Self {
            sender: Sender::Assistant,
            kind: MessageKind::Normal,
            body: reply.response.clone(),
            reply: Some(reply),
            sent_at: Utc::now(),
        }
    }

    fn emergency(reply: TriageReply) -> Self {
        Self {
            sender: Sender::Assistant,
            kind: MessageKind::Emergency,
            body: reply.response.clone(),
            reply: Some(reply),
            sent_at: Utc::now(),
        }
    }
}

/// Last-known metric displays; `None` renders as the unset placeholder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub response_secs: Option<f64>,
    pub risk_level: Option<RiskLevel>,
    pub urgency: Option<Urgency>,
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub input_enabled: bool,
    pub loading_visible: bool,
    pub emergency_banner_visible: bool,
    pub metrics: MetricsSnapshot,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            input_enabled: true,
            loading_visible: false,
            emergency_banner_visible: false,
            metrics: MetricsSnapshot::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    MessageAppended(TranscriptEntry),
    InputCleared,
    TurnFailed { notice: String },
    MetricsUpdated(MetricsSnapshot),
    EmergencyBannerShown { message: String },
    EmergencyBannerHidden,
    EmergencyAttention,
    ConversationCleared,
    FocusInput,
}

enum TurnOutcome {
    Settled(Result<TriageReply, TransportError>),
    TimedOut,
}

struct ControllerState {
    ui: UiState,
    transcript: Vec<TranscriptEntry>,
    turn_in_flight: bool,
    /// Bumped per accepted submit; a completion carrying an older value
    /// arrived after its turn was already terminated and must be dropped.
    turn_generation: u64,
    /// Bumped per banner show/clear so a pending auto-hide can be disarmed.
    banner_generation: u64,
}

/// Turn Controller: owns UiState and the transcript, issues exactly one
/// request per user turn, races it against the timeout, and classifies the
/// result into the emergency or normal path.
pub struct ChatController {
    transport: Arc<dyn TriageTransport>,
    request_timeout: Duration,
    banner_auto_hide: Duration,
    inner: Mutex<ControllerState>,
    events: broadcast::Sender<UiEvent>,
}

impl ChatController {
    pub fn new(transport: Arc<dyn TriageTransport>) -> Arc<Self> {
        Self::new_with_timing(transport, DEFAULT_REQUEST_TIMEOUT, EMERGENCY_BANNER_AUTO_HIDE)
    }

    pub fn new_with_timing(
        transport: Arc<dyn TriageTransport>,
        request_timeout: Duration,
        banner_auto_hide: Duration,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            transport,
            request_timeout,
            banner_auto_hide,
            inner: Mutex::new(ControllerState {
                ui: UiState::default(),
                transcript: vec![TranscriptEntry::greeting()],
                turn_in_flight: false,
                turn_generation: 0,
                banner_generation: 0,
            }),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<UiEvent> {
        self.events.subscribe()
    }

    pub async fn ui_snapshot(&self) -> UiState {
        self.inner.lock().await.ui.clone()
    }

    pub async fn transcript(&self) -> Vec<TranscriptEntry> {
        self.inner.lock().await.transcript.clone()
    }

    /// Run one full turn: validate, transmit, race the timeout, classify,
    /// and restore the input state. Returns the terminal error when the
    /// turn failed; the same outcome is surfaced as `UiEvent`s either way.
    pub async fn submit(self: &Arc<Self>, text: &str) -> Result<(), TurnError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            let err = TurnError::EmptyMessage;
            let _ = self.events.send(UiEvent::TurnFailed {
                notice: err.user_notice(),
            });
            return Err(err);
        }
        let length = trimmed.encode_utf16().count();
        if length > MAX_MESSAGE_UTF16_UNITS {
            let err = TurnError::MessageTooLong {
                length,
                max: MAX_MESSAGE_UTF16_UNITS,
            };
            let _ = self.events.send(UiEvent::TurnFailed {
                notice: err.user_notice(),
            });
            return Err(err);
        }

        let message = trimmed.to_string();
        let (generation, entry) = {
            let mut inner = self.inner.lock().await;
            if inner.turn_in_flight {
                return Err(TurnError::TurnInFlight);
            }
            inner.turn_in_flight = true;
            inner.turn_generation += 1;
            inner.ui.input_enabled = false;
            inner.ui.loading_visible = true;
            let entry = TranscriptEntry::user(&message);
            inner.transcript.push(entry.clone());
            (inner.turn_generation, entry)
        };

        // The user's own message always renders before any classification.
        let _ = self.events.send(UiEvent::MessageAppended(entry));
        let _ = self.events.send(UiEvent::InputCleared);

        let started = Instant::now();
        info!(generation, length, "turn submitted");

        let outcome = tokio::select! {
            result = self.transport.send_chat(&message) => TurnOutcome::Settled(result),
            _ = tokio::time::sleep(self.request_timeout) => TurnOutcome::TimedOut,
        };

        self.finish_turn(generation, started, outcome).await
    }

    /// Terminal classification plus post-terminal cleanup. Idempotent per
    /// turn: a completion whose generation no longer matches is a no-op.
    async fn finish_turn(
        self: &Arc<Self>,
        generation: u64,
        started: Instant,
        outcome: TurnOutcome,
    ) -> Result<(), TurnError> {
        let mut pending_events: Vec<UiEvent> = Vec::new();
        let mut arm_banner_hide: Option<u64> = None;

        let result = {
            let mut inner = self.inner.lock().await;
            if inner.turn_generation != generation || !inner.turn_in_flight {
                warn!(generation, "dropping stale turn completion");
                return Ok(());
            }
            inner.turn_in_flight = false;

            let result = match outcome {
                TurnOutcome::TimedOut => Err(TurnError::Timeout(self.request_timeout.as_secs())),
                TurnOutcome::Settled(Err(TransportError::Network(message))) => {
                    Err(TurnError::Network(message))
                }
                TurnOutcome::Settled(Err(TransportError::Status {
                    status,
                    error_message,
                })) => Err(TurnError::Server {
                    status,
                    message: error_message,
                }),
                TurnOutcome::Settled(Ok(reply)) => {
                    let elapsed = round_to_hundredths(started.elapsed().as_secs_f64());
                    inner.ui.metrics = MetricsSnapshot {
                        response_secs: Some(elapsed),
                        risk_level: Some(reply.risk_level.clone()),
                        urgency: Some(reply.urgency.clone()),
                    };
                    pending_events.push(UiEvent::MetricsUpdated(inner.ui.metrics.clone()));

                    if reply.emergency {
                        warn!(
                            generation,
                            risk = reply.risk_level.style_key(),
                            "emergency response received"
                        );
                        inner.ui.emergency_banner_visible = true;
                        inner.banner_generation += 1;
                        arm_banner_hide = Some(inner.banner_generation);
                        pending_events.push(UiEvent::EmergencyBannerShown {
                            message: reply.response.clone(),
                        });
                        let entry = TranscriptEntry::emergency(reply);
                        inner.transcript.push(entry.clone());
                        pending_events.push(UiEvent::MessageAppended(entry));
                        pending_events.push(UiEvent::EmergencyAttention);
                    } else {
                        let entry = TranscriptEntry::assistant(reply);
                        inner.transcript.push(entry.clone());
                        pending_events.push(UiEvent::MessageAppended(entry));
                    }
                    Ok(())
                }
            };

            // Cleanup runs for every branch above, error or not.
            inner.ui.input_enabled = true;
            inner.ui.loading_visible = false;
            result
        };

        if let Err(err) = &result {
            warn!(generation, error = %err, "turn failed");
            pending_events.push(UiEvent::TurnFailed {
                notice: err.user_notice(),
            });
        }
        pending_events.push(UiEvent::FocusInput);

        for event in pending_events {
            let _ = self.events.send(event);
        }

        if let Some(banner_generation) = arm_banner_hide {
            self.arm_banner_auto_hide(banner_generation);
        }

        result
    }

    fn arm_banner_auto_hide(self: &Arc<Self>, banner_generation: u64) {
        let controller = Arc::clone(self);
        let delay = self.banner_auto_hide;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            controller.hide_banner_if_current(banner_generation).await;
        });
    }

    async fn hide_banner_if_current(&self, banner_generation: u64) {
        let hidden = {
            let mut inner = self.inner.lock().await;
            if inner.banner_generation == banner_generation && inner.ui.emergency_banner_visible {
                inner.ui.emergency_banner_visible = false;
                true
            } else {
                false
            }
        };
        if hidden {
            let _ = self.events.send(UiEvent::EmergencyBannerHidden);
        }
    }

    /// Reset the view to the initial greeting, clear displayed metrics, and
    /// hide the banner immediately. An in-flight turn is not cancelled; its
    /// terminal handling still applies when it lands.
    pub async fn clear_conversation(&self) {
        let banner_was_visible = {
            let mut inner = self.inner.lock().await;
            inner.transcript = vec![TranscriptEntry::greeting()];
            inner.ui.metrics = MetricsSnapshot::default();
            inner.banner_generation += 1;
            let was_visible = inner.ui.emergency_banner_visible;
            inner.ui.emergency_banner_visible = false;
            was_visible
        };

        if banner_was_visible {
            let _ = self.events.send(UiEvent::EmergencyBannerHidden);
        }
        let _ = self.events.send(UiEvent::ConversationCleared);
        let _ = self.events.send(UiEvent::FocusInput);
    }

    /// Not a turn: does not touch UiState or the transcript.
    pub async fn health_tips(&self) -> Result<Vec<String>, TransportError> {
        self.transport.fetch_health_tips().await
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
