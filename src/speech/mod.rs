//! Bridges a continuous, possibly-restarting speech-recognition stream into
//! discrete finalized segments. The platform engine is consumed through the
//! [`RecognitionEngine`] capability trait so the reconciliation logic runs
//! against a fake event source in tests.

pub mod session;
pub mod telemetry;

pub use session::{ListenState, SpeechSession};
pub use telemetry::{format_mm_ss, AudioLevelMeter, RecordingTimer, LEVEL_BARS};

use chrono::Utc;
use thiserror::Error;

/// Classified recognition failures reported by an engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    /// Transient: nothing was heard for a while. Recognition continues.
    #[error("no speech detected")]
    NoSpeech,
    #[error("microphone permission denied")]
    NotAllowed,
    #[error("speech recognition not supported in this environment")]
    Unsupported,
    #[error("audio capture failed")]
    AudioCapture,
    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    #[error("recognition error: {0}")]
    Engine(RecognitionErrorKind),
    #[error("recognition session in flight; stop listening before reconfiguring")]
    Busy,
}

/// Recognition settings passed to the engine on every start.
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub language: String,
    /// Keep recognizing across pauses; the engine may still auto-stop.
    pub continuous: bool,
    pub interim_results: bool,
    pub max_alternatives: u32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            continuous: true,
            interim_results: true,
            max_alternatives: 1,
        }
    }
}

/// Discrete events emitted by a recognition engine, processed in arrival
/// order by [`SpeechSession::handle_event`].
#[derive(Debug, Clone)]
pub enum RecognitionEvent {
    Result {
        text: String,
        is_final: bool,
        confidence: f64,
    },
    Error(RecognitionErrorKind),
    /// The engine stopped, either on request or on its own.
    Ended,
}

/// Injected capability over the platform recognizer.
///
/// `stop` must tolerate an engine that is already stopped.
pub trait RecognitionEngine {
    fn start(&mut self, config: &SpeechConfig) -> Result<(), RecognitionErrorKind>;
    fn stop(&mut self);
}

/// Millisecond wall-clock source; tests inject a manual implementation.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}
