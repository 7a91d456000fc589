use log::{debug, error, warn};

use super::telemetry::{AudioLevelMeter, RecordingTimer, LEVEL_BARS};
use super::{Clock, RecognitionEngine, RecognitionErrorKind, RecognitionEvent, SpeechConfig, SpeechError, SystemClock};
use crate::transcript::{SnapshotStore, TranscriptManager, TranscriptSegment};

/// Caller-intent state of the recognition stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenState {
    Idle,
    Listening,
    /// Stop requested; waiting for the engine's end event.
    Stopping,
}

/// Drives a single question's capture: reconciles interim and finalized
/// recognition results, buffers timestamped segments, and forwards newly
/// finalized segments to the [`TranscriptManager`].
pub struct SpeechSession<E: RecognitionEngine, C: Clock = SystemClock> {
    engine: E,
    clock: C,
    config: SpeechConfig,
    state: ListenState,
    /// Accumulated finalized text for the current question.
    transcript: String,
    /// Provisional text, fully replaced on every interim event.
    interim: String,
    /// Finalized segments since the last reset, in arrival order.
    segments: Vec<TranscriptSegment>,
    /// Length cursor into `segments`: everything before it has already been
    /// forwarded to the transcript manager.
    forwarded: usize,
    /// Start reference for the next segment: previous segment end, or the
    /// time listening began.
    anchor_ms: i64,
    last_error: Option<RecognitionErrorKind>,
    timer: RecordingTimer,
    levels: AudioLevelMeter,
}

impl<E: RecognitionEngine> SpeechSession<E, SystemClock> {
    pub fn new(engine: E, config: SpeechConfig) -> Self {
        Self::with_clock(engine, config, SystemClock)
    }
}

impl<E: RecognitionEngine, C: Clock> SpeechSession<E, C> {
    pub fn with_clock(engine: E, config: SpeechConfig, clock: C) -> Self {
        Self {
            engine,
            clock,
            config,
            state: ListenState::Idle,
            transcript: String::new(),
            interim: String::new(),
            segments: Vec::new(),
            forwarded: 0,
            anchor_ms: 0,
            last_error: None,
            timer: RecordingTimer::default(),
            levels: AudioLevelMeter::new(),
        }
    }

    pub fn state(&self) -> ListenState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == ListenState::Listening
    }

    /// Finalized text accumulated since the last reset.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Current provisional recognition output.
    pub fn interim_text(&self) -> &str {
        &self.interim
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    pub fn last_error(&self) -> Option<&RecognitionErrorKind> {
        self.last_error.as_ref()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Starts the engine and resets per-question capture state. Fails fast
    /// when the environment denies recognition; no state is consumed in
    /// that case and the session never pretends to be listening.
    pub fn start_listening(&mut self) -> Result<(), SpeechError> {
        if self.state == ListenState::Listening {
            return Ok(());
        }
        if let Err(kind) = self.engine.start(&self.config) {
            error!("Failed to start recognition: {kind}");
            self.last_error = Some(kind.clone());
            self.state = ListenState::Idle;
            return Err(SpeechError::Engine(kind));
        }
        let now = self.clock.now_ms();
        self.transcript.clear();
        self.interim.clear();
        self.segments.clear();
        self.forwarded = 0;
        self.anchor_ms = now;
        self.last_error = None;
        self.state = ListenState::Listening;
        self.timer.start(now);
        Ok(())
    }

    /// Requests a stop. Idempotent: safe to call when already stopped, and
    /// never errors if the engine is already down. Telemetry is released on
    /// this path regardless of what the engine does next.
    pub fn stop_listening(&mut self) {
        if self.state == ListenState::Idle {
            return;
        }
        self.engine.stop();
        self.state = ListenState::Stopping;
        self.release_telemetry();
    }

    /// Processes one engine event. Events within a stream are handled in
    /// arrival order; interleaving with timer/level reads is safe.
    pub fn handle_event(&mut self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::Result {
                text,
                is_final,
                confidence,
            } => self.on_result(text, is_final, confidence),
            RecognitionEvent::Error(kind) => self.on_error(kind),
            RecognitionEvent::Ended => self.on_ended(),
        }
    }

    fn on_result(&mut self, text: String, is_final: bool, confidence: f64) {
        if self.state != ListenState::Listening {
            debug!("dropping recognition result while not listening");
            return;
        }
        if !is_final {
            // Interim output replaces, never appends.
            self.interim = text;
            return;
        }
        let now = self.clock.now_ms();
        if !self.transcript.is_empty() {
            self.transcript.push(' ');
        }
        self.transcript.push_str(&text);
        self.segments.push(TranscriptSegment {
            text,
            start_time: self.anchor_ms,
            end_time: now,
            confidence,
        });
        self.anchor_ms = now;
        self.interim.clear();
    }

    fn on_error(&mut self, kind: RecognitionErrorKind) {
        if kind == RecognitionErrorKind::NoSpeech {
            // Noise, not a failure. Recognition keeps running.
            debug!("No speech detected. Continuing...");
            return;
        }
        warn!("Recognition error: {kind}");
        self.last_error = Some(kind);
        self.engine.stop();
        self.state = ListenState::Idle;
        self.release_telemetry();
    }

    fn on_ended(&mut self) {
        match self.state {
            // The engine auto-stopped while the caller still wants to
            // listen: restart without touching already-finalized text.
            ListenState::Listening if self.config.continuous => {
                if let Err(kind) = self.engine.start(&self.config) {
                    error!("Failed to restart recognition: {kind}");
                    self.last_error = Some(kind);
                    self.state = ListenState::Idle;
                    self.release_telemetry();
                }
            }
            ListenState::Listening | ListenState::Stopping => {
                self.state = ListenState::Idle;
                self.release_telemetry();
            }
            ListenState::Idle => {}
        }
    }

    /// Forwards segments past the cursor to the manager. Returns how many
    /// were forwarded; the cursor only advances when the manager accepts
    /// them, so nothing is duplicated or lost across calls.
    pub fn flush_segments<S: SnapshotStore>(&mut self, manager: &mut TranscriptManager<S>) -> usize {
        let fresh = &self.segments[self.forwarded..];
        if fresh.is_empty() {
            return 0;
        }
        let count = fresh.len();
        if manager.add_segments(fresh) {
            self.forwarded = self.segments.len();
            count
        } else {
            warn!("transcript manager rejected {count} segments; keeping them buffered");
            0
        }
    }

    /// Moves capture to another question: stops if listening, flushes
    /// pending segments to the outgoing question, resets capture state,
    /// activates the new question, and optionally restarts listening.
    pub fn change_question<S: SnapshotStore>(
        &mut self,
        manager: &mut TranscriptManager<S>,
        question_id: i64,
        question_text: &str,
        auto_restart: bool,
    ) -> Result<(), SpeechError> {
        if self.state != ListenState::Idle {
            self.stop_listening();
        }
        self.flush_segments(manager);
        self.transcript.clear();
        self.interim.clear();
        self.segments.clear();
        self.forwarded = 0;
        manager.set_active_question(question_id, question_text);
        if auto_restart {
            self.start_listening()?;
        }
        Ok(())
    }

    /// Changing the recognition language requires a full stop/reconfigure/
    /// restart cycle; it cannot happen while a session is in flight.
    pub fn set_language(&mut self, language: &str) -> Result<(), SpeechError> {
        if self.state != ListenState::Idle {
            return Err(SpeechError::Busy);
        }
        self.config.language = language.to_string();
        Ok(())
    }

    /// Component teardown: stop the engine and drop all telemetry handles.
    pub fn release(&mut self) {
        if self.state != ListenState::Idle {
            self.engine.stop();
            self.state = ListenState::Idle;
        }
        self.release_telemetry();
    }

    /// Feeds one audio spectrum frame to the level meter. Frames arriving
    /// after the session stopped listening are discarded.
    pub fn push_level_frame(&mut self, spectrum: &[u8]) {
        if self.state != ListenState::Listening {
            return;
        }
        self.levels.update(spectrum);
    }

    pub fn level_bars(&self) -> &[f32; LEVEL_BARS] {
        self.levels.bars()
    }

    /// Seconds of recording on the current question, 0 when not listening.
    pub fn elapsed_seconds(&self) -> u64 {
        self.timer.elapsed_seconds(self.clock.now_ms())
    }

    fn release_telemetry(&mut self) {
        self.timer.stop();
        self.levels.reset();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[derive(Default)]
    struct FakeEngine {
        starts: u32,
        stops: u32,
        fail_start: Option<RecognitionErrorKind>,
    }

    impl RecognitionEngine for FakeEngine {
        fn start(&mut self, _config: &SpeechConfig) -> Result<(), RecognitionErrorKind> {
            if let Some(kind) = self.fail_start.clone() {
                return Err(kind);
            }
            self.starts += 1;
            Ok(())
        }

        fn stop(&mut self) {
            self.stops += 1;
        }
    }

    #[derive(Clone)]
    struct ManualClock(Rc<Cell<i64>>);

    impl ManualClock {
        fn new(start: i64) -> Self {
            Self(Rc::new(Cell::new(start)))
        }

        fn advance(&self, ms: i64) {
            self.0.set(self.0.get() + ms);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> i64 {
            self.0.get()
        }
    }

    fn session_at(start_ms: i64) -> (SpeechSession<FakeEngine, ManualClock>, ManualClock) {
        let clock = ManualClock::new(start_ms);
        let session = SpeechSession::with_clock(FakeEngine::default(), SpeechConfig::default(), clock.clone());
        (session, clock)
    }

    fn final_result(text: &str, confidence: f64) -> RecognitionEvent {
        RecognitionEvent::Result {
            text: text.to_string(),
            is_final: true,
            confidence,
        }
    }

    fn interim_result(text: &str) -> RecognitionEvent {
        RecognitionEvent::Result {
            text: text.to_string(),
            is_final: false,
            confidence: 0.0,
        }
    }

    #[test]
    fn test_final_results_become_anchored_segments() {
        let (mut session, clock) = session_at(1_000);
        session.start_listening().unwrap();

        clock.advance(500);
        session.handle_event(final_result("I am", 0.9));
        clock.advance(700);
        session.handle_event(final_result("a developer", 0.8));

        let segments = session.segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start_time, 1_000);
        assert_eq!(segments[0].end_time, 1_500);
        // Next segment starts where the previous one ended.
        assert_eq!(segments[1].start_time, 1_500);
        assert_eq!(segments[1].end_time, 2_200);
        assert_eq!(session.transcript(), "I am a developer");
    }

    #[test]
    fn test_interim_is_replaced_wholesale_and_cleared_on_final() {
        let (mut session, _clock) = session_at(0);
        session.start_listening().unwrap();

        session.handle_event(interim_result("hel"));
        session.handle_event(interim_result("hello wor"));
        assert_eq!(session.interim_text(), "hello wor");

        session.handle_event(final_result("hello world", 0.95));
        assert_eq!(session.interim_text(), "");
        assert_eq!(session.transcript(), "hello world");
    }

    #[test]
    fn test_no_speech_is_transparent() {
        let (mut session, _clock) = session_at(0);
        session.start_listening().unwrap();

        session.handle_event(RecognitionEvent::Error(RecognitionErrorKind::NoSpeech));

        assert!(session.is_listening());
        assert!(session.last_error().is_none());
    }

    #[test]
    fn test_permission_denied_fails_fast_on_start() {
        let clock = ManualClock::new(0);
        let engine = FakeEngine {
            fail_start: Some(RecognitionErrorKind::NotAllowed),
            ..FakeEngine::default()
        };
        let mut session = SpeechSession::with_clock(engine, SpeechConfig::default(), clock);

        let err = session.start_listening().unwrap_err();
        assert_eq!(err, SpeechError::Engine(RecognitionErrorKind::NotAllowed));
        assert!(!session.is_listening());
    }

    #[test]
    fn test_fatal_error_stops_session_and_reports() {
        let (mut session, _clock) = session_at(0);
        session.start_listening().unwrap();

        session.handle_event(RecognitionEvent::Error(RecognitionErrorKind::AudioCapture));

        assert!(!session.is_listening());
        assert_eq!(session.last_error(), Some(&RecognitionErrorKind::AudioCapture));
        assert_eq!(session.engine().stops, 1);
        assert_eq!(session.elapsed_seconds(), 0);
    }

    #[test]
    fn test_auto_restart_preserves_finalized_text() {
        let (mut session, clock) = session_at(0);
        session.start_listening().unwrap();
        clock.advance(100);
        session.handle_event(final_result("first chunk", 0.9));

        // Engine auto-stop while intent is still "listening".
        session.handle_event(RecognitionEvent::Ended);

        assert!(session.is_listening());
        assert_eq!(session.engine().starts, 2);
        assert_eq!(session.segments().len(), 1);
        assert_eq!(session.transcript(), "first chunk");
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut session, _clock) = session_at(0);
        session.start_listening().unwrap();

        session.stop_listening();
        let state_after_first = session.state();
        session.stop_listening();

        assert_eq!(session.state(), state_after_first);
        session.handle_event(RecognitionEvent::Ended);
        assert_eq!(session.state(), ListenState::Idle);

        // Stopping an already-idle session is a no-op.
        session.stop_listening();
        assert_eq!(session.state(), ListenState::Idle);
    }

    #[test]
    fn test_flush_forwards_only_new_segments() {
        let (mut session, clock) = session_at(0);
        let mut manager = TranscriptManager::in_memory();
        manager.start_session();
        manager.set_active_question(0, "Q");

        session.start_listening().unwrap();
        clock.advance(100);
        session.handle_event(final_result("one", 0.9));
        assert_eq!(session.flush_segments(&mut manager), 1);
        assert_eq!(session.flush_segments(&mut manager), 0);

        clock.advance(100);
        session.handle_event(final_result("two", 0.9));
        // Restart in between must not rewind the cursor.
        session.handle_event(RecognitionEvent::Ended);
        assert_eq!(session.flush_segments(&mut manager), 1);

        let transcript = manager.get_question_transcript(0).unwrap();
        assert_eq!(transcript.full_text, "one two");
    }

    #[test]
    fn test_flush_without_active_question_keeps_buffer() {
        let (mut session, clock) = session_at(0);
        let mut manager = TranscriptManager::in_memory();
        manager.start_session();

        session.start_listening().unwrap();
        clock.advance(100);
        session.handle_event(final_result("pending", 0.9));

        assert_eq!(session.flush_segments(&mut manager), 0);
        // Once a question becomes active the buffered segment still goes out.
        manager.set_active_question(0, "Q");
        assert_eq!(session.flush_segments(&mut manager), 1);
    }

    #[test]
    fn test_change_question_flushes_resets_and_restarts() {
        let (mut session, clock) = session_at(0);
        let mut manager = TranscriptManager::in_memory();
        manager.start_session();
        manager.set_active_question(0, "First");

        session.start_listening().unwrap();
        clock.advance(100);
        session.handle_event(final_result("old answer", 0.9));

        session.change_question(&mut manager, 1, "Second", true).unwrap();

        // Pending speech landed on the outgoing question.
        assert_eq!(manager.get_question_transcript(0).unwrap().full_text, "old answer");
        assert_eq!(manager.active_question(), Some(1));
        assert!(session.is_listening());
        assert_eq!(session.transcript(), "");
        assert!(session.segments().is_empty());

        clock.advance(100);
        session.handle_event(final_result("new answer", 0.9));
        session.flush_segments(&mut manager);
        assert_eq!(manager.get_question_transcript(1).unwrap().full_text, "new answer");
    }

    #[test]
    fn test_language_change_requires_idle() {
        let (mut session, _clock) = session_at(0);
        session.start_listening().unwrap();

        assert_eq!(session.set_language("de-DE"), Err(SpeechError::Busy));

        session.stop_listening();
        session.handle_event(RecognitionEvent::Ended);
        assert_eq!(session.set_language("de-DE"), Ok(()));
    }

    #[test]
    fn test_level_frames_ignored_after_stop() {
        let (mut session, _clock) = session_at(0);
        session.start_listening().unwrap();

        session.push_level_frame(&[200u8; 60]);
        assert!(session.level_bars().iter().any(|b| *b > 2.0));

        session.stop_listening();
        assert!(session.level_bars().iter().all(|b| *b == 2.0));
        session.push_level_frame(&[200u8; 60]);
        assert!(session.level_bars().iter().all(|b| *b == 2.0));
    }

    #[test]
    fn test_elapsed_seconds_tracks_clock() {
        let (mut session, clock) = session_at(10_000);
        session.start_listening().unwrap();
        clock.advance(42_000);
        assert_eq!(session.elapsed_seconds(), 42);
    }
}
