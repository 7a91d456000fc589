//! Live recording telemetry: the elapsed-time readout and the audio-level
//! bars rendered next to the transcript while a question is being answered.

/// Number of level bars in the waveform readout.
pub const LEVEL_BARS: usize = 30;

/// Resting height of a level bar with no signal.
const LEVEL_FLOOR: f32 = 2.0;
const LEVEL_CEIL: f32 = 50.0;

/// Collapses byte-spectrum frames into a fixed number of display bars.
#[derive(Debug, Clone)]
pub struct AudioLevelMeter {
    bars: [f32; LEVEL_BARS],
}

impl Default for AudioLevelMeter {
    fn default() -> Self {
        Self {
            bars: [LEVEL_FLOOR; LEVEL_BARS],
        }
    }
}

impl AudioLevelMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the bars from one spectrum frame. Each bar is the average of
    /// its slice of bins, scaled and clamped into the display range.
    pub fn update(&mut self, spectrum: &[u8]) {
        if spectrum.is_empty() {
            self.reset();
            return;
        }
        let step = (spectrum.len() / LEVEL_BARS).max(1);
        for (i, bar) in self.bars.iter_mut().enumerate() {
            let start = i * step;
            if start >= spectrum.len() {
                *bar = LEVEL_FLOOR;
                continue;
            }
            let end = (start + step).min(spectrum.len());
            let sum: u32 = spectrum[start..end].iter().map(|b| *b as u32).sum();
            let avg = sum as f32 / (end - start) as f32;
            *bar = (avg * 0.5).clamp(LEVEL_FLOOR, LEVEL_CEIL);
        }
    }

    /// Returns every bar to its resting height.
    pub fn reset(&mut self) {
        self.bars = [LEVEL_FLOOR; LEVEL_BARS];
    }

    pub fn bars(&self) -> &[f32; LEVEL_BARS] {
        &self.bars
    }
}

/// Wall-clock recording timer for the current question.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordingTimer {
    started_ms: Option<i64>,
}

impl RecordingTimer {
    pub fn start(&mut self, now_ms: i64) {
        self.started_ms = Some(now_ms);
    }

    pub fn stop(&mut self) {
        self.started_ms = None;
    }

    pub fn is_running(&self) -> bool {
        self.started_ms.is_some()
    }

    /// Whole seconds since the timer started, 0 when stopped.
    pub fn elapsed_seconds(&self, now_ms: i64) -> u64 {
        match self.started_ms {
            Some(started) => ((now_ms - started).max(0) / 1000) as u64,
            None => 0,
        }
    }
}

/// Formats a second count as MM:SS.
pub fn format_mm_ss(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
