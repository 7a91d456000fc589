use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default set of English filler words and phrases detected in answers.
const DEFAULT_FILLER_WORDS: &[&str] = &[
    "um",
    "uh",
    "er",
    "ah",
    "like",
    "basically",
    "literally",
    "actually",
    "you know",
    "i mean",
    "so",
    "right",
    "well",
    "kind of",
    "sort of",
    "just",
    "okay",
    "hmm",
    "yeah",
];

/// A single filler-word match inside an analyzed text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillerMatch {
    pub word: String,
    /// Byte offset of the match in the original text.
    pub position: usize,
    pub length: usize,
}

/// Result of analyzing one transcript text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FillerAnalysis {
    pub matches: Vec<FillerMatch>,
    /// Lowercased filler word -> number of times it occurred.
    pub occurrences: HashMap<String, usize>,
    pub count: usize,
    pub total_words: usize,
    /// Filler matches per hundred words, 0 for empty text.
    pub density: f64,
    /// Original text with every match wrapped in a highlight span.
    pub highlighted: String,
}

/// Detects configured filler words and phrases in transcript text.
///
/// Matching is case-insensitive and word-boundary-delimited; multi-word
/// fillers ("you know", "kind of") are treated as literal phrases.
#[derive(Debug, Clone)]
pub struct FillerWordAnalyzer {
    words: Vec<String>,
    pattern: Regex,
}

impl Default for FillerWordAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_FILLER_WORDS.iter().map(|w| w.to_string()).collect())
    }
}

impl FillerWordAnalyzer {
    pub fn new(words: Vec<String>) -> Self {
        let pattern = Self::build_pattern(&words);
        Self { words, pattern }
    }

    fn build_pattern(words: &[String]) -> Regex {
        // Escape configured words so characters like '.' or '?' stay literal.
        let escaped: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
        let source = format!(r"(?i)\b(?:{})\b", escaped.join("|"));
        Regex::new(&source).expect("filler word pattern is valid by construction")
    }

    /// The currently configured filler words, in match-priority order.
    pub fn word_list(&self) -> &[String] {
        &self.words
    }

    /// Adds custom filler words, deduplicating case-insensitively, and
    /// rebuilds the compiled pattern.
    pub fn add_custom_words<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut changed = false;
        for word in words {
            let lowered = word.as_ref().trim().to_lowercase();
            if lowered.is_empty() {
                continue;
            }
            if !self.words.iter().any(|w| w.eq_ignore_ascii_case(&lowered)) {
                self.words.push(lowered);
                changed = true;
            }
        }
        if changed {
            self.pattern = Self::build_pattern(&self.words);
        }
    }

    /// Analyzes a transcript text for filler words.
    pub fn analyze(&self, text: &str) -> FillerAnalysis {
        if text.is_empty() {
            return FillerAnalysis::default();
        }

        let matches: Vec<FillerMatch> = self
            .pattern
            .find_iter(text)
            .map(|m| FillerMatch {
                word: m.as_str().to_string(),
                position: m.start(),
                length: m.len(),
            })
            .collect();

        let total_words = count_words(text);
        let density = if total_words > 0 {
            matches.len() as f64 / total_words as f64 * 100.0
        } else {
            0.0
        };

        let mut occurrences: HashMap<String, usize> = HashMap::new();
        for m in &matches {
            *occurrences.entry(m.word.to_lowercase()).or_insert(0) += 1;
        }

        let highlighted = highlight_matches(text, &matches);
        let count = matches.len();

        FillerAnalysis {
            matches,
            occurrences,
            count,
            total_words,
            density,
            highlighted,
        }
    }
}

/// Counts whitespace-delimited non-empty tokens.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Wraps every match in a highlight span. Matches are replaced from the end
/// of the string backward so earlier replacements never shift the offsets of
/// not-yet-processed matches.
fn highlight_matches(text: &str, matches: &[FillerMatch]) -> String {
    if matches.is_empty() {
        return text.to_string();
    }

    let mut sorted: Vec<&FillerMatch> = matches.iter().collect();
    sorted.sort_by(|a, b| b.position.cmp(&a.position));

    let mut result = text.to_string();
    for m in sorted {
        let before = &result[..m.position];
        let after = &result[m.position + m.length..];
        result = format!(r#"{before}<span class="filler-word">{}</span>{after}"#, m.word);
    }
    result
}

/// Tone of a duration-based feedback message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackTone {
    Warning,
    Info,
    Success,
}

/// Feedback on answer length shown after a recording stops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationFeedback {
    pub message: &'static str,
    pub tone: FeedbackTone,
}

/// Maps a recording duration to an answer-length feedback message.
pub fn duration_feedback(duration_seconds: u64) -> DurationFeedback {
    let (message, tone) = if duration_seconds < 10 {
        (
            "Your answer was very brief. Consider providing more details in your responses.",
            FeedbackTone::Warning,
        )
    } else if duration_seconds < 20 {
        (
            "Your answer was concise. You might want to elaborate a bit more.",
            FeedbackTone::Info,
        )
    } else if duration_seconds < 45 {
        (
            "Good answer length! You've provided a reasonable amount of detail.",
            FeedbackTone::Success,
        )
    } else if duration_seconds < 90 {
        (
            "Detailed answer! Your thorough responses will make a good impression.",
            FeedbackTone::Success,
        )
    } else {
        (
            "Comprehensive answer! Be mindful that in some interviews, concise responses may be preferred.",
            FeedbackTone::Info,
        )
    };
    DurationFeedback { message, tone }
}
