//! Text normalization ahead of synthesis
//!
//! Synthesis engines get plain speakable words: digits are expanded to
//! cardinals and engine-specific transforms (e.g. grapheme-to-phoneme
//! mappings) are supplied by the caller as additional [`TextTransform`]s.

use std::sync::LazyLock;

use regex::Regex;

/// Sentence-ending punctuation used when splitting an utterance
static SPLITTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[.!?;:\n]").unwrap_or_else(|e| unreachable!("invalid splitter regex: {e}"))
});

/// Runs of digits eligible for number expansion
static DIGITS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+").unwrap_or_else(|e| unreachable!("invalid digits regex: {e}"))
});

/// One normalization pass over utterance text
pub trait TextTransform: Send + Sync {
    /// Apply the transform
    fn apply(&self, text: &str) -> String;

    /// Transform name for logging
    fn name(&self) -> &'static str;
}

/// Expands runs of digits into English cardinal words
pub struct NumberExpansion;

impl TextTransform for NumberExpansion {
    fn apply(&self, text: &str) -> String {
        DIGITS
            .replace_all(text, |caps: &regex::Captures<'_>| expand_digits(&caps[0]))
            .into_owned()
    }

    fn name(&self) -> &'static str {
        "number-expansion"
    }
}

/// Split on sentence-ending punctuation, dropping empty fragments
#[must_use]
pub fn split_sentences(text: &str) -> Vec<String> {
    SPLITTER
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Run a transform chain over utterance text
#[must_use]
pub fn normalize(text: &str, transforms: &[Box<dyn TextTransform>]) -> String {
    let mut out = text.to_string();
    for transform in transforms {
        out = transform.apply(&out);
        tracing::trace!(transform = transform.name(), "applied text transform");
    }
    out
}

/// Expand one run of digits; very long runs are read digit by digit
fn expand_digits(digits: &str) -> String {
    digits.parse::<u64>().map_or_else(
        |_| {
            digits
                .chars()
                .filter_map(|c| c.to_digit(10))
                .map(|d| ONES[d as usize])
                .collect::<Vec<_>>()
                .join(" ")
        },
        number_to_words,
    )
}

const ONES: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const SCALES: [(u64, &str); 4] = [
    (1_000_000_000_000, "trillion"),
    (1_000_000_000, "billion"),
    (1_000_000, "million"),
    (1_000, "thousand"),
];

/// Render a number as English cardinal words
#[must_use]
pub fn number_to_words(n: u64) -> String {
    if n < 20 {
        return ONES[n as usize].to_string();
    }

    let mut parts: Vec<String> = Vec::new();
    let mut rest = n;

    for (scale, word) in SCALES {
        if rest >= scale {
            parts.push(number_to_words(rest / scale));
            parts.push(word.to_string());
            rest %= scale;
        }
    }

    if rest >= 100 {
        parts.push(ONES[(rest / 100) as usize].to_string());
        parts.push("hundred".to_string());
        rest %= 100;
    }

    if rest >= 20 {
        let tail = rest % 10;
        if tail == 0 {
            parts.push(TENS[(rest / 10) as usize].to_string());
        } else {
            parts.push(format!("{}-{}", TENS[(rest / 10) as usize], ONES[tail as usize]));
        }
    } else if rest > 0 || parts.is_empty() {
        parts.push(ONES[rest as usize].to_string());
    }

    parts.join(" ")
}
