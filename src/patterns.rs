//! Static pattern library for verification-code extraction.
//!
//! Patterns are immutable configuration data compiled once at first use and never
//! mutated at runtime. They are organized into tiers evaluated in priority order
//! by the extractor:
//!
//! 1. Sender-specific patterns — a known verification-email sender implies a
//!    narrower, higher-confidence set.
//! 2. Markup-aware patterns — phrase followed by a markup-wrapped token.
//! 3. Explicit phrase patterns — "verification code:", "your code:", etc.
//! 4. Structural patterns — hyphenated or letter/digit-shaped tokens that carry
//!    meaning without any phrasing.
//! 5. Fallback patterns — broad numeric/alphanumeric tokens, consulted only when
//!    nothing above matched *and* the text mentions verification at all.
//!
//! Plain digit runs live exclusively in the keyword-gated fallback tier so that
//! unrelated numeric content (order numbers, tracking ids) never produces a
//! candidate on its own.

use regex::Regex;
use std::sync::LazyLock;

/// One extraction rule: a compiled regex, its base confidence, and a category tag.
#[derive(Debug)]
pub struct PatternSpec {
    /// Compiled pattern; capture group 1 is the candidate code.
    pub regex: Regex,
    /// Base confidence in `[0,1]` before context adjustment.
    pub confidence: f64,
    /// Category tag carried through to [`VerificationMatch`](crate::VerificationMatch).
    pub category: &'static str,
}

impl PatternSpec {
    fn new(pattern: &str, confidence: f64, category: &'static str) -> Self {
        Self {
            regex: Regex::new(pattern).expect("valid pattern"),
            confidence,
            category,
        }
    }
}

/// Sender-keyed override: applies when the sender address contains the hint.
#[derive(Debug)]
pub struct SenderPatterns {
    /// Case-insensitive substring matched against the sender address.
    pub sender_hint: &'static str,
    /// Patterns tried for that sender, all at sender-specific confidence.
    pub patterns: Vec<PatternSpec>,
}

/// Keywords whose presence near a candidate raises its confidence (+0.05 each).
pub const POSITIVE_KEYWORDS: &[&str] = &["verification", "verify", "code", "confirm", "authenticate"];

/// Keywords whose presence near a candidate lowers its confidence (-0.10 each).
pub const NEGATIVE_KEYWORDS: &[&str] = &[
    "invoice",
    "receipt",
    "order",
    "tracking",
    "phone",
    "address",
    "zip",
    "postal",
    "reference",
    "transaction",
];

/// Minimum adjusted confidence for a match to be auto-filled by `best_code`.
pub const CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Half-width of the context window captured around each match, in characters.
pub const CONTEXT_WINDOW: usize = 50;

/// Sender-specific pattern sets, highest priority.
pub static SENDER_PATTERNS: LazyLock<Vec<SenderPatterns>> = LazyLock::new(|| {
    vec![
        SenderPatterns {
            sender_hint: "augment",
            patterns: vec![
                PatternSpec::new(
                    r"(?i)augment.*?verification.*?\b([0-9]{6})\b",
                    0.95,
                    "sender_specific",
                ),
                PatternSpec::new(
                    r"(?i)augment.*?code[:\s]+([A-Z0-9]{4,8})\b",
                    0.95,
                    "sender_specific",
                ),
                PatternSpec::new(
                    r"(?i)welcome.*?augment.*?\b([0-9]{6})\b",
                    0.95,
                    "sender_specific",
                ),
            ],
        },
        SenderPatterns {
            sender_hint: "github",
            patterns: vec![
                PatternSpec::new(
                    r"(?i)github.*?verification.*?\b([0-9]{6})\b",
                    0.95,
                    "sender_specific",
                ),
                PatternSpec::new(
                    r"(?i)github.*?code[:\s]+([0-9]{6})\b",
                    0.95,
                    "sender_specific",
                ),
            ],
        },
        SenderPatterns {
            sender_hint: "google",
            patterns: vec![
                PatternSpec::new(
                    r"(?i)google.*?verification.*?\b([0-9]{6})\b",
                    0.95,
                    "sender_specific",
                ),
                PatternSpec::new(r"(?i)\bg-([0-9]{6})\b", 0.95, "sender_specific"),
            ],
        },
    ]
});

/// Markup-aware patterns: a code phrase followed immediately by a tag-wrapped token.
///
/// Tried against both the raw body and its normalized form.
pub static MARKUP_PATTERNS: LazyLock<Vec<PatternSpec>> = LazyLock::new(|| {
    vec![
        PatternSpec::new(
            r"(?i)verification code is[:\s]*<[^>]*>([A-Z0-9]{4,8})<",
            0.95,
            "markup_wrapped",
        ),
        PatternSpec::new(
            r"(?i)your code is[:\s]*<[^>]*>([A-Z0-9]{4,8})<",
            0.95,
            "markup_wrapped",
        ),
        // Nested wrapping, e.g. "Code: <span><b>XY123Z</b></span>"
        PatternSpec::new(
            r"(?i)code[:\s]*<[^>]*>(?:<[^>]*>)?([A-Z0-9]{4,8})<",
            0.95,
            "markup_wrapped",
        ),
    ]
});

/// Explicit phrase patterns, most to least specific.
pub static EXPLICIT_PATTERNS: LazyLock<Vec<PatternSpec>> = LazyLock::new(|| {
    vec![
        PatternSpec::new(
            r"(?i)your verification code is[:\s]+([A-Z0-9]{4,8})\b",
            0.95,
            "explicit_phrase",
        ),
        PatternSpec::new(
            r"(?i)verification code is[:\s]+([A-Z0-9]{4,8})\b",
            0.95,
            "explicit_phrase",
        ),
        PatternSpec::new(
            r"(?i)your code is[:\s]+([A-Z0-9]{4,8})\b",
            0.95,
            "explicit_phrase",
        ),
        PatternSpec::new(
            r"(?i)verification code[:\s]+([A-Z0-9]{4,8})\b",
            0.95,
            "explicit_phrase",
        ),
        PatternSpec::new(
            r"(?i)your code[:\s]+([A-Z0-9]{4,8})\b",
            0.95,
            "explicit_phrase",
        ),
        PatternSpec::new(
            r"(?i)enter code[:\s]+([A-Z0-9]{4,8})\b",
            0.90,
            "explicit_phrase",
        ),
        PatternSpec::new(
            r"(?i)use code[:\s]+([A-Z0-9]{4,8})\b",
            0.90,
            "explicit_phrase",
        ),
        PatternSpec::new(
            r"(?i)confirm.*?code[:\s]+([A-Z0-9]{4,8})\b",
            0.90,
            "explicit_phrase",
        ),
        PatternSpec::new(
            r"(?i)\bcode[:\s]+([A-Z0-9]{4,8})\b",
            0.80,
            "explicit_phrase",
        ),
    ]
});

/// Structural patterns: token shapes meaningful without any surrounding phrase.
pub static STRUCTURAL_PATTERNS: LazyLock<Vec<PatternSpec>> = LazyLock::new(|| {
    vec![
        // ABCD-1234
        PatternSpec::new(r"\b([A-Z0-9]{4}-[A-Z0-9]{4})\b", 0.85, "structural"),
        // AB1234
        PatternSpec::new(r"\b([A-Z]{2}[0-9]{4})\b", 0.70, "structural"),
    ]
});

/// Fallback patterns, keyword-gated, most to least specific.
pub static FALLBACK_PATTERNS: LazyLock<Vec<PatternSpec>> = LazyLock::new(|| {
    vec![
        PatternSpec::new(r"\b([0-9]{6})\b", 0.75, "fallback"),
        PatternSpec::new(r"\b([0-9]{4,8})\b", 0.60, "fallback"),
        PatternSpec::new(r"(?i)\b([A-Z0-9]{4,8})\b", 0.50, "fallback"),
    ]
});
