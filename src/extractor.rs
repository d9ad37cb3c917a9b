//! Confidence-scored verification-code extraction.
//!
//! The extractor applies the static pattern tiers to a message body
//! (raw and HTML-normalized), filters candidates through a validity check,
//! deduplicates them by code value, and adjusts each survivor's confidence from
//! the keywords found in its surrounding text. The result is a ranked candidate
//! list; [`CodeExtractor::best_code`] applies the single quality gate separating
//! "good enough to auto-fill" from "needs human review".
//!
//! # Example
//!
//! ```
//! use temp_inbox::CodeExtractor;
//!
//! let extractor = CodeExtractor::new();
//! let body = "Welcome! Your verification code is: 403912. It expires in 10 minutes.";
//! assert_eq!(extractor.best_code(body, "noreply@example.com").as_deref(), Some("403912"));
//!
//! // Unrelated numeric content produces no candidates at all
//! assert!(extractor.analyze("Your order #482913 has shipped.", "").is_empty());
//! ```

use crate::html::to_plain_text;
use crate::patterns::{
    PatternSpec, CONFIDENCE_THRESHOLD, CONTEXT_WINDOW, EXPLICIT_PATTERNS, FALLBACK_PATTERNS,
    MARKUP_PATTERNS, NEGATIVE_KEYWORDS, POSITIVE_KEYWORDS, SENDER_PATTERNS, STRUCTURAL_PATTERNS,
};
use std::collections::HashMap;
use tracing::debug;

/// A candidate verification code with scoring metadata.
///
/// Transient: produced by [`CodeExtractor::analyze`] and not persisted beyond
/// the call (the winning code string is cached on the message instead).
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationMatch {
    /// The candidate code, uppercased.
    pub code: String,
    /// Adjusted confidence in `[0,1]`.
    pub confidence: f64,
    /// Category tag of the pattern that produced the strongest match.
    pub category: &'static str,
    /// Surrounding text window the confidence adjustment was computed from.
    pub context: String,
    /// Byte offset of the match within the text it was found in.
    pub offset: usize,
}

/// Stateless verification-code extractor over the static pattern library.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeExtractor;

impl CodeExtractor {
    /// Creates an extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Extracts all candidate verification codes, ranked by adjusted confidence.
    ///
    /// `sender` selects any sender-specific pattern overrides; pass an empty
    /// string when unknown. Returns an empty list when no tier produced a valid
    /// candidate — including when the fallback tier was skipped because the text
    /// never mentions verification.
    #[must_use]
    pub fn analyze(&self, body: &str, sender: &str) -> Vec<VerificationMatch> {
        let normalized = to_plain_text(body);
        // Only run a second pass when normalization actually changed the text
        let normalized_pass: Option<&str> = match &normalized {
            std::borrow::Cow::Owned(text) => Some(text.as_str()),
            std::borrow::Cow::Borrowed(_) => None,
        };

        let mut candidates = Vec::new();
        let sender_lower = sender.to_lowercase();

        for sender_set in SENDER_PATTERNS.iter() {
            if sender_lower.contains(sender_set.sender_hint) {
                collect_matches(body, &sender_set.patterns, &mut candidates);
                if let Some(text) = normalized_pass {
                    collect_matches(text, &sender_set.patterns, &mut candidates);
                }
            }
        }

        for table in [&MARKUP_PATTERNS, &EXPLICIT_PATTERNS, &STRUCTURAL_PATTERNS] {
            collect_matches(body, table, &mut candidates);
            if let Some(text) = normalized_pass {
                collect_matches(text, table, &mut candidates);
            }
        }

        // Fallback tier: broad tokens, consulted only when nothing survived above
        // and the text talks about verification at all.
        if candidates.is_empty() && mentions_verification(body, normalized_pass) {
            if let Some(text) = normalized_pass {
                collect_matches(text, &FALLBACK_PATTERNS, &mut candidates);
            }
            collect_matches(body, &FALLBACK_PATTERNS, &mut candidates);
        }

        let mut unique = dedup_by_code(candidates);
        for candidate in &mut unique {
            candidate.confidence = adjust_confidence(candidate.confidence, &candidate.context);
        }

        unique.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        debug!(
            candidates = unique.len(),
            best = unique.first().map(|m| m.code.as_str()).unwrap_or(""),
            "Analyzed message body for verification codes"
        );

        unique
    }

    /// Returns the most likely verification code, or `None` when the best
    /// candidate's adjusted confidence falls below the quality threshold (0.6).
    #[must_use]
    pub fn best_code(&self, body: &str, sender: &str) -> Option<String> {
        let matches = self.analyze(body, sender);
        matches
            .into_iter()
            .next()
            .filter(|best| best.confidence >= CONFIDENCE_THRESHOLD)
            .map(|best| best.code)
    }
}

/// Validity filter applied to every candidate before scoring.
///
/// Length counts alphanumeric characters only (hyphenated codes like `ABCD-1234`
/// pass). Rejects single-repeated-character codes, calendar years, placeholder
/// numerics, and 10-digit phone-shaped strings.
#[must_use]
pub fn is_valid_code(code: &str) -> bool {
    const PLACEHOLDER_CODES: &[u64] = &[0, 1234, 9999];

    let significant = code.chars().filter(char::is_ascii_alphanumeric).count();
    if !(4..=8).contains(&significant) {
        return false;
    }

    let mut alnum = code.chars().filter(char::is_ascii_alphanumeric);
    if let Some(first) = alnum.next() {
        if alnum.all(|c| c == first) {
            return false;
        }
    }

    if code.chars().all(|c| c.is_ascii_digit()) {
        if code.len() == 10 {
            return false;
        }
        if let Ok(number) = code.parse::<u64>() {
            if (1900..=2100).contains(&number) || PLACEHOLDER_CODES.contains(&number) {
                return false;
            }
        }
    }

    true
}

/// Runs every pattern in `specs` over `text`, appending surviving candidates.
fn collect_matches(text: &str, specs: &[PatternSpec], out: &mut Vec<VerificationMatch>) {
    for spec in specs {
        for caps in spec.regex.captures_iter(text) {
            let Some(group) = caps.get(1).or_else(|| caps.get(0)) else {
                continue;
            };

            let code = group.as_str().to_uppercase();
            if !is_valid_code(&code) {
                continue;
            }

            out.push(VerificationMatch {
                code,
                confidence: spec.confidence,
                category: spec.category,
                context: context_window(text, group.start(), group.end()),
                offset: group.start(),
            });
        }
    }
}

/// Keyword gate for the fallback tier.
fn mentions_verification(body: &str, normalized: Option<&str>) -> bool {
    let body_lower = body.to_lowercase();
    let normalized_lower = normalized.map(str::to_lowercase);
    POSITIVE_KEYWORDS.iter().any(|keyword| {
        body_lower.contains(keyword)
            || normalized_lower
                .as_deref()
                .is_some_and(|text| text.contains(keyword))
    })
}

/// Keeps one match per unique code value: the highest base confidence wins,
/// earlier (higher-priority) tiers win ties.
fn dedup_by_code(candidates: Vec<VerificationMatch>) -> Vec<VerificationMatch> {
    let mut kept: Vec<VerificationMatch> = Vec::new();
    let mut index_by_code: HashMap<String, usize> = HashMap::new();

    for candidate in candidates {
        match index_by_code.get(&candidate.code) {
            Some(&slot) => {
                if candidate.confidence > kept[slot].confidence {
                    kept[slot] = candidate;
                }
            }
            None => {
                index_by_code.insert(candidate.code.clone(), kept.len());
                kept.push(candidate);
            }
        }
    }

    kept
}

/// Adjusts a base confidence from the keywords present in the context window:
/// +0.05 per distinct positive keyword, -0.10 per distinct negative keyword,
/// clamped to `[0,1]`.
fn adjust_confidence(base: f64, context: &str) -> f64 {
    let context_lower = context.to_lowercase();

    let boost = POSITIVE_KEYWORDS
        .iter()
        .filter(|keyword| context_lower.contains(**keyword))
        .count() as f64
        * 0.05;

    let penalty = NEGATIVE_KEYWORDS
        .iter()
        .filter(|keyword| context_lower.contains(**keyword))
        .count() as f64
        * 0.10;

    (base + boost - penalty).clamp(0.0, 1.0)
}

/// Extracts the text surrounding a match, clamped to char boundaries.
fn context_window(text: &str, start: usize, end: usize) -> String {
    let mut lo = start.saturating_sub(CONTEXT_WINDOW);
    while lo > 0 && !text.is_char_boundary(lo) {
        lo -= 1;
    }
    let mut hi = (end + CONTEXT_WINDOW).min(text.len());
    while hi < text.len() && !text.is_char_boundary(hi) {
        hi += 1;
    }
    text[lo..hi].to_string()
}
