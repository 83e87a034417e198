//! Merchant pattern normalization
//!
//! Reduces a raw bank description/merchant string to a canonical pattern used
//! as the join key for categorization learning and recurrence grouping. The
//! pattern must survive per-transaction noise (processor prefixes, trailing
//! location and reference tokens) while staying specific enough not to
//! collide unrelated merchants.

use std::collections::HashSet;

use regex::Regex;

use crate::error::Result;
use crate::rules::{NormalizerRules, US_STATES};

/// Merchant string normalizer
///
/// Construction compiles the trailing-token patterns once; `normalize` is
/// then a pure, deterministic function. Normalization is idempotent: the
/// stripping passes run to a fixed point, so feeding a pattern back in
/// returns it unchanged.
pub struct MerchantNormalizer {
    rules: NormalizerRules,
    states: HashSet<&'static str>,
    /// Trailing ZIP-shaped token: 5 digits, optional -NNNN
    zip_re: Regex,
    /// Trailing digit run long enough to be a transaction/reference ID
    reference_re: Regex,
}

impl MerchantNormalizer {
    pub fn new(rules: NormalizerRules) -> Result<Self> {
        let zip_re = Regex::new(r"(?:^|\s)\d{5}(?:-\d{4})?$")?;
        let reference_re = Regex::new(&format!(
            r"(?:^|[\s*#])\d{{{},}}$",
            rules.min_reference_digits
        ))?;
        Ok(Self {
            rules,
            states: US_STATES.iter().copied().collect(),
            zip_re,
            reference_re,
        })
    }

    /// Reduce a raw merchant/description string to its canonical pattern.
    ///
    /// If stripping would empty the string, the trimmed, uppercased raw input
    /// is returned instead, so non-empty input never yields an empty pattern.
    pub fn normalize(&self, raw: &str) -> String {
        let original = collapse_whitespace(&raw.trim().to_uppercase());
        let mut pattern = original.clone();

        loop {
            let before = pattern.clone();
            pattern = self.strip_processor_prefix(&pattern);
            pattern = self.strip_trailing_state(&pattern);
            pattern = strip_trailing_match(&pattern, &self.zip_re);
            pattern = strip_trailing_match(&pattern, &self.reference_re);
            pattern = collapse_whitespace(&pattern);
            if pattern == before || pattern.is_empty() {
                break;
            }
        }

        if pattern.is_empty() {
            original
        } else {
            pattern
        }
    }

    fn strip_processor_prefix(&self, value: &str) -> String {
        for prefix in &self.rules.processor_prefixes {
            if let Some(rest) = value.strip_prefix(prefix.as_str()) {
                return rest.trim_start().to_string();
            }
        }
        value.to_string()
    }

    fn strip_trailing_state(&self, value: &str) -> String {
        if let Some((rest, last)) = value.rsplit_once(char::is_whitespace) {
            if self.states.contains(last) {
                return rest.trim_end().to_string();
            }
        } else if self.states.contains(value) {
            return String::new();
        }
        value.to_string()
    }
}

/// Truncate at the start of an end-anchored match
fn strip_trailing_match(value: &str, re: &Regex) -> String {
    match re.find(value) {
        Some(m) => value[..m.start()].to_string(),
        None => value.to_string(),
    }
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
