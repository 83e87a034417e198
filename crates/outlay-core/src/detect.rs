//! Recurring payment detection
//!
//! Groups expense history by normalized merchant pattern and looks for
//! groups whose charge intervals land in a known cadence bucket (weekly,
//! monthly, quarterly, annual). Qualifying groups become recurrence records
//! with amount statistics, a subscription flag for stable-amount charges in
//! subscription-affine categories, and a drift warning when the latest
//! charge moved away from the group average.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::Result;
use crate::models::{Frequency, RecurrenceRecord, Transaction};
use crate::normalize::MerchantNormalizer;

/// One cadence bucket: a target interval and its tolerance window
#[derive(Debug, Clone, Copy)]
pub struct FrequencyBucket {
    pub frequency: Frequency,
    pub target_days: i64,
    pub tolerance_days: i64,
}

impl FrequencyBucket {
    fn contains(&self, gap_days: i64) -> bool {
        (gap_days - self.target_days).abs() <= self.tolerance_days
    }
}

/// Detection configuration
///
/// The thresholds are policy constants, not derived values; they live here so
/// callers can tune them without touching the algorithm.
#[derive(Debug, Clone)]
pub struct RecurrenceConfig {
    /// Minimum charges required before a merchant is considered (less is
    /// insufficient evidence of a pattern)
    pub min_occurrences: usize,
    /// Cadence buckets with non-overlapping tolerance windows
    pub buckets: Vec<FrequencyBucket>,
    /// Maximum amount spread relative to the average for the subscription flag
    pub subscription_variance_ratio: f64,
    /// Relative drift of the latest charge that triggers an amount warning
    pub change_alert_ratio: f64,
    /// Categories whose recurring charges count as subscriptions
    pub subscription_categories: Vec<String>,
}

impl Default for RecurrenceConfig {
    fn default() -> Self {
        Self {
            min_occurrences: 3,
            buckets: vec![
                FrequencyBucket {
                    frequency: Frequency::Weekly,
                    target_days: 7,
                    tolerance_days: 2,
                },
                FrequencyBucket {
                    frequency: Frequency::Monthly,
                    target_days: 30,
                    tolerance_days: 5,
                },
                FrequencyBucket {
                    frequency: Frequency::Quarterly,
                    target_days: 90,
                    tolerance_days: 5,
                },
                FrequencyBucket {
                    frequency: Frequency::Annual,
                    target_days: 365,
                    tolerance_days: 15,
                },
            ],
            subscription_variance_ratio: 0.10,
            change_alert_ratio: 0.20,
            subscription_categories: vec![
                "Subscriptions".to_string(),
                "Software/Tech".to_string(),
                "Entertainment".to_string(),
            ],
        }
    }
}

/// A recurring charge whose latest amount drifted from its average
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountChangeWarning {
    pub merchant_pattern: String,
    pub average_amount: f64,
    pub last_amount: f64,
    pub change_pct: f64,
}

/// Results of a detection run
#[derive(Debug, Clone, Default)]
pub struct DetectionOutcome {
    /// One record per qualifying merchant pattern
    pub records: Vec<RecurrenceRecord>,
    /// Distinct merchant groups considered
    pub groups_analyzed: usize,
    /// Groups dropped for having fewer than the minimum occurrences
    pub skipped_sparse: usize,
    /// Records dropped for malformed fields (non-finite amount, no usable
    /// merchant string)
    pub skipped_malformed: usize,
    /// Recurring charges whose latest amount drifted past the alert ratio
    pub change_warnings: Vec<AmountChangeWarning>,
}

/// Recurrence detector
///
/// `detect_history` is a pure function of the supplied history; `detect_all`
/// wraps it with a snapshot read and persists the result as the new
/// materialized recurrence set.
pub struct RecurrenceDetector<'a> {
    db: &'a Database,
    normalizer: &'a MerchantNormalizer,
    config: RecurrenceConfig,
}

impl<'a> RecurrenceDetector<'a> {
    pub fn new(db: &'a Database, normalizer: &'a MerchantNormalizer) -> Self {
        Self::with_config(db, normalizer, RecurrenceConfig::default())
    }

    pub fn with_config(
        db: &'a Database,
        normalizer: &'a MerchantNormalizer,
        config: RecurrenceConfig,
    ) -> Self {
        Self {
            db,
            normalizer,
            config,
        }
    }

    /// Run detection over the stored history and persist the result.
    ///
    /// Safe to re-run at any time: the stored table is fully recomputed, and
    /// patterns that stopped qualifying are deactivated rather than left
    /// stale.
    pub fn detect_all(&self) -> Result<DetectionOutcome> {
        let transactions = self.db.list_transactions(None)?;
        let outcome = self.detect_history(&transactions);
        self.db.replace_recurrence_records(&outcome.records)?;

        info!(
            "Recurrence detection complete: {} recurring merchants from {} groups ({} sparse, {} malformed, {} amount warnings)",
            outcome.records.len(),
            outcome.groups_analyzed,
            outcome.skipped_sparse,
            outcome.skipped_malformed,
            outcome.change_warnings.len()
        );
        Ok(outcome)
    }

    /// Detect recurring patterns in the supplied history.
    ///
    /// Produces one record per distinct merchant pattern; idempotent given
    /// unchanged history. Malformed records are skipped and counted, never a
    /// fatal abort.
    pub fn detect_history(&self, transactions: &[Transaction]) -> DetectionOutcome {
        let mut outcome = DetectionOutcome::default();

        // Single hashed pass over the history; per-group interval analysis
        // afterwards keeps the whole run out of quadratic territory.
        let mut groups: HashMap<String, Vec<(NaiveDate, f64, Option<String>)>> = HashMap::new();
        for tx in transactions {
            if !tx.amount.is_finite() {
                warn!("Skipping transaction {} with non-finite amount", tx.id);
                outcome.skipped_malformed += 1;
                continue;
            }
            if tx.amount <= 0.0 {
                continue; // credits/income cannot be recurring expenses
            }
            let Some(pattern) = self.pattern_for(tx) else {
                warn!("Skipping transaction {} with no usable merchant string", tx.id);
                outcome.skipped_malformed += 1;
                continue;
            };
            groups
                .entry(pattern)
                .or_default()
                .push((tx.date, tx.amount, tx.category.clone()));
        }

        outcome.groups_analyzed = groups.len();

        for (pattern, mut charges) in groups {
            if charges.len() < self.config.min_occurrences {
                outcome.skipped_sparse += 1;
                continue;
            }
            charges.sort_by_key(|(date, _, _)| *date);

            let Some(frequency) = self.classify_frequency(&charges) else {
                continue; // intervals too irregular for any bucket
            };

            let amounts: Vec<f64> = charges.iter().map(|(_, amount, _)| *amount).collect();
            let average_amount = amounts.iter().sum::<f64>() / amounts.len() as f64;
            let min_amount = amounts.iter().cloned().fold(f64::INFINITY, f64::min);
            let max_amount = amounts.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let amount_variance = max_amount - min_amount;

            let (last_date, last_amount, _) = charges[charges.len() - 1].clone();
            let category = charges[0].2.clone();

            let stable_amount = average_amount > 0.0
                && amount_variance / average_amount < self.config.subscription_variance_ratio;
            let affine_category = category
                .as_deref()
                .map(|c| self.config.subscription_categories.iter().any(|s| s == c))
                .unwrap_or(false);
            let is_subscription = matches!(frequency, Frequency::Monthly | Frequency::Annual)
                && stable_amount
                && affine_category;

            let record = RecurrenceRecord {
                merchant_pattern: pattern,
                category,
                frequency,
                average_amount,
                last_amount,
                last_date,
                occurrence_count: charges.len() as i64,
                amount_variance,
                is_active: true,
                is_subscription,
            };

            let change_pct = record.change_pct();
            if change_pct.abs() > self.config.change_alert_ratio {
                debug!(
                    "Amount drift for {}: {:.2} -> {:.2} ({:+.1}%)",
                    record.merchant_pattern,
                    record.average_amount,
                    record.last_amount,
                    change_pct * 100.0
                );
                outcome.change_warnings.push(AmountChangeWarning {
                    merchant_pattern: record.merchant_pattern.clone(),
                    average_amount: record.average_amount,
                    last_amount: record.last_amount,
                    change_pct,
                });
            }

            debug!(
                "Found recurring merchant: {} ({}, {} charges @ ~{:.2})",
                record.merchant_pattern, record.frequency, record.occurrence_count, record.average_amount
            );
            outcome.records.push(record);
        }

        outcome
    }

    /// Grouping key for a transaction, preferring the stored pattern
    fn pattern_for(&self, tx: &Transaction) -> Option<String> {
        if let Some(pattern) = &tx.merchant_normalized {
            if !pattern.is_empty() {
                return Some(pattern.clone());
            }
        }
        let source = if tx.merchant.trim().is_empty() {
            &tx.description
        } else {
            &tx.merchant
        };
        let pattern = self.normalizer.normalize(source);
        (!pattern.is_empty()).then_some(pattern)
    }

    /// Classify the cadence of a date-sorted charge group.
    ///
    /// The median gap picks the candidate bucket (the windows do not
    /// overlap, so at most one fits); the group qualifies only when every
    /// successive gap lies inside that bucket's window. One outlier gap
    /// therefore disqualifies the group entirely.
    fn classify_frequency(&self, charges: &[(NaiveDate, f64, Option<String>)]) -> Option<Frequency> {
        let gaps: Vec<i64> = charges
            .windows(2)
            .map(|w| (w[1].0 - w[0].0).num_days())
            .collect();
        if gaps.is_empty() {
            return None;
        }

        let gap_values: Vec<f64> = gaps.iter().map(|&g| g as f64).collect();
        let median_gap = median(&gap_values);

        let bucket = self
            .config
            .buckets
            .iter()
            .find(|b| (median_gap - b.target_days as f64).abs() <= b.tolerance_days as f64)?;

        gaps.iter()
            .all(|&gap| bucket.contains(gap))
            .then_some(bucket.frequency)
    }
}

/// Calculate median of a slice
fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
