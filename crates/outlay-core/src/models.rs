//! Domain models for Outlay

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A bank transaction in normalized form
///
/// Records arrive already normalized by the surrounding importer: dates are
/// calendar dates, and amounts are signed so that positive = expense and
/// negative = credit/income.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    pub description: String,
    /// Raw merchant string as supplied by the bank
    pub merchant: String,
    /// Canonical merchant pattern used as the grouping/join key
    pub merchant_normalized: Option<String>,
    /// Resolved spending category
    pub category: Option<String>,
    /// Issuer-supplied category (e.g. a card network's "Restaurants"),
    /// preserved so reprocessing can re-resolve from scratch
    pub bank_category: Option<String>,
    /// Positive = expense, negative = credit/income
    pub amount: f64,
    pub account_type: String,
    /// Original import record as JSON (for reprocessing)
    pub original_data: Option<String>,
    /// Hash for deduplication
    pub import_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Parse the original import record carried on this transaction
    pub fn original_record(&self) -> Option<serde_json::Value> {
        self.original_data
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}

/// A new transaction to be stored (before DB insertion)
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub merchant: String,
    pub merchant_normalized: Option<String>,
    pub category: Option<String>,
    pub bank_category: Option<String>,
    pub amount: f64,
    pub account_type: String,
    /// Original import record as JSON (for reprocessing)
    pub original_data: Option<String>,
    pub import_hash: String,
}

impl NewTransaction {
    /// Create a record with the deduplication hash filled in.
    ///
    /// Merchant pattern, categories and original data start unset; the
    /// importer assigns them before insertion.
    pub fn new(
        date: NaiveDate,
        description: impl Into<String>,
        merchant: impl Into<String>,
        amount: f64,
        account_type: impl Into<String>,
    ) -> Self {
        let description = description.into();
        let import_hash = dedup_hash(&date, &description, amount);
        Self {
            date,
            description,
            merchant: merchant.into(),
            merchant_normalized: None,
            category: None,
            bank_category: None,
            amount,
            account_type: account_type.into(),
            original_data: None,
            import_hash,
        }
    }
}

/// Generate a unique hash for transaction deduplication
pub fn dedup_hash(date: &NaiveDate, description: &str, amount: f64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.to_string().as_bytes());
    hasher.update(description.as_bytes());
    hasher.update(amount.to_be_bytes());
    hex::encode(hasher.finalize())
}

/// A user-taught association from merchant pattern to category
///
/// Created the first time a user manually categorizes a merchant; re-teaching
/// the same pattern overwrites the category (last write wins). Never
/// auto-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedMapping {
    pub merchant_pattern: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// Recurrence cadence of a detected payment pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
    Quarterly,
    Annual,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annual => "annual",
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "annual" => Ok(Self::Annual),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A detected recurring payment pattern
///
/// Derived wholesale from transaction history on each detection run; the
/// stored table is a materialized view, never independently authored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceRecord {
    pub merchant_pattern: String,
    pub category: Option<String>,
    pub frequency: Frequency,
    pub average_amount: f64,
    pub last_amount: f64,
    pub last_date: NaiveDate,
    pub occurrence_count: i64,
    /// Spread of the group's amounts (max - min)
    pub amount_variance: f64,
    pub is_active: bool,
    pub is_subscription: bool,
}

impl RecurrenceRecord {
    /// Relative drift of the latest charge against the group average
    pub fn change_pct(&self) -> f64 {
        if self.average_amount == 0.0 {
            return 0.0;
        }
        (self.last_amount - self.average_amount) / self.average_amount
    }
}

/// Which layer of the categorization engine resolved a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategorySource {
    /// User-taught merchant mapping (highest priority)
    Learned,
    /// Ordered keyword rule set
    Keyword,
    /// Issuer-supplied category mapped to a canonical one
    BankCategory,
    /// No rule matched; resolved to "Other"
    Fallback,
}

impl CategorySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Learned => "learned",
            Self::Keyword => "keyword",
            Self::BankCategory => "bank_category",
            Self::Fallback => "fallback",
        }
    }
}
