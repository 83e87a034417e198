//! Outlay Core Library
//!
//! Shared functionality for the Outlay spending-insight tool:
//! - Database access and migrations
//! - Merchant pattern normalization
//! - Layered transaction categorization with user-taught corrections
//! - Recurring payment detection (subscriptions and bills)
//!
//! The surrounding application (importers, HTTP API, UI) supplies normalized
//! transaction records and renders results; everything here is synchronous
//! library code.

pub mod categorize;
pub mod db;
pub mod detect;
pub mod error;
pub mod models;
pub mod normalize;
pub mod rules;

pub use categorize::{Categorizer, ReprocessResult, Resolution, FALLBACK_CATEGORY};
pub use db::Database;
pub use detect::{
    AmountChangeWarning, DetectionOutcome, FrequencyBucket, RecurrenceConfig, RecurrenceDetector,
};
pub use error::{Error, Result};
pub use models::{
    CategorySource, Frequency, LearnedMapping, NewTransaction, RecurrenceRecord, Transaction,
};
pub use normalize::MerchantNormalizer;
pub use rules::{CategoryRules, KeywordRule, NormalizerRules};
