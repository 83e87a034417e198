//! Layered transaction categorization
//!
//! Categories resolve through a three-tier priority with a fixed fallback:
//! learned merchant mapping → ordered keyword rules → bank-supplied category
//! → "Other". Learned mappings come from explicit user corrections (`teach`)
//! and always win, so a correction sticks for every future transaction of
//! that merchant. Plain resolution has no side effects; only `teach` and an
//! explicit `reprocess_all` pass rewrite stored categories.

use tracing::{debug, info};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::CategorySource;
use crate::normalize::MerchantNormalizer;
use crate::rules::CategoryRules;

/// Category assigned when no layer matches
pub const FALLBACK_CATEGORY: &str = "Other";

/// A resolved category together with the layer that produced it
#[derive(Debug, Clone)]
pub struct Resolution {
    pub category: String,
    pub source: CategorySource,
}

/// Result of re-resolving the full stored history
#[derive(Debug, Clone, Default)]
pub struct ReprocessResult {
    pub transactions_processed: i64,
    pub transactions_updated: i64,
    pub by_learned: i64,
    pub by_keyword: i64,
    pub by_bank_category: i64,
    pub fallback_to_other: i64,
}

/// Categorization engine
pub struct Categorizer<'a> {
    db: &'a Database,
    normalizer: &'a MerchantNormalizer,
    rules: CategoryRules,
}

impl<'a> Categorizer<'a> {
    pub fn new(db: &'a Database, normalizer: &'a MerchantNormalizer) -> Self {
        Self::with_rules(db, normalizer, CategoryRules::default())
    }

    pub fn with_rules(
        db: &'a Database,
        normalizer: &'a MerchantNormalizer,
        rules: CategoryRules,
    ) -> Self {
        Self {
            db,
            normalizer,
            rules,
        }
    }

    /// Resolve a category for a merchant pattern and description.
    ///
    /// First hit wins; no fallthrough once a layer matches.
    pub fn categorize(
        &self,
        pattern: &str,
        description: &str,
        bank_category: Option<&str>,
    ) -> Result<String> {
        self.resolve(pattern, description, bank_category)
            .map(|r| r.category)
    }

    /// Resolve a category, reporting which layer matched
    pub fn resolve(
        &self,
        pattern: &str,
        description: &str,
        bank_category: Option<&str>,
    ) -> Result<Resolution> {
        // 1. Learned merchant mapping - user corrections always win
        if let Some(category) = self.db.get_learned_mapping(pattern)? {
            debug!("Learned mapping matched for '{}': {}", pattern, category);
            return Ok(Resolution {
                category,
                source: CategorySource::Learned,
            });
        }

        // 2. Ordered keyword rules, first matching category wins
        if let Some(category) = self.rules.match_keywords(description) {
            debug!("Keyword rule matched for '{}': {}", description, category);
            return Ok(Resolution {
                category: category.to_string(),
                source: CategorySource::Keyword,
            });
        }

        // 3. Bank-supplied category, if the normalization table knows it
        if let Some(issuer) = bank_category.map(str::trim).filter(|c| !c.is_empty()) {
            if let Some(canonical) = self.rules.map_bank_category(issuer) {
                debug!(
                    "Bank category '{}' mapped for '{}': {}",
                    issuer, description, canonical
                );
                return Ok(Resolution {
                    category: canonical.to_string(),
                    source: CategorySource::BankCategory,
                });
            }
        }

        // 4. Fall back to "Other" - still eligible for future learning
        debug!("Falling back to '{}' for '{}'", FALLBACK_CATEGORY, description);
        Ok(Resolution {
            category: FALLBACK_CATEGORY.to_string(),
            source: CategorySource::Fallback,
        })
    }

    /// Teach the engine a merchant → category mapping.
    ///
    /// Upserts the learned mapping (last write wins) and retroactively
    /// relabels every stored transaction whose normalized merchant pattern
    /// matches, in one database transaction. Returns the number of rows whose
    /// category actually changed, so a repeated teach reports 0 and the whole
    /// operation can be re-run safely after a partial failure.
    pub fn teach(&self, merchant: &str, category: &str) -> Result<usize> {
        let pattern = self.normalizer.normalize(merchant);
        if pattern.is_empty() {
            return Err(Error::InvalidData(
                "cannot teach an empty merchant pattern".to_string(),
            ));
        }
        let category = category.trim();
        if category.is_empty() {
            return Err(Error::InvalidData(
                "cannot teach an empty category".to_string(),
            ));
        }

        let updated = self.db.teach_mapping(&pattern, category)?;
        info!(
            "Taught '{}' -> {} ({} transactions relabeled)",
            pattern, category, updated
        );
        Ok(updated)
    }

    /// Re-resolve every stored transaction and rewrite changed categories.
    ///
    /// This is the explicit reprocessing pass: rule-table edits never touch
    /// stored categories until the caller runs it.
    pub fn reprocess_all(&self) -> Result<ReprocessResult> {
        let transactions = self.db.list_transactions(None)?;
        let mut result = ReprocessResult::default();

        for tx in &transactions {
            let pattern = match &tx.merchant_normalized {
                Some(p) if !p.is_empty() => p.clone(),
                _ => {
                    let source = if tx.merchant.trim().is_empty() {
                        &tx.description
                    } else {
                        &tx.merchant
                    };
                    self.normalizer.normalize(source)
                }
            };

            let resolution = self.resolve(&pattern, &tx.description, tx.bank_category.as_deref())?;
            result.transactions_processed += 1;
            match resolution.source {
                CategorySource::Learned => result.by_learned += 1,
                CategorySource::Keyword => result.by_keyword += 1,
                CategorySource::BankCategory => result.by_bank_category += 1,
                CategorySource::Fallback => result.fallback_to_other += 1,
            }

            if tx.category.as_deref() != Some(resolution.category.as_str()) {
                self.db.update_transaction_category(tx.id, &resolution.category)?;
                result.transactions_updated += 1;
            }
        }

        info!(
            "Reprocessed {} transactions ({} updated: {} learned, {} keyword, {} bank, {} other)",
            result.transactions_processed,
            result.transactions_updated,
            result.by_learned,
            result.by_keyword,
            result.by_bank_category,
            result.fallback_to_other
        );
        Ok(result)
    }
}
