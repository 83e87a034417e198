//! Learned category mapping operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::LearnedMapping;

impl Database {
    /// Save or update a merchant pattern → category mapping (last write wins)
    pub fn upsert_learned_mapping(&self, pattern: &str, category: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO category_mappings (merchant_pattern, category)
            VALUES (?1, ?2)
            ON CONFLICT(merchant_pattern)
            DO UPDATE SET category = excluded.category, created_at = CURRENT_TIMESTAMP
            "#,
            params![pattern, category],
        )?;
        Ok(())
    }

    /// Get the learned category for a merchant pattern
    pub fn get_learned_mapping(&self, pattern: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                "SELECT category FROM category_mappings WHERE merchant_pattern = ?",
                params![pattern],
                |row| row.get(0),
            )
            .optional()?;
        Ok(category)
    }

    /// List all learned mappings, newest first
    pub fn list_learned_mappings(&self) -> Result<Vec<LearnedMapping>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT merchant_pattern, category, created_at
             FROM category_mappings
             ORDER BY created_at DESC, id DESC",
        )?;

        let mappings = stmt
            .query_map([], |row| {
                let created_at_str: String = row.get(2)?;
                Ok(LearnedMapping {
                    merchant_pattern: row.get(0)?,
                    category: row.get(1)?,
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(mappings)
    }

    /// Delete a learned mapping; returns whether a row existed
    pub fn delete_learned_mapping(&self, pattern: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM category_mappings WHERE merchant_pattern = ?",
            params![pattern],
        )?;
        Ok(deleted > 0)
    }

    /// Upsert a learned mapping and retroactively relabel matching
    /// transactions, atomically.
    ///
    /// The mapping write and the bulk relabel share one database transaction,
    /// so a crash leaves neither applied and the whole operation can simply be
    /// re-run. Only rows whose category actually differs are rewritten, which
    /// makes the returned count 0 for a repeated teach.
    pub fn teach_mapping(&self, pattern: &str, category: &str) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO category_mappings (merchant_pattern, category)
            VALUES (?1, ?2)
            ON CONFLICT(merchant_pattern)
            DO UPDATE SET category = excluded.category, created_at = CURRENT_TIMESTAMP
            "#,
            params![pattern, category],
        )?;

        let updated = tx.execute(
            r#"
            UPDATE transactions
            SET category = ?1
            WHERE merchant_normalized = ?2
              AND (category IS NULL OR category != ?1)
            "#,
            params![category, pattern],
        )?;

        tx.commit()?;
        Ok(updated)
    }
}
