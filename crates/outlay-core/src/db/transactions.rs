//! Transaction operations

use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{NewTransaction, Transaction};

impl Database {
    /// Insert a transaction (skips duplicates based on import_hash)
    ///
    /// Returns the new row id, or `None` when an identical record already
    /// exists, so re-supplying the same history is harmless.
    pub fn insert_transaction(&self, tx: &NewTransaction) -> Result<Option<i64>> {
        let conn = self.conn()?;

        // Check for duplicate
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM transactions WHERE import_hash = ?",
                params![tx.import_hash],
                |row| row.get(0),
            )
            .optional()?;

        if existing.is_some() {
            debug!("Skipping duplicate transaction: {} {}", tx.date, tx.description);
            return Ok(None);
        }

        conn.execute(
            r#"
            INSERT INTO transactions (date, description, merchant, merchant_normalized, category, bank_category, amount, account_type, original_data, import_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.date.to_string(),
                tx.description,
                tx.merchant,
                tx.merchant_normalized,
                tx.category,
                tx.bank_category,
                tx.amount,
                tx.account_type,
                tx.original_data,
                tx.import_hash,
            ],
        )?;

        Ok(Some(conn.last_insert_rowid()))
    }

    /// List transactions in date order, optionally limited
    pub fn list_transactions(&self, limit: Option<i64>) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;

        let mut sql = String::from(
            "SELECT id, date, description, merchant, merchant_normalized, category, bank_category,
                    amount, account_type, original_data, import_hash, created_at
             FROM transactions
             ORDER BY date ASC, id ASC",
        );
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }

        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map([], Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Get all transactions whose normalized merchant pattern matches
    pub fn get_transactions_by_pattern(&self, pattern: &str) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, date, description, merchant, merchant_normalized, category, bank_category,
                    amount, account_type, original_data, import_hash, created_at
             FROM transactions
             WHERE merchant_normalized = ?
             ORDER BY date ASC, id ASC",
        )?;

        let transactions = stmt
            .query_map(params![pattern], Self::row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Get a single transaction by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, date, description, merchant, merchant_normalized, category, bank_category,
                    amount, account_type, original_data, import_hash, created_at
             FROM transactions WHERE id = ?",
        )?;

        let transaction = stmt
            .query_row(params![id], Self::row_to_transaction)
            .optional()?;

        Ok(transaction)
    }

    /// Rewrite the resolved category of a transaction
    pub fn update_transaction_category(&self, id: i64, category: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE transactions SET category = ? WHERE id = ?",
            params![category, id],
        )?;
        Ok(())
    }

    /// Count total transactions
    pub fn count_transactions(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Helper to convert a row to Transaction
    /// Column order: id, date, description, merchant, merchant_normalized, category,
    ///               bank_category, amount, account_type, original_data, import_hash, created_at
    pub(crate) fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        let date_str: String = row.get(1)?;
        let created_at_str: String = row.get(11)?;
        Ok(Transaction {
            id: row.get(0)?,
            date: chrono::NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").unwrap_or_default(),
            description: row.get(2)?,
            merchant: row.get(3)?,
            merchant_normalized: row.get(4)?,
            category: row.get(5)?,
            bank_category: row.get(6)?,
            amount: row.get(7)?,
            account_type: row.get(8)?,
            original_data: row.get(9)?,
            import_hash: row.get(10)?,
            created_at: parse_datetime(&created_at_str),
        })
    }
}
