//! Recurrence record operations

use chrono::NaiveDate;
use rusqlite::params;

use super::Database;
use crate::error::Result;
use crate::models::{Frequency, RecurrenceRecord};

impl Database {
    /// Replace the stored recurrence set with the latest detection run.
    ///
    /// Every stored row is deactivated first and the supplied records are
    /// upserted active, all in one database transaction. A pattern that
    /// stopped qualifying therefore stays visible but inactive; the table
    /// never holds an active record for a pattern the latest run rejected.
    pub fn replace_recurrence_records(&self, records: &[RecurrenceRecord]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "UPDATE recurring_transactions SET is_active = 0, updated_at = CURRENT_TIMESTAMP",
            [],
        )?;

        for record in records {
            tx.execute(
                r#"
                INSERT INTO recurring_transactions
                    (merchant_pattern, category, frequency, average_amount, last_amount,
                     last_date, occurrence_count, amount_variance, is_active, is_subscription)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9)
                ON CONFLICT(merchant_pattern)
                DO UPDATE SET
                    category = excluded.category,
                    frequency = excluded.frequency,
                    average_amount = excluded.average_amount,
                    last_amount = excluded.last_amount,
                    last_date = excluded.last_date,
                    occurrence_count = excluded.occurrence_count,
                    amount_variance = excluded.amount_variance,
                    is_active = 1,
                    is_subscription = excluded.is_subscription,
                    updated_at = CURRENT_TIMESTAMP
                "#,
                params![
                    record.merchant_pattern,
                    record.category,
                    record.frequency.as_str(),
                    record.average_amount,
                    record.last_amount,
                    record.last_date.to_string(),
                    record.occurrence_count,
                    record.amount_variance,
                    record.is_subscription,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// List recurrence records, optionally only the currently active set
    pub fn list_recurring(&self, active_only: bool) -> Result<Vec<RecurrenceRecord>> {
        let conn = self.conn()?;

        let mut sql = String::from(
            "SELECT merchant_pattern, category, frequency, average_amount, last_amount,
                    last_date, occurrence_count, amount_variance, is_active, is_subscription
             FROM recurring_transactions",
        );
        if active_only {
            sql.push_str(" WHERE is_active = 1");
        }
        sql.push_str(" ORDER BY frequency, average_amount DESC");

        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([], |row| {
                let freq_str: String = row.get(2)?;
                let frequency = freq_str.parse::<Frequency>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Text,
                        e.into(),
                    )
                })?;
                let last_date_str: String = row.get(5)?;
                let is_active_int: i64 = row.get(8)?;
                let is_subscription_int: i64 = row.get(9)?;

                Ok(RecurrenceRecord {
                    merchant_pattern: row.get(0)?,
                    category: row.get(1)?,
                    frequency,
                    average_amount: row.get(3)?,
                    last_amount: row.get(4)?,
                    last_date: NaiveDate::parse_from_str(&last_date_str, "%Y-%m-%d")
                        .unwrap_or_default(),
                    occurrence_count: row.get(6)?,
                    amount_variance: row.get(7)?,
                    is_active: is_active_int != 0,
                    is_subscription: is_subscription_int != 0,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }
}
