//! Database layer tests

use chrono::NaiveDate;

use super::Database;
use crate::models::{Frequency, NewTransaction, RecurrenceRecord};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sample_tx(day: NaiveDate, description: &str, amount: f64) -> NewTransaction {
    let mut tx = NewTransaction::new(day, description, description, amount, "Checking");
    tx.merchant_normalized = Some(description.to_string());
    tx
}

fn sample_record(pattern: &str, frequency: Frequency) -> RecurrenceRecord {
    RecurrenceRecord {
        merchant_pattern: pattern.to_string(),
        category: Some("Subscriptions".to_string()),
        frequency,
        average_amount: 15.99,
        last_amount: 15.99,
        last_date: date(2024, 4, 1),
        occurrence_count: 4,
        amount_variance: 0.0,
        is_active: true,
        is_subscription: true,
    }
}

#[test]
fn test_insert_and_fetch_transaction() {
    let db = Database::in_memory().unwrap();

    let mut tx = sample_tx(date(2024, 1, 15), "NETFLIX.COM", 15.99);
    tx.category = Some("Subscriptions".to_string());
    tx.bank_category = Some("Entertainment".to_string());
    tx.original_data = Some(
        serde_json::json!({"Description": "NETFLIX.COM", "Amount (USD)": "15.99"}).to_string(),
    );

    let id = db.insert_transaction(&tx).unwrap().unwrap();
    let stored = db.get_transaction(id).unwrap().unwrap();

    assert_eq!(stored.date, date(2024, 1, 15));
    assert_eq!(stored.description, "NETFLIX.COM");
    assert_eq!(stored.merchant_normalized.as_deref(), Some("NETFLIX.COM"));
    assert_eq!(stored.category.as_deref(), Some("Subscriptions"));
    assert_eq!(stored.bank_category.as_deref(), Some("Entertainment"));
    assert!((stored.amount - 15.99).abs() < f64::EPSILON);
    assert_eq!(stored.account_type, "Checking");
    let raw = stored.original_record().unwrap();
    assert_eq!(raw["Description"], "NETFLIX.COM");
}

#[test]
fn test_insert_skips_duplicates() {
    let db = Database::in_memory().unwrap();

    let tx = sample_tx(date(2024, 1, 15), "NETFLIX.COM", 15.99);
    assert!(db.insert_transaction(&tx).unwrap().is_some());
    assert!(db.insert_transaction(&tx).unwrap().is_none());
    assert_eq!(db.count_transactions().unwrap(), 1);

    // A different date is a different transaction
    let other = sample_tx(date(2024, 2, 15), "NETFLIX.COM", 15.99);
    assert!(db.insert_transaction(&other).unwrap().is_some());
    assert_eq!(db.count_transactions().unwrap(), 2);
}

#[test]
fn test_list_transactions_date_order_and_limit() {
    let db = Database::in_memory().unwrap();

    db.insert_transaction(&sample_tx(date(2024, 3, 1), "LATE", 1.0)).unwrap();
    db.insert_transaction(&sample_tx(date(2024, 1, 1), "EARLY", 1.0)).unwrap();
    db.insert_transaction(&sample_tx(date(2024, 2, 1), "MIDDLE", 1.0)).unwrap();

    let all = db.list_transactions(None).unwrap();
    let order: Vec<&str> = all.iter().map(|t| t.description.as_str()).collect();
    assert_eq!(order, ["EARLY", "MIDDLE", "LATE"]);

    let limited = db.list_transactions(Some(2)).unwrap();
    assert_eq!(limited.len(), 2);
}

#[test]
fn test_get_transactions_by_pattern() {
    let db = Database::in_memory().unwrap();

    db.insert_transaction(&sample_tx(date(2024, 1, 1), "SPOTIFY", 10.99)).unwrap();
    db.insert_transaction(&sample_tx(date(2024, 2, 1), "SPOTIFY", 10.99)).unwrap();
    db.insert_transaction(&sample_tx(date(2024, 1, 5), "HULU", 17.99)).unwrap();

    let spotify = db.get_transactions_by_pattern("SPOTIFY").unwrap();
    assert_eq!(spotify.len(), 2);
    let hulu = db.get_transactions_by_pattern("HULU").unwrap();
    assert_eq!(hulu.len(), 1);
    assert!(db.get_transactions_by_pattern("NETFLIX.COM").unwrap().is_empty());
}

#[test]
fn test_update_transaction_category() {
    let db = Database::in_memory().unwrap();

    let id = db
        .insert_transaction(&sample_tx(date(2024, 1, 1), "CORNER SHOP", 5.0))
        .unwrap()
        .unwrap();
    db.update_transaction_category(id, "Grocery").unwrap();

    let stored = db.get_transaction(id).unwrap().unwrap();
    assert_eq!(stored.category.as_deref(), Some("Grocery"));
}

#[test]
fn test_learned_mapping_upsert_is_last_write_wins() {
    let db = Database::in_memory().unwrap();

    db.upsert_learned_mapping("BREW LAB", "Dining").unwrap();
    db.upsert_learned_mapping("BREW LAB", "Entertainment").unwrap();

    assert_eq!(
        db.get_learned_mapping("BREW LAB").unwrap().as_deref(),
        Some("Entertainment")
    );
    assert_eq!(db.list_learned_mappings().unwrap().len(), 1);
    assert_eq!(db.get_learned_mapping("UNKNOWN").unwrap(), None);
}

#[test]
fn test_delete_learned_mapping() {
    let db = Database::in_memory().unwrap();

    db.upsert_learned_mapping("BREW LAB", "Dining").unwrap();
    assert!(db.delete_learned_mapping("BREW LAB").unwrap());
    assert!(!db.delete_learned_mapping("BREW LAB").unwrap());
    assert_eq!(db.get_learned_mapping("BREW LAB").unwrap(), None);
}

#[test]
fn test_teach_mapping_upserts_and_relabels_together() {
    let db = Database::in_memory().unwrap();

    let mut tx = sample_tx(date(2024, 1, 1), "BREW LAB", 6.5);
    tx.category = Some("Other".to_string());
    db.insert_transaction(&tx).unwrap();
    let mut tx = sample_tx(date(2024, 2, 1), "BREW LAB", 6.5);
    tx.category = Some("Other".to_string());
    db.insert_transaction(&tx).unwrap();

    let updated = db.teach_mapping("BREW LAB", "Dining").unwrap();
    assert_eq!(updated, 2);

    // Both effects are visible: the mapping and the relabel
    assert_eq!(db.get_learned_mapping("BREW LAB").unwrap().as_deref(), Some("Dining"));
    for stored in db.get_transactions_by_pattern("BREW LAB").unwrap() {
        assert_eq!(stored.category.as_deref(), Some("Dining"));
    }

    // Re-running is safe and reports nothing changed
    assert_eq!(db.teach_mapping("BREW LAB", "Dining").unwrap(), 0);
}

#[test]
fn test_teach_mapping_counts_only_changed_rows() {
    let db = Database::in_memory().unwrap();

    let mut already = sample_tx(date(2024, 1, 1), "BREW LAB", 6.5);
    already.category = Some("Dining".to_string());
    db.insert_transaction(&already).unwrap();
    let mut uncategorized = sample_tx(date(2024, 2, 1), "BREW LAB", 6.5);
    uncategorized.category = None;
    db.insert_transaction(&uncategorized).unwrap();

    // One row already carries the category; only the NULL row counts
    assert_eq!(db.teach_mapping("BREW LAB", "Dining").unwrap(), 1);
}

#[test]
fn test_replace_recurrence_records_deactivates_missing_patterns() {
    let db = Database::in_memory().unwrap();

    db.replace_recurrence_records(&[
        sample_record("NETFLIX.COM", Frequency::Monthly),
        sample_record("SPOTIFY", Frequency::Monthly),
    ])
    .unwrap();
    assert_eq!(db.list_recurring(true).unwrap().len(), 2);

    // Next run only sees Netflix; Spotify must flip inactive, not linger
    db.replace_recurrence_records(&[sample_record("NETFLIX.COM", Frequency::Monthly)])
        .unwrap();

    let active = db.list_recurring(true).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].merchant_pattern, "NETFLIX.COM");

    let all = db.list_recurring(false).unwrap();
    assert_eq!(all.len(), 2);
    let spotify = all.iter().find(|r| r.merchant_pattern == "SPOTIFY").unwrap();
    assert!(!spotify.is_active);
}

#[test]
fn test_replace_recurrence_records_overwrites_wholesale() {
    let db = Database::in_memory().unwrap();

    db.replace_recurrence_records(&[sample_record("NETFLIX.COM", Frequency::Monthly)])
        .unwrap();

    let mut updated = sample_record("NETFLIX.COM", Frequency::Monthly);
    updated.average_amount = 17.24;
    updated.last_amount = 19.99;
    updated.occurrence_count = 5;
    updated.amount_variance = 4.0;
    updated.is_subscription = false;
    db.replace_recurrence_records(&[updated]).unwrap();

    let stored = db.list_recurring(true).unwrap();
    assert_eq!(stored.len(), 1);
    let record = &stored[0];
    assert!((record.average_amount - 17.24).abs() < f64::EPSILON);
    assert!((record.last_amount - 19.99).abs() < f64::EPSILON);
    assert_eq!(record.occurrence_count, 5);
    assert!(!record.is_subscription);
}

#[test]
fn test_recurrence_round_trip_preserves_fields() {
    let db = Database::in_memory().unwrap();

    let record = RecurrenceRecord {
        merchant_pattern: "CITY WATER".to_string(),
        category: None,
        frequency: Frequency::Quarterly,
        average_amount: 120.5,
        last_amount: 131.0,
        last_date: date(2024, 3, 15),
        occurrence_count: 5,
        amount_variance: 22.5,
        is_active: true,
        is_subscription: false,
    };
    db.replace_recurrence_records(std::slice::from_ref(&record)).unwrap();

    let stored = &db.list_recurring(true).unwrap()[0];
    assert_eq!(stored.merchant_pattern, record.merchant_pattern);
    assert_eq!(stored.category, None);
    assert_eq!(stored.frequency, Frequency::Quarterly);
    assert_eq!(stored.last_date, record.last_date);
    assert!((stored.amount_variance - 22.5).abs() < f64::EPSILON);
}

#[test]
fn test_database_reopens_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outlay.db");
    let path = path.to_str().unwrap();

    {
        let db = Database::new(path).unwrap();
        db.insert_transaction(&sample_tx(date(2024, 1, 1), "NETFLIX.COM", 15.99))
            .unwrap();
        db.upsert_learned_mapping("NETFLIX.COM", "Subscriptions").unwrap();
    }

    // Reopen: migrations are idempotent and data survives
    let db = Database::new(path).unwrap();
    assert_eq!(db.count_transactions().unwrap(), 1);
    assert_eq!(
        db.get_learned_mapping("NETFLIX.COM").unwrap().as_deref(),
        Some("Subscriptions")
    );
}
