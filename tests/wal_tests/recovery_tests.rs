//! Tests for WAL Recovery
//!
//! These tests verify:
//! - Replay of intact logs
//! - Truncation of torn or corrupted tails
//! - `verify` reporting without touching the file

use std::fs;

use zsetkv::wal::{Operation, RecoveryResult, WalEntry, WalRecovery};

use crate::common::{append_raw, del, put, setup_temp_wal, single_put, write_entries_to_wal};

fn corrupted(entry: &WalEntry) -> Vec<u8> {
    let mut bytes = entry.serialize().unwrap();
    if let Some(byte) = bytes.last_mut() {
        *byte ^= 0xFF;
    }
    bytes
}

// =============================================================================
// Clean Recovery Tests
// =============================================================================

#[test]
fn test_recover_empty_file() {
    let (_temp_dir, wal_path) = setup_temp_wal();
    write_entries_to_wal(&wal_path, &[]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result, RecoveryResult::default());
}

#[test]
fn test_recover_multiple_entries() {
    let (_temp_dir, wal_path) = setup_temp_wal();
    let written: Vec<WalEntry> = (1..=4)
        .map(|i| single_put(i, format!("k{}", i).as_bytes(), b"v"))
        .collect();
    write_entries_to_wal(&wal_path, &written);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries, written);
    assert_eq!(result.entries_recovered, 4);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 4);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_preserves_batches() {
    let (_temp_dir, wal_path) = setup_temp_wal();
    let batch = vec![put(b"m", b"1"), put(b"s", b""), del(b"old")];
    write_entries_to_wal(&wal_path, &[WalEntry::new(1, batch.clone())]);

    let (entries, _) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].operations, batch);
}

// =============================================================================
// Damaged Tail Tests
// =============================================================================

#[test]
fn test_recover_partial_header_at_tail() {
    let (_temp_dir, wal_path) = setup_temp_wal();
    let good = single_put(1, b"key", b"value");
    write_entries_to_wal(&wal_path, &[good.clone()]);
    append_raw(&wal_path, &[1, 2, 3, 4, 5]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries, vec![good.clone()]);
    assert_eq!(result.entries_corrupted, 1);
    assert!(result.was_truncated);
    assert_eq!(
        fs::metadata(&wal_path).unwrap().len(),
        good.serialized_size().unwrap() as u64
    );
}

#[test]
fn test_recover_partial_data_at_tail() {
    let (_temp_dir, wal_path) = setup_temp_wal();
    let good = single_put(1, b"key", b"value");
    let torn = WalEntry::new(2, vec![put(b"a", b"1"), put(b"b", b"2")])
        .serialize()
        .unwrap();
    write_entries_to_wal(&wal_path, &[good.clone()]);
    append_raw(&wal_path, &torn[..torn.len() - 1]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    // The torn batch is dropped as a whole
    assert_eq!(entries, vec![good]);
    assert_eq!(result.last_lsn, 1);
    assert!(result.was_truncated);
}

#[test]
fn test_recover_drops_everything_after_corruption() {
    let (_temp_dir, wal_path) = setup_temp_wal();
    write_entries_to_wal(&wal_path, &[single_put(1, b"a", b"1")]);
    append_raw(&wal_path, &corrupted(&single_put(2, b"b", b"2")));
    append_raw(&wal_path, &single_put(3, b"c", b"3").serialize().unwrap());

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(result.entries_recovered, 1);
    assert_eq!(result.entries_corrupted, 1);
    assert_eq!(result.last_lsn, 1);

    // A second pass finds a clean log
    let (again, second) = WalRecovery::recover(&wal_path).unwrap();
    assert_eq!(again.len(), 1);
    assert!(!second.was_truncated);
}

#[test]
fn test_recover_corruption_at_first_entry() {
    let (_temp_dir, wal_path) = setup_temp_wal();
    write_entries_to_wal(&wal_path, &[]);
    append_raw(&wal_path, &corrupted(&single_put(1, b"a", b"1")));

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result.last_lsn, 0);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), 0);
}

// =============================================================================
// Verify Tests
// =============================================================================

#[test]
fn test_verify_clean_wal() {
    let (_temp_dir, wal_path) = setup_temp_wal();
    write_entries_to_wal(&wal_path, &[single_put(1, b"a", b"1"), single_put(2, b"b", b"2")]);

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 2);
    assert_eq!(result.last_lsn, 2);
    assert_eq!(result.entries_corrupted, 0);
}

#[test]
fn test_verify_leaves_damaged_file_untouched() {
    let (_temp_dir, wal_path) = setup_temp_wal();
    write_entries_to_wal(&wal_path, &[single_put(1, b"a", b"1")]);
    append_raw(&wal_path, &[0xFF; 9]);
    let before = fs::metadata(&wal_path).unwrap().len();

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 1);
    assert_eq!(result.entries_corrupted, 1);
    assert!(!result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), before);
}

#[test]
fn test_recover_and_verify_agree() {
    let (_temp_dir, wal_path) = setup_temp_wal();
    let entries: Vec<WalEntry> = (1..=3)
        .map(|i| WalEntry::new(i, vec![Operation::Delete { key: vec![i as u8] }]))
        .collect();
    write_entries_to_wal(&wal_path, &entries);
    append_raw(&wal_path, &corrupted(&single_put(4, b"x", b"y")));

    let verified = WalRecovery::verify(&wal_path).unwrap();
    let (_, recovered) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(verified.entries_recovered, recovered.entries_recovered);
    assert_eq!(verified.last_lsn, recovered.last_lsn);
    assert_eq!(verified.entries_corrupted, recovered.entries_corrupted);
}
