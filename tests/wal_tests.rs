//! Tests for the WAL
//!
//! These tests verify:
//! - Entry framing and checksums
//! - LSN sequencing across appends, reopen and truncate
//! - Recovery from clean, truncated and corrupted logs
//! - Verify mode (stats only, file untouched)

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use siftkv::config::WalSyncStrategy;
use siftkv::error::SiftError;
use siftkv::wal::{Operation, WalEntry, WalReader, WalRecovery, WalWriter, HEADER_SIZE};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn put(bucket: &str, key: &str, value: &str) -> Operation {
    Operation::Put {
        bucket: bucket.to_string(),
        key: key.as_bytes().to_vec(),
        value: value.as_bytes().to_vec(),
    }
}

/// Write `count` single-put batches using WalWriter (produces a well-formed WAL)
fn write_entries_via_writer(path: &Path, count: usize) {
    let mut writer = WalWriter::open(path, WalSyncStrategy::EveryWrite).unwrap();
    for i in 0..count {
        writer
            .append(vec![put("b", &format!("key{}", i), &format!("value{}", i))])
            .unwrap();
    }
}

/// Write raw serialized entries directly to a file (for crafting corruption)
fn write_raw_entries(path: &Path, entries: &[WalEntry]) -> Vec<usize> {
    let mut file = File::create(path).unwrap();
    let mut sizes = Vec::new();
    for entry in entries {
        let bytes = entry.serialize().unwrap();
        sizes.push(bytes.len());
        file.write_all(&bytes).unwrap();
    }
    file.sync_all().unwrap();
    sizes
}

// =============================================================================
// Entry Tests
// =============================================================================

#[test]
fn test_entry_serialize_deserialize() {
    let entry = WalEntry::new(
        7,
        vec![
            Operation::CreateBucket { name: "location".to_string() },
            put("location", "a1", r#"{"id":"a1"}"#),
            Operation::Delete { bucket: "location".to_string(), key: b"a0".to_vec() },
        ],
    );

    let bytes = entry.serialize().unwrap();
    let decoded = WalEntry::deserialize(&bytes).unwrap();

    assert_eq!(decoded, entry);
}

#[test]
fn test_entry_header_layout() {
    let entry = WalEntry::new(42, vec![put("b", "k", "v")]);
    let bytes = entry.serialize().unwrap();

    assert_eq!(&bytes[0..8], &42u64.to_le_bytes());
    let len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;
    assert_eq!(bytes.len(), HEADER_SIZE + len);

    let crc = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    assert_eq!(crc, WalEntry::compute_crc(42, &bytes[HEADER_SIZE..]));
}

#[test]
fn test_entry_detects_flipped_body_byte() {
    let entry = WalEntry::new(1, vec![put("b", "key", "value")]);
    let mut bytes = entry.serialize().unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;

    let result = WalEntry::deserialize(&bytes);
    assert!(matches!(result, Err(SiftError::WalCorruption(_))));
}

#[test]
fn test_entry_detects_changed_lsn() {
    let entry = WalEntry::new(1, vec![put("b", "key", "value")]);
    let mut bytes = entry.serialize().unwrap();
    bytes[0] = 2;

    let result = WalEntry::deserialize(&bytes);
    assert!(matches!(result, Err(SiftError::WalCorruption(_))));
}

#[test]
fn test_entry_incomplete_input() {
    let entry = WalEntry::new(1, vec![put("b", "key", "value")]);
    let bytes = entry.serialize().unwrap();

    assert!(WalEntry::deserialize(&bytes[..HEADER_SIZE - 1]).is_err());
    assert!(WalEntry::deserialize(&bytes[..bytes.len() - 1]).is_err());
}

// =============================================================================
// Writer Tests
// =============================================================================

#[test]
fn test_write_single_entry() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    let lsn = writer.append(vec![put("b", "key1", "value1")]).unwrap();

    assert_eq!(lsn, 1);
    assert_eq!(writer.current_lsn(), 2);
    assert_eq!(writer.size(), fs::metadata(&wal_path).unwrap().len());
}

#[test]
fn test_lsn_sequential() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    for expected in 1..=10 {
        let lsn = writer.append(vec![put("b", "k", "v")]).unwrap();
        assert_eq!(lsn, expected);
    }
}

#[test]
fn test_reopen_continues_lsn() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 3);

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(writer.current_lsn(), 4);
    assert_eq!(writer.append(vec![put("b", "k", "v")]).unwrap(), 4);
}

#[test]
fn test_truncate_keeps_lsn_counting() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(vec![put("b", "a", "1")]).unwrap();
    writer.append(vec![put("b", "b", "2")]).unwrap();
    writer.truncate().unwrap();

    assert_eq!(writer.size(), 0);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), 0);
    assert_eq!(writer.append(vec![put("b", "c", "3")]).unwrap(), 3);
}

#[test]
fn test_advance_to_never_moves_backwards() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.advance_to(50);
    assert_eq!(writer.current_lsn(), 50);
    writer.advance_to(10);
    assert_eq!(writer.current_lsn(), 50);
}

#[test]
fn test_batched_sync_strategy_writes_everything() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer =
            WalWriter::open(&wal_path, WalSyncStrategy::EveryNEntries { count: 4 }).unwrap();
        for i in 0..10 {
            writer.append(vec![put("b", &format!("k{}", i), "v")]).unwrap();
        }
        writer.sync().unwrap();
    }

    let entries: Vec<_> = WalReader::open(&wal_path)
        .unwrap()
        .entries()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(entries.len(), 10);
}

// =============================================================================
// Reader Tests
// =============================================================================

#[test]
fn test_reader_returns_batches_in_order() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer
            .append(vec![Operation::CreateBucket { name: "b".to_string() }, put("b", "a", "1")])
            .unwrap();
        writer.append(vec![put("b", "b", "2")]).unwrap();
    }

    let mut reader = WalReader::open(&wal_path).unwrap();
    let first = reader.next_entry().unwrap().unwrap();
    let second = reader.next_entry().unwrap().unwrap();

    assert_eq!(first.lsn, 1);
    assert_eq!(first.batch.len(), 2);
    assert_eq!(second.lsn, 2);
    assert_eq!(second.batch, vec![put("b", "b", "2")]);
    assert!(reader.next_entry().unwrap().is_none());
}

#[test]
fn test_reader_partial_tail_reads_as_end() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 2);

    let len = fs::metadata(&wal_path).unwrap().len();
    let file = OpenOptions::new().write(true).open(&wal_path).unwrap();
    file.set_len(len - 3).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_entry().unwrap().is_some());
    assert!(reader.next_entry().unwrap().is_none());
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_recover_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result.entries_recovered, 0);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 0);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_clean_log() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 5);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 5);
    assert_eq!(result.entries_recovered, 5);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 5);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_truncates_partial_write() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 3);
    let clean_len = fs::metadata(&wal_path).unwrap().len();

    // Half a header of a fourth entry
    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[4, 0, 0, 0, 0, 0, 0, 0]).unwrap();
    drop(file);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 3);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), clean_len);
}

#[test]
fn test_recover_skips_corrupted_entry() {
    let (_temp, wal_path) = setup_temp_wal();
    let entries: Vec<WalEntry> = (1..=3)
        .map(|lsn| WalEntry::new(lsn, vec![put("b", &format!("k{}", lsn), "v")]))
        .collect();
    let sizes = write_raw_entries(&wal_path, &entries);

    // Flip the last body byte of the middle entry
    let mut bytes = fs::read(&wal_path).unwrap();
    let offset = sizes[0] + sizes[1] - 1;
    bytes[offset] ^= 0xFF;
    fs::write(&wal_path, &bytes).unwrap();

    let (recovered, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 2);
    assert_eq!(result.entries_corrupted, 1);
    assert_eq!(result.last_lsn, 3);
    assert_eq!(recovered.iter().map(|e| e.lsn).collect::<Vec<_>>(), vec![1, 3]);
}

#[test]
fn test_verify_does_not_modify_file() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 2);

    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[1, 2, 3]).unwrap();
    drop(file);
    let len_before = fs::metadata(&wal_path).unwrap().len();

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 2);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), len_before);
}
