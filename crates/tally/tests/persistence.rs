//! Binary persistence: round trips, snapshot independence, and corruption
//! handling.

use std::io::Cursor;
use tally::prelude::*;

fn pos(s: &str) -> Position {
    s.parse().unwrap()
}

fn assert_value(sheet: &Sheet, at: &str, expected: Value) {
    let actual = sheet.get_value(pos(at));
    assert!(
        actual.matches(&expected),
        "{at}: expected {expected:?}, got {actual:?}"
    );
}

fn number(n: f64) -> Value {
    Value::Number(n)
}

fn build_sample() -> Sheet {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("A1"), "10").unwrap();
    sheet.set_cell(pos("A2"), "20.5").unwrap();
    sheet.set_cell(pos("A3"), "3e1").unwrap();
    sheet.set_cell(pos("B1"), "=A1+A2*A3").unwrap();
    sheet.set_cell(pos("B2"), "= -A1 ^ 2 - A2 / 2").unwrap();
    sheet.set_cell(pos("B3"), "= 2 ^ $A$1").unwrap();
    sheet.set_cell(pos("B4"), "=($A1+A$2)^2").unwrap();
    sheet.set_cell(pos("C1"), "plain text").unwrap();
    sheet.set_cell(pos("C2"), "").unwrap();
    sheet.set_cell(pos("C3"), "=SUM(A1:A3)").unwrap();
    sheet
}

fn save_to_bytes(sheet: &Sheet) -> Vec<u8> {
    let mut bytes = Vec::new();
    sheet.save(&mut bytes).unwrap();
    bytes
}

#[test]
fn test_round_trip_preserves_values() {
    let sheet = build_sample();
    let bytes = save_to_bytes(&sheet);

    let mut restored = Sheet::new();
    restored.load(Cursor::new(bytes)).unwrap();

    assert_value(&restored, "A1", number(10.0));
    assert_value(&restored, "B1", number(625.0));
    assert_value(&restored, "B2", number(-110.25));
    assert_value(&restored, "B3", number(1024.0));
    assert_value(&restored, "B4", number(930.25));
    assert_value(&restored, "C1", Value::Text("plain text".into()));
    assert_value(&restored, "C2", Value::Text("".into()));
    assert_value(&restored, "C3", Value::Undefined);
}

#[test]
fn test_loaded_sheet_is_a_snapshot() {
    let mut original = build_sample();
    let bytes = save_to_bytes(&original);

    let mut copy = Sheet::new();
    copy.load(Cursor::new(bytes)).unwrap();

    // Mutating the original must not leak into the loaded copy.
    original.set_cell(pos("A1"), "999").unwrap();
    original.set_cell(pos("A3"), "4e1").unwrap();

    assert_value(&copy, "B1", number(625.0));
    assert_value(&copy, "B2", number(-110.25));
    assert_value(&copy, "B3", number(1024.0));
    assert_value(&copy, "B4", number(930.25));

    // And the original sees its own edits.
    assert_value(&original, "B3", number(2.0f64.powf(999.0)));
}

#[test]
fn test_absolute_flags_survive_the_round_trip() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("D0"), "10").unwrap();
    sheet.set_cell(pos("D2"), "30").unwrap();
    sheet.set_cell(pos("F10"), "=$D$0+5").unwrap();
    sheet.set_cell(pos("F11"), "=D0+5").unwrap();

    let mut restored = Sheet::new();
    restored.load(Cursor::new(save_to_bytes(&sheet))).unwrap();

    // Copy two rows down after loading: the pinned reference stays on D0,
    // the relative one moves with the offset.
    restored.copy_rect(pos("F12"), pos("F10"), 1, 2);
    assert_value(&restored, "F12", number(15.0)); // $D$0+5
    assert_value(&restored, "F13", number(35.0)); // D2+5
}

#[test]
fn test_corrupted_prefix_rejected() {
    let sheet = build_sample();
    let mut bytes = save_to_bytes(&sheet);
    for byte in bytes.iter_mut().take(10) {
        *byte ^= 0x5A;
    }

    let mut target = Sheet::new();
    target.set_cell(pos("K1"), "prior").unwrap();

    assert!(target.load(Cursor::new(bytes)).is_err());
    // The failed load leaves the target exactly as it was.
    assert_value(&target, "K1", Value::Text("prior".into()));
    assert_eq!(target.len(), 1);
}

#[test]
fn test_flipped_node_tag_rejected() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("A1"), "42").unwrap();
    let mut bytes = save_to_bytes(&sheet);

    // Layout: count u64 (8) + position (4+4+1) + node count u64 (8) puts
    // the first node's type id at offset 25.
    assert_eq!(bytes[25], 14); // Num
    bytes[25] = 0x63;

    let mut target = Sheet::new();
    assert!(target.load(Cursor::new(bytes)).is_err());
    assert!(target.is_empty());
}

#[test]
fn test_truncated_stream_rejected() {
    let sheet = build_sample();
    let bytes = save_to_bytes(&sheet);

    for cut in [0, 3, 7, 8, 20, bytes.len() - 1] {
        let mut target = Sheet::new();
        target.set_cell(pos("K1"), "prior").unwrap();
        assert!(
            target.load(Cursor::new(bytes[..cut].to_vec())).is_err(),
            "load accepted a stream cut to {cut} bytes"
        );
        assert_value(&target, "K1", Value::Text("prior".into()));
    }
}

#[test]
fn test_cell_count_exceeding_stream_rejected() {
    let sheet = build_sample();
    let mut bytes = save_to_bytes(&sheet);
    // Claim many more entries than the stream holds.
    bytes[0..8].copy_from_slice(&u64::MAX.to_le_bytes());

    let mut target = Sheet::new();
    assert!(target.load(Cursor::new(bytes)).is_err());
}

#[test]
fn test_empty_sheet_round_trip() {
    let sheet = Sheet::new();
    let bytes = save_to_bytes(&sheet);
    assert_eq!(bytes.len(), 8);

    let mut restored = build_sample();
    restored.load(Cursor::new(bytes)).unwrap();
    assert!(restored.is_empty());
    assert_value(&restored, "A1", Value::Undefined);
}

#[test]
fn test_load_replaces_rather_than_merges() {
    let mut small = Sheet::new();
    small.set_cell(pos("A1"), "1").unwrap();
    let bytes = save_to_bytes(&small);

    let mut target = build_sample();
    target.load(Cursor::new(bytes)).unwrap();

    assert_eq!(target.len(), 1);
    assert_value(&target, "A1", number(1.0));
    assert_value(&target, "B1", Value::Undefined);
}

#[test]
fn test_cycles_survive_persistence() {
    let mut sheet = Sheet::new();
    sheet.set_cell(pos("A1"), "=A2").unwrap();
    sheet.set_cell(pos("A2"), "=A1").unwrap();

    let mut restored = Sheet::new();
    restored.load(Cursor::new(save_to_bytes(&sheet))).unwrap();

    assert_value(&restored, "A1", Value::Undefined);
    assert_value(&restored, "A2", Value::Undefined);
}
