//! Tests for slot placement, completion, staleness and version restarts.

use bytes::Bytes;
use rstest::{fixture, rstest};

use super::*;
use crate::test_helpers::{frame, payload_of};

const STAMP: &str = "2024-01-01 00:00";
const NEWER: &str = "2024-01-01 00:05";

#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
#[fixture]
fn assembler() -> FileAssembler { FileAssembler::default() }

fn part(filename: &str, stamp: &str, part: u32, total: u32) -> Frame {
    frame(filename, stamp, part, total, payload_of(part as u8))
}

fn expect_completed(outcome: AcceptOutcome) -> CompletedFile {
    match outcome {
        AcceptOutcome::Completed(file) => file,
        other => panic!("expected completed file, got {other:?}"),
    }
}

fn concat(parts: &[u8]) -> Bytes {
    parts
        .iter()
        .flat_map(|fill| payload_of(*fill).to_vec())
        .collect()
}

#[rstest]
#[case([2, 1, 3])]
#[case([3, 2, 1])]
#[case([1, 2, 3])]
fn completes_in_index_order_regardless_of_arrival(
    mut assembler: FileAssembler,
    #[case] order: [u32; 3],
) {
    let mut outcomes: Vec<_> = order
        .iter()
        .map(|n| assembler.accept(part("TAFALLUS.TXT", STAMP, *n, 3)))
        .collect();

    let file = expect_completed(outcomes.pop().expect("three outcomes"));
    assert!(
        outcomes
            .iter()
            .all(|outcome| matches!(outcome, AcceptOutcome::Pending { .. }))
    );
    assert_eq!(file.filename(), "TAFALLUS.TXT");
    assert_eq!(file.version_stamp(), STAMP);
    assert_eq!(file.content(), &concat(&[1, 2, 3]));
    assert_eq!(file.len(), 3 * 1024);
    assert_eq!(assembler.in_flight_len(), 0);
    assert_eq!(assembler.last_delivered("TAFALLUS.TXT"), Some(STAMP));
}

#[rstest]
fn single_part_file_completes_immediately(mut assembler: FileAssembler) {
    let file = expect_completed(assembler.accept(part("ZONE.TXT", STAMP, 1, 1)));
    assert_eq!(file.content(), &payload_of(1));
}

#[rstest]
fn repeated_part_overwrites_without_counting_twice(mut assembler: FileAssembler) {
    assembler.accept(part("A.TXT", STAMP, 1, 2));
    let outcome = assembler.accept(frame("A.TXT", STAMP, 1, 2, payload_of(9)));

    assert_eq!(
        outcome,
        AcceptOutcome::Pending {
            received: 1,
            total: 2,
            abandoned: None,
        }
    );
    let file = expect_completed(assembler.accept(part("A.TXT", STAMP, 2, 2)));
    assert_eq!(file.content(), &concat(&[9, 2]));
}

#[rstest]
#[case(STAMP)]
#[case("2023-12-31 23:59")]
fn rejects_stamps_not_newer_than_delivered(mut assembler: FileAssembler, #[case] stamp: &str) {
    expect_completed(assembler.accept(part("A.TXT", STAMP, 1, 1)));

    assert_eq!(
        assembler.accept(part("A.TXT", stamp, 1, 1)),
        AcceptOutcome::Stale
    );
    assert_eq!(assembler.in_flight_len(), 0);
    assert_eq!(assembler.last_delivered("A.TXT"), Some(STAMP));
}

#[rstest]
fn newer_stamp_after_delivery_is_accepted(mut assembler: FileAssembler) {
    expect_completed(assembler.accept(part("A.TXT", STAMP, 1, 1)));
    let file = expect_completed(assembler.accept(part("A.TXT", NEWER, 1, 1)));

    assert_eq!(file.version_stamp(), NEWER);
    assert_eq!(assembler.last_delivered("A.TXT"), Some(NEWER));
}

#[rstest]
fn empty_stamp_is_never_newer(mut assembler: FileAssembler) {
    assert_eq!(
        assembler.accept(part("A.TXT", "", 1, 1)),
        AcceptOutcome::Stale
    );
}

#[rstest]
fn different_version_abandons_partial_assembly(mut assembler: FileAssembler) {
    assembler.accept(frame("A.TXT", STAMP, 1, 3, payload_of(0xA1)));
    assembler.accept(frame("A.TXT", STAMP, 2, 3, payload_of(0xA2)));

    let outcome = assembler.accept(frame("A.TXT", NEWER, 3, 3, payload_of(0xB3)));
    assert_eq!(
        outcome,
        AcceptOutcome::Pending {
            received: 1,
            total: 3,
            abandoned: Some(STAMP.to_owned()),
        }
    );
    assert_eq!(assembler.in_flight("A.TXT"), Some((NEWER, 1, 3)));

    assembler.accept(frame("A.TXT", NEWER, 1, 3, payload_of(0xB1)));
    let file = expect_completed(assembler.accept(frame("A.TXT", NEWER, 2, 3, payload_of(0xB2))));

    assert_eq!(file.version_stamp(), NEWER);
    assert_eq!(file.content(), &concat(&[0xB1, 0xB2, 0xB3]));
}

#[rstest]
fn older_in_flight_version_also_restarts(mut assembler: FileAssembler) {
    assembler.accept(part("A.TXT", NEWER, 1, 2));
    let outcome = assembler.accept(part("A.TXT", STAMP, 2, 2));

    assert_eq!(
        outcome,
        AcceptOutcome::Pending {
            received: 1,
            total: 2,
            abandoned: Some(NEWER.to_owned()),
        }
    );
}

#[rstest]
fn changed_part_count_restarts_assembly(mut assembler: FileAssembler) {
    assembler.accept(part("A.TXT", STAMP, 1, 2));
    let outcome = assembler.accept(part("A.TXT", STAMP, 1, 3));

    assert_eq!(
        outcome,
        AcceptOutcome::Pending {
            received: 1,
            total: 3,
            abandoned: Some(STAMP.to_owned()),
        }
    );
}

#[rstest]
fn filler_is_discarded_without_updating_registry(mut assembler: FileAssembler) {
    assembler.accept(part(DEFAULT_FILLER, STAMP, 1, 2));
    let outcome = assembler.accept(part(DEFAULT_FILLER, STAMP, 2, 2));

    assert_eq!(outcome, AcceptOutcome::Filler);
    assert_eq!(assembler.last_delivered(DEFAULT_FILLER), None);
    assert_eq!(assembler.in_flight_len(), 0);

    // The same version keeps being accepted because it was never delivered.
    assert_eq!(
        assembler.accept(part(DEFAULT_FILLER, STAMP, 1, 1)),
        AcceptOutcome::Filler
    );
}

#[test]
fn custom_filler_names_replace_default() {
    let mut assembler = FileAssembler::new(AssemblyConfig::default().filler_names(["PAD.TXT"]));

    assert_eq!(
        assembler.accept(part("PAD.TXT", STAMP, 1, 1)),
        AcceptOutcome::Filler
    );
    expect_completed(assembler.accept(part(DEFAULT_FILLER, STAMP, 1, 1)));
}

#[rstest]
fn per_file_scope_keeps_interleaved_files_independent(mut assembler: FileAssembler) {
    assembler.accept(part("A.TXT", STAMP, 1, 2));
    assembler.accept(part("B.TXT", STAMP, 1, 2));
    assert_eq!(assembler.in_flight_len(), 2);

    let a = expect_completed(assembler.accept(part("A.TXT", STAMP, 2, 2)));
    let b = expect_completed(assembler.accept(part("B.TXT", STAMP, 2, 2)));
    assert_eq!(a.filename(), "A.TXT");
    assert_eq!(b.filename(), "B.TXT");
}

#[test]
fn single_file_scope_resets_other_assemblies() {
    let mut assembler =
        FileAssembler::new(AssemblyConfig::default().scope(AssemblyScope::SingleFile));
    assembler.accept(part("A.TXT", STAMP, 1, 2));
    assembler.accept(part("B.TXT", STAMP, 1, 2));

    assert_eq!(assembler.in_flight_len(), 1);
    assert_eq!(assembler.in_flight("A.TXT"), None);

    // Continuing the active file does not reset it.
    expect_completed(assembler.accept(part("B.TXT", STAMP, 2, 2)));
    assert_eq!(
        assembler.accept(part("A.TXT", STAMP, 2, 2)),
        AcceptOutcome::Pending {
            received: 1,
            total: 2,
            abandoned: None,
        }
    );
}
