//! Tests for the consumer pipeline.

use bytes::Bytes;
use rstest::{fixture, rstest};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::{
    assembler::DEFAULT_FILLER,
    codec::SENTINEL,
    mask::normalize,
    test_helpers::{
        FailingSink,
        RecordingSink,
        corrupt_payload,
        frame_bytes,
        payload_of,
        stream_of,
        to_wire,
    },
};

const STAMP: &str = "2024-01-01 00:00";

#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
#[fixture]
fn pipeline() -> Pipeline<RecordingSink> {
    Pipeline::new(
        FrameExtractor::default(),
        FileAssembler::default(),
        RecordingSink::default(),
    )
}

fn three_part_file(name: &str) -> Vec<Bytes> {
    (1..=3)
        .map(|part| frame_bytes(name, STAMP, part, 3, &payload_of(part as u8)))
        .collect()
}

#[rstest]
#[tokio::test]
async fn delivers_file_from_stream(mut pipeline: Pipeline<RecordingSink>) {
    let stream = stream_of(&three_part_file("ZFPALL.TXT"));

    pipeline.process_chunk(&stream).await;

    let files = pipeline.sink().files();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].filename(), "ZFPALL.TXT");
    assert_eq!(files[0].len(), 3 * 1024);
    assert_eq!(
        pipeline.stats(),
        PipelineStats {
            frames: 3,
            delivered: 1,
            ..PipelineStats::default()
        }
    );
}

#[rstest]
#[tokio::test]
async fn corrupted_frame_never_reaches_assembler(mut pipeline: Pipeline<RecordingSink>) {
    let mut frames = three_part_file("A.TXT");
    frames[1] = corrupt_payload(&frames[1]);

    pipeline.process_chunk(&stream_of(&frames)).await;

    assert!(pipeline.sink().files().is_empty());
    assert_eq!(pipeline.stats().rejected, 1);
    assert_eq!(pipeline.assembler().in_flight("A.TXT"), Some((STAMP, 2, 3)));

    // The buffered closing sentinel opens the retransmitted part.
    let retransmit = frame_bytes("A.TXT", STAMP, 2, 3, &payload_of(2));
    pipeline
        .process_chunk(&stream_of([&retransmit])[SENTINEL.len()..])
        .await;
    assert_eq!(pipeline.sink().files().len(), 1);
    assert_eq!(pipeline.stats().rejected, 1);
}

#[rstest]
#[tokio::test]
async fn stale_retransmission_is_not_redelivered(mut pipeline: Pipeline<RecordingSink>) {
    let frames = three_part_file("A.TXT");
    let stream = stream_of(frames.iter().chain(&frames));

    pipeline.process_chunk(&stream).await;

    assert_eq!(pipeline.sink().files().len(), 1);
    assert_eq!(pipeline.stats().stale, 3);
}

#[rstest]
#[tokio::test]
async fn filler_files_are_counted_not_delivered(mut pipeline: Pipeline<RecordingSink>) {
    let filler = frame_bytes(DEFAULT_FILLER, STAMP, 1, 1, &payload_of(0x20));

    pipeline.process_chunk(&stream_of([&filler])).await;

    assert!(pipeline.sink().files().is_empty());
    assert_eq!(pipeline.stats().filler, 1);
}

#[tokio::test]
async fn write_failures_are_counted_and_not_retried() {
    let mut pipeline = Pipeline::new(
        FrameExtractor::default(),
        FileAssembler::default(),
        FailingSink,
    );
    let frame = frame_bytes("A.TXT", STAMP, 1, 1, &payload_of(1));

    pipeline.process_chunk(&stream_of([&frame])).await;

    assert_eq!(pipeline.stats().write_errors, 1);
    assert_eq!(pipeline.stats().delivered, 0);
    assert_eq!(pipeline.assembler().last_delivered("A.TXT"), Some(STAMP));
}

#[rstest]
#[tokio::test]
async fn replays_masked_capture_including_final_frame(mut pipeline: Pipeline<RecordingSink>) {
    let clear: Vec<u8> = three_part_file("A.TXT")
        .iter()
        .flat_map(|frame| frame.to_vec())
        .collect();
    let capture = to_wire(&clear);

    pipeline
        .replay(capture.as_slice())
        .await
        .expect("replay capture");

    let files = pipeline.sink().files();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].content().len(), 3 * 1024);
}

#[rstest]
#[tokio::test]
async fn consumer_drains_queue_until_closed(pipeline: Pipeline<RecordingSink>) {
    let wire = to_wire(&stream_of(&three_part_file("A.TXT")));
    let (tx, rx) = mpsc::channel(2);
    let consumer = tokio::spawn(run_consumer(rx, pipeline, CancellationToken::new()));

    for chunk in wire.chunks(500) {
        tx.send(normalize(chunk)).await.expect("queue open");
    }
    drop(tx);

    let pipeline = consumer.await.expect("consumer task");
    assert_eq!(pipeline.sink().files().len(), 1);
    assert_eq!(pipeline.extractor().buffered_len(), 3);
}

#[rstest]
#[tokio::test]
async fn unreachable_part_counts_hold_no_state(mut pipeline: Pipeline<RecordingSink>) {
    let frames: Vec<_> = (0..50)
        .map(|n| frame_bytes(&format!("F{n}.TXT"), STAMP, 1, 999_999, &payload_of(1)))
        .collect();

    pipeline.process_chunk(&stream_of(&frames)).await;

    assert_eq!(pipeline.stats().rejected, 50);
    assert_eq!(pipeline.assembler().in_flight_len(), 0);
}
