#![cfg(feature = "metrics")]
//! Metrics recorded by the receive path.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` installed as a local
//! recorder around a current-thread runtime.

use std::future::Future;

use byteblaster::{
    FileAssembler,
    FrameExtractor,
    Pipeline,
    metrics::{FILES_DELIVERED, FRAMES_TOTAL, IN_FLIGHT_FILES, RECONNECTS, WRITE_ERRORS},
};
use byteblaster_testing::{
    CounterSnapshot,
    FailingSink,
    RecordingSink,
    corrupt_payload,
    debugging_recorder_setup,
    frame_bytes,
    payload_of,
    stream_of,
};
use metrics_util::debugging::DebugValue;
use rstest::rstest;

const STAMP: &str = "2024-05-01 12:00";

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build test runtime")
        .block_on(future)
}

#[test]
fn frame_outcomes_are_labelled() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let good = frame_bytes("A.TXT", STAMP, 1, 1, &payload_of(1));
    let stream = stream_of([&corrupt_payload(&good), &good, &good]);

    metrics::with_local_recorder(&recorder, || {
        block_on(async {
            let mut pipeline = Pipeline::new(
                FrameExtractor::default(),
                FileAssembler::default(),
                RecordingSink::default(),
            );
            pipeline.process_chunk(&stream).await;
        });
    });

    let counters = CounterSnapshot::take(&snapshotter);
    assert_eq!(counters.value(FRAMES_TOTAL, None), 3);
    assert_eq!(counters.value(FRAMES_TOTAL, Some(("outcome", "accepted"))), 1);
    assert_eq!(counters.value(FRAMES_TOTAL, Some(("outcome", "checksum"))), 1);
    assert_eq!(counters.value(FRAMES_TOTAL, Some(("outcome", "stale"))), 1);
    assert_eq!(counters.value(FILES_DELIVERED, None), 1);
}

#[test]
fn write_errors_are_counted() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let frame = frame_bytes("A.TXT", STAMP, 1, 1, &payload_of(1));

    metrics::with_local_recorder(&recorder, || {
        block_on(async {
            let mut pipeline = Pipeline::new(
                FrameExtractor::default(),
                FileAssembler::default(),
                FailingSink,
            );
            pipeline.process_chunk(&stream_of([&frame])).await;
        });
    });

    let counters = CounterSnapshot::take(&snapshotter);
    assert_eq!(counters.value(WRITE_ERRORS, None), 1);
    assert_eq!(counters.value(FILES_DELIVERED, None), 0);
}

#[test]
fn in_flight_gauge_tracks_partial_files() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let partial = frame_bytes("A.TXT", STAMP, 1, 2, &payload_of(1));

    metrics::with_local_recorder(&recorder, || {
        block_on(async {
            let mut pipeline = Pipeline::new(
                FrameExtractor::default(),
                FileAssembler::default(),
                RecordingSink::default(),
            );
            pipeline.process_chunk(&stream_of([&partial])).await;
        });
    });

    let gauge = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .find(|(key, _, _, _)| key.key().name() == IN_FLIGHT_FILES)
        .map(|(_, _, _, value)| value);
    assert!(matches!(
        gauge,
        Some(DebugValue::Gauge(g)) if (g.into_inner() - 1.0).abs() < f64::EPSILON
    ));
}

#[rstest]
#[case(1)]
#[case(3)]
fn reconnects_are_counted(#[case] expected: u64) {
    let (snapshotter, recorder) = debugging_recorder_setup();

    metrics::with_local_recorder(&recorder, || {
        (0..expected).for_each(|_| byteblaster::metrics::inc_reconnects());
    });

    assert_eq!(CounterSnapshot::take(&snapshotter).value(RECONNECTS, None), expected);
}
