//! Shutdown and bridge loop integration tests
//!
//! Exit is never real here: `RecordingExit` or a closure stands in for
//! `StdProcessExit`, so each test can assert on the exact exit sequence.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use common::{RecordingExit, SENSOR_SCRIPT, TEST_CLOSE_TIMEOUT};
use thermobridge_connectors::{
    bridge, MemoryChannel, SerialChannel, SerialTemperatureReader, ShutdownCoordinator,
    ShutdownState, TemperatureAccessory, TerminationEvent, TerminationEvents, TerminationSource,
};

/// Source that has already ended
struct EndedSource;

#[async_trait::async_trait]
impl TerminationSource for EndedSource {
    async fn next_event(&mut self) -> Option<TerminationEvent> {
        None
    }
}

#[tokio::test]
async fn close_happens_once_before_exit() {
    let mut channel = MemoryChannel::new("/dev/ttyACM0");
    let counter = channel.close_counter();

    // Record how many closes had happened at the moment exit was invoked
    let seen = Arc::new(Mutex::new(Vec::new()));
    let exit = {
        let seen = Arc::clone(&seen);
        move |code: i32| seen.lock().unwrap().push((code, counter.load(Ordering::SeqCst)))
    };

    let mut coordinator = ShutdownCoordinator::new(exit);
    let code = coordinator
        .shutdown(&TerminationEvent::Signal("SIGTERM"), &mut channel)
        .await;

    assert_eq!(code, Some(1));
    assert_eq!(*seen.lock().unwrap(), vec![(1, 1)]);
    assert_eq!(channel.close_count(), 1);
    assert!(!channel.is_open());
    assert_eq!(coordinator.state(), ShutdownState::Exited(1));
}

#[tokio::test]
async fn closed_channel_is_not_closed_again() {
    let mut channel = MemoryChannel::new("mem").closed();
    let exit = RecordingExit::new();
    let mut coordinator = ShutdownCoordinator::new(exit.clone());

    let code = coordinator
        .shutdown(&TerminationEvent::ExitCode(0), &mut channel)
        .await;

    assert_eq!(code, Some(0));
    assert_eq!(channel.close_count(), 0);
    assert_eq!(exit.codes(), vec![0]);
}

#[tokio::test]
async fn failed_close_still_exits() {
    let mut channel = MemoryChannel::new("mem").failing_close("device unplugged");
    let exit = RecordingExit::new();
    let mut coordinator = ShutdownCoordinator::new(exit.clone());

    coordinator
        .shutdown(&TerminationEvent::Error("fatal".into()), &mut channel)
        .await;

    assert_eq!(channel.close_count(), 1);
    assert_eq!(exit.codes(), vec![1]);
    assert_eq!(channel.stats().last_error.as_deref(), Some("device unplugged"));
}

#[tokio::test]
async fn hanging_close_times_out_and_exits() {
    let mut channel = MemoryChannel::new("mem").hanging_close();
    let exit = RecordingExit::new();
    let mut coordinator =
        ShutdownCoordinator::new(exit.clone()).with_close_timeout(TEST_CLOSE_TIMEOUT);

    let started = Instant::now();
    let code = coordinator
        .shutdown(&TerminationEvent::ExitCode(3), &mut channel)
        .await;

    assert_eq!(code, Some(3));
    assert!(started.elapsed() >= TEST_CLOSE_TIMEOUT);
    assert_eq!(exit.codes(), vec![3]);
}

#[tokio::test]
async fn second_event_is_ignored() {
    let mut channel = MemoryChannel::new("mem");
    let exit = RecordingExit::new();
    let mut coordinator = ShutdownCoordinator::new(exit.clone());

    let first = coordinator
        .shutdown(&TerminationEvent::Signal("SIGINT"), &mut channel)
        .await;
    let second = coordinator
        .shutdown(&TerminationEvent::ExitCode(0), &mut channel)
        .await;

    assert_eq!(first, Some(1));
    assert_eq!(second, None);
    assert_eq!(exit.codes(), vec![1]);
    assert_eq!(channel.close_count(), 1);
}

#[tokio::test]
async fn exit_codes_follow_the_event() {
    let cases = [
        (TerminationEvent::Signal("SIGTERM"), 1),
        (TerminationEvent::Signal("SIGHUP"), 1),
        (TerminationEvent::ExitCode(0), 0),
        (TerminationEvent::ExitCode(3), 3),
        (TerminationEvent::from_payload(""), 1),
    ];

    for (event, expected) in cases {
        let mut channel = MemoryChannel::new("mem");
        let exit = RecordingExit::new();
        let mut coordinator = ShutdownCoordinator::new(exit.clone());

        coordinator.shutdown(&event, &mut channel).await;
        assert_eq!(exit.codes(), vec![expected], "event {:?}", event);
    }
}

#[tokio::test]
async fn bridge_ingests_then_exits_on_request() {
    let channel = MemoryChannel::new("/dev/ttyACM0").with_chunks(SENSOR_SCRIPT);
    let closes = channel.close_counter();
    let mut reader = SerialTemperatureReader::new(channel);
    let accessory = TemperatureAccessory::new("Study", reader.cache());

    let mut termination = TerminationEvents::new();
    let sender = termination.sender();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        sender.request_exit(3);
    });

    let exit = RecordingExit::new();
    let mut coordinator = ShutdownCoordinator::new(exit.clone());
    let code = bridge::run(&mut reader, &mut termination, &mut coordinator).await;

    assert_eq!(code, 3);
    assert_eq!(exit.codes(), vec![3]);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert!(reader.is_link_lost());
    assert_eq!(accessory.current_temperature(), 19.9);
}

#[tokio::test]
async fn bridge_exits_while_serial_is_idle() {
    let channel = MemoryChannel::new("mem")
        .with_chunk("21.5\n")
        .idle_when_drained();
    let mut reader = SerialTemperatureReader::new(channel);

    let mut termination = TerminationEvents::new();
    let sender = termination.sender();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        sender.send(TerminationEvent::Signal("SIGTERM"));
    });

    let exit = RecordingExit::new();
    let mut coordinator = ShutdownCoordinator::new(exit.clone());
    let code = bridge::run(&mut reader, &mut termination, &mut coordinator).await;

    assert_eq!(code, 1);
    assert!(!reader.is_link_lost());
    assert_eq!(reader.current().value(), 21.5);
    assert_eq!(reader.channel().close_count(), 1);
}

#[tokio::test]
async fn bridge_exits_with_error_when_source_ends() {
    let channel = MemoryChannel::new("mem").idle_when_drained();
    let mut reader = SerialTemperatureReader::new(channel);
    let calls = Arc::new(AtomicUsize::new(0));

    let exit = {
        let calls = Arc::clone(&calls);
        move |_code: i32| {
            calls.fetch_add(1, Ordering::SeqCst);
        }
    };
    let mut coordinator = ShutdownCoordinator::new(exit);
    let code = bridge::run(&mut reader, &mut EndedSource, &mut coordinator).await;

    assert_eq!(code, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(reader.channel().close_count(), 1);
}
