// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::file::FileSpec;
use crate::test_support::{test_iso, EventSink};
use fil_core::FakeClock;

fn plain_file(iso: &Isolate) -> FileHandle {
    iso.file_new(FileSpec::new(Arc::new(DirDriver))).unwrap()
}

#[test]
fn now_ms_follows_the_clock() {
    let clock = Arc::new(FakeClock::new());
    let iso = Isolate::with_clock(Options::default(), clock.clone());
    assert_eq!(iso.now_ms(), 0);
    clock.advance(Duration::from_millis(1234));
    assert_eq!(iso.now_ms(), 1234);
}

#[test]
fn starts_running_with_a_root() {
    let iso = test_iso();
    assert_eq!(iso.status(), IsoStatus::Running);
    assert_eq!(iso.root().id(), FileId::ROOT);
    assert_eq!(iso.file_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn zero_timer_fires_on_the_next_turn_only() {
    let iso = test_iso();
    let f = plain_file(&iso);
    let sink = EventSink::new();
    sink.attach(&f);

    iso.trigger_timer(&f, 0);
    assert!(sink.is_empty());

    iso.tick();
    assert_eq!(sink.events(), vec![FileEvent::Timer]);
}

#[tokio::test(start_paused = true)]
async fn timers_wait_for_their_deadline() {
    let iso = test_iso();
    let f = plain_file(&iso);
    let sink = EventSink::new();
    sink.attach(&f);

    iso.trigger_timer(&f, 50);
    iso.tick();
    assert!(sink.is_empty());

    tokio::time::advance(Duration::from_millis(50)).await;
    iso.tick();
    assert_eq!(sink.events(), vec![FileEvent::Timer]);
}

#[tokio::test(start_paused = true)]
async fn multiple_timers_on_one_file_all_fire() {
    let iso = test_iso();
    let f = plain_file(&iso);
    let sink = EventSink::new();
    sink.attach(&f);

    iso.trigger_timer(&f, 10);
    iso.trigger_timer(&f, 20);
    tokio::time::advance(Duration::from_millis(20)).await;
    iso.tick();
    assert_eq!(sink.events(), vec![FileEvent::Timer, FileEvent::Timer]);
}

#[tokio::test]
async fn async_trigger_is_delivered_on_tick() {
    let iso = test_iso();
    let f = plain_file(&iso);
    let sink = EventSink::new();
    sink.attach(&f);

    assert!(iso.trigger_async(f.id()));
    assert!(sink.is_empty());
    iso.tick();
    assert_eq!(sink.events(), vec![FileEvent::Async]);
}

#[tokio::test]
async fn async_trigger_for_a_dead_file_is_dropped() {
    let iso = test_iso();
    let f = plain_file(&iso);
    let id = f.id();
    drop(f);

    assert!(iso.trigger_async(id));
    iso.tick();
}

#[tokio::test]
async fn worker_thread_reaches_a_file_through_the_hook() {
    let iso = test_iso();
    let f = plain_file(&iso);
    let sink = EventSink::new();
    sink.attach(&f);

    let id = f.id();
    iso.start_thread(move |hook| {
        assert!(hook.trigger_async(id));
    });

    for _ in 0..200 {
        iso.tick();
        if !sink.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert_eq!(sink.events(), vec![FileEvent::Async]);
}

#[tokio::test]
async fn start_work_runs_completion_on_the_main_loop() {
    let iso = test_iso();
    let seen = Arc::new(Mutex::new(None));

    {
        let seen = Arc::clone(&seen);
        iso.start_work(
            || 6 * 7,
            move |iso, out| {
                *seen.lock() = Some((out, iso.status()));
            },
        );
    }

    for _ in 0..200 {
        iso.tick();
        if seen.lock().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert_eq!(*seen.lock(), Some((42, IsoStatus::Running)));
}

#[tokio::test]
async fn shutdown_notifies_every_live_file() {
    let iso = test_iso();
    let a = plain_file(&iso);
    let b = plain_file(&iso);
    let sink_a = EventSink::new();
    sink_a.attach(&a);
    let sink_b = EventSink::new();
    sink_b.attach(&b);

    iso.shutdown();
    assert_eq!(iso.status(), IsoStatus::Shutdown);
    assert_eq!(sink_a.events(), vec![FileEvent::Shutdown]);
    assert_eq!(sink_b.events(), vec![FileEvent::Shutdown]);
}

#[tokio::test]
async fn run_returns_once_the_isolate_exits() {
    let iso = test_iso();
    let runner = tokio::spawn({
        let iso = iso.clone();
        async move { iso.run().await }
    });
    tokio::task::yield_now().await;
    assert!(!runner.is_finished());

    iso.shutdown();
    runner.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn run_delivers_timers_without_manual_ticks() {
    let iso = test_iso();
    let f = plain_file(&iso);
    let sink = EventSink::new();
    sink.attach(&f);

    let runner = tokio::spawn({
        let iso = iso.clone();
        async move { iso.run().await }
    });

    iso.trigger_timer(&f, 25);
    tokio::time::advance(Duration::from_millis(25)).await;
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
    assert_eq!(sink.events(), vec![FileEvent::Timer]);

    iso.shutdown();
    runner.await.unwrap();
}

#[test]
fn panic_status_is_terminal() {
    let iso = test_iso();
    iso.exit(IsoStatus::Panic);
    iso.exit(IsoStatus::Running);
    assert_eq!(iso.status(), IsoStatus::Panic);
    iso.shutdown();
    assert_eq!(iso.status(), IsoStatus::Panic);
}

#[test]
fn msg_routes_through_the_installed_sink() {
    let iso = test_iso();
    let lines = Arc::new(Mutex::new(Vec::new()));
    {
        let lines = Arc::clone(&lines);
        iso.set_msg_sink(move |text| lines.lock().push(text.to_owned()));
    }
    iso.msg("driver came up");
    iso.msg("driver went down");
    assert_eq!(*lines.lock(), vec!["driver came up", "driver went down"]);
}

#[test]
fn scratch_zero_length_boundary() {
    let iso = test_iso();
    let b = iso.scratch().stack(0).unwrap();
    iso.scratch().unstack(b);
    assert_eq!(iso.scratch().in_use(), 0);
}

#[test]
fn options_deserialize_with_defaults() {
    let opts: Options = serde_json::from_str("{}").unwrap();
    assert_eq!(opts.lock_timeout_ms, crate::lock::DEFAULT_TIMEOUT_MS);
    assert_eq!(opts.scratch_cap, None);

    let opts: Options = serde_json::from_str(r#"{"lock_timeout_ms": 250}"#).unwrap();
    assert_eq!(opts.lock_timeout_ms, 250);
}
