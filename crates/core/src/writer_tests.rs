// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::event::EventKind;
use crate::memory::{MemoryBackend, MemoryLogger};
use std::sync::Arc;
use std::time::Duration;

async fn collect(stream: EventStream) -> (Vec<Event>, Option<LogError>) {
    let EventStream {
        mut events,
        mut errors,
    } = stream;
    let mut out = Vec::new();
    while let Some(event) = events.recv().await {
        out.push(event);
    }
    (out, errors.recv().await)
}

#[tokio::test]
async fn write_before_run_is_rejected() {
    let logger = MemoryLogger::new(MemoryBackend::new());
    let err = logger.write_put("a", "1").await.unwrap_err();
    assert!(matches!(err, LogError::NotRunning));
}

#[tokio::test]
async fn run_twice_is_rejected() {
    let mut logger = MemoryLogger::new(MemoryBackend::new());
    logger.run().unwrap();
    assert!(matches!(logger.run(), Err(LogError::AlreadyRunning)));
    logger.close().await.unwrap();
}

#[tokio::test]
async fn empty_key_is_rejected() {
    let mut logger = MemoryLogger::new(MemoryBackend::new());
    logger.run().unwrap();
    assert!(matches!(
        logger.write_delete("").await,
        Err(LogError::EmptyKey)
    ));
    logger.close().await.unwrap();
}

#[tokio::test]
async fn writes_are_sequenced_in_call_order() {
    let backend = MemoryBackend::new();
    let mut logger = MemoryLogger::new(backend.clone());
    logger.run().unwrap();

    logger.write_put("a", "1").await.unwrap();
    logger.write_put("b", "2").await.unwrap();
    logger.write_delete("a").await.unwrap();
    logger.close().await.unwrap();

    let events = backend.events();
    let sequences: Vec<_> = events.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    assert_eq!(events[2].kind, EventKind::Delete);
    assert_eq!(events[2].key, "a");
    assert!(backend.released());
}

#[tokio::test]
async fn close_waits_for_queue_to_drain() {
    let backend = MemoryBackend::new();
    let mut logger = MemoryLogger::with_capacity(backend.clone(), 8);
    logger.run().unwrap();

    backend.pause();
    for i in 0..5 {
        logger.write_put(&format!("k{}", i), "v").await.unwrap();
    }

    let logger = Arc::new(logger);
    let closing = {
        let logger = Arc::clone(&logger);
        tokio::spawn(async move { logger.close().await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!closing.is_finished());

    backend.resume();
    closing.await.unwrap().unwrap();
    assert_eq!(backend.len(), 5);
}

#[tokio::test]
async fn concurrent_close_waits_for_the_same_drain() {
    let backend = MemoryBackend::new();
    let mut logger = MemoryLogger::with_capacity(backend.clone(), 8);
    logger.run().unwrap();

    backend.pause();
    for i in 0..5 {
        logger.write_put(&format!("k{}", i), "v").await.unwrap();
    }

    let logger = Arc::new(logger);
    let first = {
        let logger = Arc::clone(&logger);
        tokio::spawn(async move { logger.close().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = {
        let logger = Arc::clone(&logger);
        tokio::spawn(async move { logger.close().await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!first.is_finished());
    assert!(!second.is_finished());

    backend.resume();
    second.await.unwrap().unwrap();
    assert_eq!(backend.len(), 5);
    assert!(backend.released());
    first.await.unwrap().unwrap();
}

#[tokio::test]
async fn cancelled_close_still_drains() {
    let backend = MemoryBackend::new();
    let mut logger = MemoryLogger::new(backend.clone());
    logger.run().unwrap();

    backend.pause();
    for i in 0..3 {
        logger.write_put(&format!("k{}", i), "v").await.unwrap();
    }

    let abandoned = tokio::time::timeout(Duration::from_millis(20), logger.close()).await;
    assert!(abandoned.is_err());

    backend.resume();
    logger.close().await.unwrap();
    assert_eq!(backend.len(), 3);
}

#[tokio::test]
async fn full_queue_applies_backpressure() {
    let backend = MemoryBackend::new();
    let mut logger = MemoryLogger::with_capacity(backend.clone(), 1);
    logger.run().unwrap();
    backend.pause();

    logger.write_put("a", "1").await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), logger.write_put("b", "2"))
        .await
        .unwrap()
        .unwrap();

    // One event is held by the paused writer and one fills the queue
    let blocked = tokio::time::timeout(Duration::from_millis(100), logger.write_put("c", "3")).await;
    assert!(blocked.is_err());

    backend.resume();
    logger.write_put("c", "3").await.unwrap();
    logger.close().await.unwrap();

    let keys: Vec<_> = backend.events().into_iter().map(|e| e.key).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn write_failure_poisons_logger() {
    let backend = MemoryBackend::new().fail_writes_after(1);
    let mut logger = MemoryLogger::new(backend.clone());
    let mut errors = logger.err().unwrap();
    logger.run().unwrap();

    logger.write_put("a", "1").await.unwrap();
    let _ = logger.write_put("b", "2").await;

    let first = errors.recv().await.unwrap();
    assert!(matches!(first, LogError::Io(_)));

    // The writer stops taking events once it has failed
    let mut stopped = false;
    for _ in 0..100 {
        match logger.write_put("c", "3").await {
            Err(LogError::WriterStopped) => {
                stopped = true;
                break;
            }
            _ => tokio::time::sleep(Duration::from_millis(10)).await,
        }
    }
    assert!(stopped);

    assert!(matches!(logger.close().await, Err(LogError::Poisoned(_))));
    assert_eq!(backend.len(), 1);
    assert!(!backend.released());
}

#[tokio::test]
async fn later_close_repeats_poisoned_outcome() {
    let backend = MemoryBackend::new().fail_writes_after(0);
    let mut logger = MemoryLogger::new(backend);
    logger.run().unwrap();
    logger.write_put("a", "1").await.unwrap();

    let first = logger.close().await.unwrap_err();
    let second = logger.close().await.unwrap_err();
    match (first, second) {
        (LogError::Poisoned(a), LogError::Poisoned(b)) => assert_eq!(a, b),
        other => panic!("expected two poisoned closes, got {:?}", other),
    }
}

#[tokio::test]
async fn error_receiver_is_handed_out_once() {
    let logger = MemoryLogger::new(MemoryBackend::new());
    assert!(logger.err().is_some());
    assert!(logger.err().is_none());
}

#[tokio::test]
async fn error_channel_closes_after_clean_shutdown() {
    let mut logger = MemoryLogger::new(MemoryBackend::new());
    let mut errors = logger.err().unwrap();
    logger.run().unwrap();
    logger.write_put("a", "1").await.unwrap();
    logger.close().await.unwrap();
    assert!(errors.recv().await.is_none());
}

#[tokio::test]
async fn close_before_run_releases_backend() {
    let backend = MemoryBackend::new();
    let logger = MemoryLogger::new(backend.clone());
    logger.close().await.unwrap();
    assert!(backend.released());
}

#[tokio::test]
async fn close_is_idempotent() {
    let mut logger = MemoryLogger::new(MemoryBackend::new());
    logger.run().unwrap();
    logger.close().await.unwrap();
    logger.close().await.unwrap();
    assert!(matches!(
        logger.write_put("a", "1").await,
        Err(LogError::Closed)
    ));
}

#[tokio::test]
async fn read_events_streams_history_in_order() {
    let history = vec![
        Mutation::put("a", "1").sequenced(1),
        Mutation::put("b", "2").sequenced(2),
        Mutation::delete("a").sequenced(3),
    ];
    let logger = MemoryLogger::new(MemoryBackend::with_events(history.clone()));

    let (events, error) = collect(logger.read_events()).await;
    assert_eq!(events, history);
    assert!(error.is_none());
}

#[tokio::test]
async fn read_events_after_run_reports_error() {
    let mut logger = MemoryLogger::new(MemoryBackend::new());
    logger.run().unwrap();

    let (events, error) = collect(logger.read_events()).await;
    assert!(events.is_empty());
    assert!(matches!(error, Some(LogError::AlreadyRunning)));
    logger.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_producers_keep_their_own_order() {
    let backend = MemoryBackend::new();
    let mut logger = MemoryLogger::with_capacity(backend.clone(), 4);
    logger.run().unwrap();
    let logger = Arc::new(logger);

    let producers: Vec<_> = (0..8)
        .map(|p| {
            let logger = Arc::clone(&logger);
            tokio::spawn(async move {
                for i in 0..25 {
                    logger
                        .write_put(&format!("p{}", p), &i.to_string())
                        .await
                        .unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.await.unwrap();
    }
    logger.close().await.unwrap();

    let events = backend.events();
    assert_eq!(events.len(), 200);
    assert!(events.windows(2).all(|w| w[1].sequence == w[0].sequence + 1));

    for p in 0..8 {
        let key = format!("p{}", p);
        let values: Vec<u32> = events
            .iter()
            .filter(|e| e.key == key)
            .map(|e| e.value.parse().unwrap())
            .collect();
        assert_eq!(values, (0..25).collect::<Vec<_>>());
    }
}
