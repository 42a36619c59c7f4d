// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::event::Mutation;
use crate::memory::{MemoryBackend, MemoryLogger};
use proptest::prelude::*;

fn history() -> Vec<Event> {
    vec![
        Mutation::put("a", "1").sequenced(1),
        Mutation::put("b", "2").sequenced(2),
        Mutation::delete("a").sequenced(3),
    ]
}

#[tokio::test]
async fn replay_of_empty_log_starts_logger() {
    let backend = MemoryBackend::new();
    let mut logger = MemoryLogger::new(backend.clone());
    let table = Table::new();

    let summary = replay(&mut logger, &table).await.unwrap();
    assert_eq!(summary, ReplaySummary::default());
    assert!(table.is_empty());

    logger.write_put("a", "1").await.unwrap();
    logger.close().await.unwrap();
    assert_eq!(backend.len(), 1);
}

#[tokio::test]
async fn replay_applies_events_in_order() {
    let mut logger = MemoryLogger::new(MemoryBackend::with_events(history()));
    let table = Table::new();

    let summary = replay(&mut logger, &table).await.unwrap();
    assert_eq!(summary.events, 3);
    assert_eq!(summary.last_sequence, Some(3));
    assert_eq!(table.get("b").unwrap(), "2");
    assert_eq!(
        table.get("a").unwrap_err(),
        TableError::NoSuchKey("a".to_string())
    );
    logger.close().await.unwrap();
}

#[tokio::test]
async fn last_put_wins() {
    let events = vec![
        Mutation::put("k", "v1").sequenced(1),
        Mutation::put("k", "v2").sequenced(2),
    ];
    let mut logger = MemoryLogger::new(MemoryBackend::with_events(events));
    let table = Table::new();

    replay(&mut logger, &table).await.unwrap();
    assert_eq!(table.get("k").unwrap(), "v2");
    logger.close().await.unwrap();
}

#[tokio::test]
async fn read_error_is_fatal_but_logger_still_runs() {
    let backend = MemoryBackend::with_events(history()).fail_replay_after(2);
    let mut logger = MemoryLogger::new(backend.clone());
    let table = Table::new();

    let err = replay(&mut logger, &table).await.unwrap_err();
    assert!(matches!(err, ReplayError::Log(LogError::Corrupted { line: 3, .. })));

    // Events before the break were applied
    assert_eq!(table.get("a").unwrap(), "1");
    assert_eq!(table.get("b").unwrap(), "2");

    // run() was still called
    assert!(matches!(logger.run(), Err(LogError::AlreadyRunning)));
    logger.close().await.unwrap();
}

#[tokio::test]
async fn table_error_names_the_event() {
    let events = vec![
        Mutation::put("a", "1").sequenced(1),
        Mutation::put("", "bad").sequenced(2),
    ];
    let mut logger = MemoryLogger::new(MemoryBackend::with_events(events));
    let table = Table::new();

    let err = replay(&mut logger, &table).await.unwrap_err();
    assert!(matches!(
        err,
        ReplayError::Table {
            sequence: 2,
            source: TableError::EmptyKey
        }
    ));
    logger.close().await.unwrap();
}

#[tokio::test]
async fn replay_through_trait_object() {
    let mut logger: Box<dyn TransactionLogger> =
        Box::new(MemoryLogger::new(MemoryBackend::with_events(history())));
    let table = Table::new();

    replay(logger.as_mut(), &table).await.unwrap();
    assert_eq!(logger.backend(), "memory");
    assert_eq!(table.len(), 1);
    logger.close().await.unwrap();
}

#[tokio::test]
async fn restart_sees_previous_session() {
    let backend = MemoryBackend::new();

    {
        let mut logger = MemoryLogger::new(backend.clone());
        replay(&mut logger, &Table::new()).await.unwrap();
        logger.write_put("a", "1").await.unwrap();
        logger.write_put("b", "2").await.unwrap();
        logger.write_delete("a").await.unwrap();
        logger.close().await.unwrap();
    }

    let mut logger = MemoryLogger::new(backend.clone());
    let table = Table::new();
    let summary = replay(&mut logger, &table).await.unwrap();
    assert_eq!(summary.last_sequence, Some(3));
    assert_eq!(table.snapshot().into_iter().collect::<Vec<_>>(), vec![(
        "b".to_string(),
        "2".to_string()
    )]);
    logger.close().await.unwrap();
}

#[derive(Debug, Clone)]
enum Op {
    Put(String, String),
    Delete(String),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let key = "[a-d]";
    prop_oneof![
        (key, "[a-z0-9]{0,4}").prop_map(|(k, v)| Op::Put(k, v)),
        key.prop_map(Op::Delete),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn replay_matches_direct_application(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let direct = Table::new();
            let backend = MemoryBackend::new();

            let mut logger = MemoryLogger::with_capacity(backend.clone(), 4);
            logger.run().unwrap();
            for op in &ops {
                match op {
                    Op::Put(k, v) => {
                        direct.put(k, v).unwrap();
                        logger.write_put(k, v).await.unwrap();
                    }
                    Op::Delete(k) => {
                        direct.delete(k).unwrap();
                        logger.write_delete(k).await.unwrap();
                    }
                }
            }
            logger.close().await.unwrap();

            let replayed = Table::new();
            let mut restarted = MemoryLogger::new(backend.clone());
            let summary = replay(&mut restarted, &replayed).await.unwrap();
            restarted.close().await.unwrap();

            assert_eq!(summary.events, ops.len() as u64);
            assert_eq!(replayed.snapshot(), direct.snapshot());
        });
    }
}
