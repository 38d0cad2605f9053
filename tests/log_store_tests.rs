/// Integration tests for the log store: write path, retrieval, export and maintenance
use chrono::{Duration, Utc};
use logbook::error::StoreError;
use logbook::store::{
    AsyncWriter, LogFilter, LogLevel, LogRecord, LogStore, NewRecord, RecordSink, StoreOptions,
};
use std::collections::HashSet;
use std::sync::Arc;

async fn open_sink(min_level: LogLevel) -> (tempfile::TempDir, RecordSink) {
    let dir = tempfile::tempdir().unwrap();
    let store = LogStore::open(&StoreOptions::new(dir.path().join("logs.db")))
        .await
        .unwrap();
    (dir, RecordSink::new(Arc::new(store), min_level))
}

async fn emit_id(sink: &RecordSink, record: NewRecord) -> i64 {
    sink.try_emit(record).await.unwrap().unwrap()
}

#[tokio::test]
async fn test_ids_strictly_increase() {
    let (_dir, sink) = open_sink(LogLevel::Debug).await;

    let mut previous = 0;
    for i in 0..20 {
        let id = emit_id(&sink, NewRecord::new(LogLevel::Info, "app", format!("m{i}"))).await;
        assert!(id > previous, "id {id} not greater than {previous}");
        previous = id;
    }
}

#[tokio::test]
async fn test_default_query_is_most_recent_first() {
    let (_dir, sink) = open_sink(LogLevel::Debug).await;
    let base = Utc::now() - Duration::hours(1);

    // Emitted out of chronological order on purpose
    for offset in [5, 1, 9, 3, 7] {
        let record = NewRecord::new(LogLevel::Info, "app", format!("t+{offset}"))
            .at(base + Duration::minutes(offset));
        sink.emit(record).await;
    }

    let logs = sink.store().query(&LogFilter::default()).await.unwrap();

    assert_eq!(logs.len(), 5);
    assert_eq!(logs[0].message, "t+9");
    assert!(logs.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
}

#[tokio::test]
async fn test_level_filter_returns_only_requested_levels() {
    let (_dir, sink) = open_sink(LogLevel::Debug).await;
    for (i, level) in LogLevel::ALL.iter().cycle().take(15).enumerate() {
        sink.emit(NewRecord::new(*level, "app", format!("m{i}"))).await;
    }

    let logs = sink
        .store()
        .query(&LogFilter::new().levels([LogLevel::Error, LogLevel::Critical]))
        .await
        .unwrap();

    assert_eq!(logs.len(), 6);
    assert!(logs
        .iter()
        .all(|l| matches!(l.level, LogLevel::Error | LogLevel::Critical)));
}

#[tokio::test]
async fn test_search_matches_at_message_boundaries() {
    let (_dir, sink) = open_sink(LogLevel::Debug).await;
    for message in ["Xstart", "endX", "mid X mid", "X", "no match", "lower x"] {
        sink.emit(NewRecord::new(LogLevel::Info, "app", message)).await;
    }

    let found: HashSet<String> = sink
        .store()
        .search("X", 100)
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.message)
        .collect();

    let expected: HashSet<String> = ["Xstart", "endX", "mid X mid", "X"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(found, expected);
}

#[tokio::test]
async fn test_stats_total_tracks_emits_and_deletes() {
    let (_dir, sink) = open_sink(LogLevel::Debug).await;
    let store = sink.store().clone();

    for i in 0..3 {
        let record = NewRecord::new(LogLevel::Info, "app", format!("old{i}"))
            .at(Utc::now() - Duration::days(40));
        sink.emit(record).await;
    }
    for i in 0..4 {
        sink.emit(NewRecord::new(LogLevel::Warning, "app", format!("new{i}"))).await;
    }
    assert_eq!(store.stats().await.unwrap().total_count, 7);

    assert_eq!(store.delete_older_than(30).await.unwrap(), 3);
    assert_eq!(store.stats().await.unwrap().total_count, 4);

    sink.emit(NewRecord::new(LogLevel::Error, "app", "after")).await;
    assert_eq!(store.stats().await.unwrap().total_count, 5);
}

#[tokio::test]
async fn test_delete_older_than_zero_empties_store() {
    let (_dir, sink) = open_sink(LogLevel::Debug).await;
    for i in 0..8 {
        sink.emit(NewRecord::new(LogLevel::Info, "app", format!("m{i}"))).await;
    }
    let before = sink.store().stats().await.unwrap().total_count;

    let deleted = sink.store().delete_older_than(0).await.unwrap();

    assert_eq!(deleted, before);
    assert!(sink.store().query(&LogFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_json_export_round_trips_query_results() {
    let (_dir, sink) = open_sink(LogLevel::Debug).await;
    sink.emit(
        NewRecord::new(LogLevel::Error, "rag.server", "Tool failed")
            .module("server")
            .function("call_tool")
            .line(42)
            .exception("Traceback:\n  ValueError: bad")
            .extra("attempt", 2)
            .extra("ratio", 0.5)
            .extra("tool", "search"),
    )
    .await;
    sink.emit(NewRecord::new(LogLevel::Info, "", "root logger")).await;
    sink.emit(NewRecord::new(LogLevel::Debug, "rag.parser", "parsed")).await;

    for filter in [
        LogFilter::default(),
        LogFilter::new().levels([LogLevel::Error]),
        LogFilter::new().oldest_first().limit(2),
    ] {
        let queried = sink.store().query(&filter).await.unwrap();
        let json = sink.store().export_json(&filter).await.unwrap();
        let parsed: Vec<LogRecord> = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, queried);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_emits_all_persist() {
    let (_dir, sink) = open_sink(LogLevel::Debug).await;
    let sink = Arc::new(sink);

    let mut handles = Vec::new();
    for caller in 0..10 {
        let sink = sink.clone();
        handles.push(tokio::spawn(async move {
            let mut ids = Vec::new();
            for i in 0..10 {
                let record =
                    NewRecord::new(LogLevel::Info, format!("caller{caller}"), format!("m{i}"));
                ids.push(sink.try_emit(record).await.unwrap().unwrap());
            }
            ids
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.extend(handle.await.unwrap());
    }

    assert_eq!(ids.len(), 100);
    let stats = sink.store().stats().await.unwrap();
    assert_eq!(stats.total_count, 100);
    assert_eq!(stats.counts_by_logger.len(), 10);
    assert!(stats.counts_by_logger.iter().all(|c| c.count == 10));
}

#[tokio::test]
async fn test_error_with_trace_scenario() {
    let (_dir, sink) = open_sink(LogLevel::Debug).await;
    sink.emit(NewRecord::new(LogLevel::Debug, "app", "starting")).await;
    sink.emit(NewRecord::new(LogLevel::Info, "app", "ready")).await;
    sink.emit(
        NewRecord::new(LogLevel::Error, "app", "boom")
            .exception("Error: boom\nCaused by:\n    connection reset"),
    )
    .await;

    let errors = sink
        .store()
        .query(&LogFilter::new().levels([LogLevel::Error]))
        .await
        .unwrap();

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "boom");
    assert!(errors[0].exception.as_deref().unwrap().contains("connection reset"));
    assert_eq!(
        sink.store().stats().await.unwrap().level_count(LogLevel::Error),
        1
    );
}

#[tokio::test]
async fn test_min_level_drops_quiet_records() {
    let (_dir, sink) = open_sink(LogLevel::Warning).await;

    assert_eq!(
        sink.try_emit(NewRecord::new(LogLevel::Info, "app", "quiet")).await.unwrap(),
        None
    );
    sink.emit(NewRecord::new(LogLevel::Error, "app", "loud")).await;

    assert_eq!(sink.store().stats().await.unwrap().total_count, 1);
}

#[tokio::test]
async fn test_async_writer_from_plain_threads() {
    let (_dir, sink) = open_sink(LogLevel::Debug).await;
    let store = sink.store().clone();
    let writer = AsyncWriter::spawn(sink);

    let threads: Vec<_> = (0..3)
        .map(|t| {
            let writer = writer.clone();
            std::thread::spawn(move || {
                for i in 0..5 {
                    writer.write(NewRecord::new(LogLevel::Info, "worker", format!("{t}-{i}")));
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }
    writer.flush().await;

    assert_eq!(store.stats().await.unwrap().total_count, 15);
}

#[tokio::test]
async fn test_reopen_preserves_records() {
    let dir = tempfile::tempdir().unwrap();
    let options = StoreOptions::new(dir.path().join("nested").join("logs.db"));

    let store = LogStore::open(&options).await.unwrap();
    let sink = RecordSink::new(Arc::new(store), LogLevel::Debug);
    let id = emit_id(&sink, NewRecord::new(LogLevel::Info, "app", "persisted")).await;
    sink.store().close().await;

    let reopened = LogStore::open(&options).await.unwrap();
    let log = reopened.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(log.message, "persisted");
    assert!(reopened.get_by_id(id + 1).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unavailable_store_surfaces_errors() {
    let (_dir, sink) = open_sink(LogLevel::Debug).await;
    sink.emit(NewRecord::new(LogLevel::Info, "app", "before close")).await;
    let store = sink.store().clone();
    store.close().await;

    let query = store.query(&LogFilter::default()).await;
    assert!(matches!(query, Err(StoreError::Unavailable(_))), "{query:?}");

    let stats = store.stats().await;
    assert!(matches!(stats, Err(StoreError::Unavailable(_))), "{stats:?}");

    let search = store.search("before", 10).await;
    assert!(matches!(search, Err(StoreError::Unavailable(_))), "{search:?}");

    let deleted = store.delete_all().await;
    assert!(matches!(deleted, Err(StoreError::Unavailable(_))), "{deleted:?}");

    let aged = store.delete_older_than(0).await;
    assert!(matches!(aged, Err(ref e) if e.is_unavailable()), "{aged:?}");

    let export = store.export_csv(&LogFilter::default()).await;
    assert!(matches!(export, Err(StoreError::Unavailable(_))), "{export:?}");
}
