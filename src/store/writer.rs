//! Non-blocking writer handle
//!
//! Lets synchronous code (tracing layers, plain threads) emit records
//! without awaiting. Records travel over an unbounded channel to a
//! background task that feeds them to the sink in arrival order.

use super::record::NewRecord;
use super::sink::RecordSink;
use chrono::Utc;
use tokio::sync::{mpsc, oneshot};

/// Message types for the async writer
#[derive(Debug)]
enum WriterMessage {
    Record(NewRecord),
    Flush(oneshot::Sender<()>),
}

/// Async writer handle
///
/// Cheap to clone and safe to use from any thread. The actual writes happen
/// in a background task.
#[derive(Clone, Debug)]
pub struct AsyncWriter {
    sender: mpsc::UnboundedSender<WriterMessage>,
}

impl AsyncWriter {
    /// Spawn the background writer task on the current tokio runtime
    ///
    /// # Example
    ///
    /// ```ignore
    /// let writer = AsyncWriter::spawn(sink);
    /// writer.write(record);  // Non-blocking
    /// ```
    pub fn spawn(sink: RecordSink) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            writer_task(sink, rx).await;
        });

        Self { sender: tx }
    }

    /// Queue a record (non-blocking)
    ///
    /// Records without a timestamp are stamped here, not when the background
    /// task gets to them. Dropped silently when the writer task has stopped.
    pub fn write(&self, mut record: NewRecord) {
        record.timestamp.get_or_insert_with(Utc::now);
        let _ = self.sender.send(WriterMessage::Record(record));
    }

    /// Wait until every record queued before this call has been handled
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(WriterMessage::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

/// Background writer task
async fn writer_task(sink: RecordSink, mut rx: mpsc::UnboundedReceiver<WriterMessage>) {
    while let Some(msg) = rx.recv().await {
        match msg {
            WriterMessage::Record(record) => sink.emit(record).await,
            WriterMessage::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    tracing::debug!("Log writer task shutting down");
}
