//! Tracing layer that persists events to the log store

use super::record::{ExtraMap, ExtraValue, LogLevel, NewRecord};
use super::writer::AsyncWriter;
use super::STORE_TARGET;
use chrono::Utc;
use std::error::Error;
use std::fmt::{self, Write as _};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::{layer::Context, registry::LookupSpan, Layer};

/// Custom tracing layer that writes events to the log store
///
/// Events emitted by the store itself are ignored so a failing store cannot
/// feed its own diagnostics back into the write path.
pub struct StoreLayer {
    writer: AsyncWriter,
}

impl StoreLayer {
    pub fn new(writer: AsyncWriter) -> Self {
        Self { writer }
    }
}

impl<S> Layer<S> for StoreLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().starts_with(STORE_TARGET) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let logger_name = metadata.target().replace("::", ".");
        let mut record = NewRecord::new(
            LogLevel::from(metadata.level()),
            logger_name,
            visitor.message.unwrap_or_default(),
        )
        .at(Utc::now());
        record.module = metadata.module_path().map(str::to_string);
        record.line_number = metadata.line();
        record.exception = visitor.exception;
        record.extra = visitor.fields;

        self.writer.write(record);
    }
}

/// Visitor to extract fields from an event
#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    exception: Option<String>,
    fields: ExtraMap,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: ExtraValue) {
        match field.name() {
            "message" => {
                self.message = Some(match value {
                    ExtraValue::Text(text) => text,
                    other => format!("{other:?}"),
                })
            }
            "exception" => {
                if let ExtraValue::Text(text) = value {
                    self.exception = Some(text);
                }
            }
            name => {
                self.fields.insert(name.to_string(), value);
            }
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, ExtraValue::Text(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, ExtraValue::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, ExtraValue::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, ExtraValue::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, ExtraValue::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, ExtraValue::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        let trace = format_error_chain(value);
        self.fields
            .insert(field.name().to_string(), ExtraValue::Text(value.to_string()));
        self.exception = Some(match self.exception.take() {
            Some(existing) => format!("{existing}\n{trace}"),
            None => trace,
        });
    }
}

/// Render an error and its sources, one per line
fn format_error_chain(error: &(dyn Error + 'static)) -> String {
    let mut trace = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(trace, "\nCaused by: {cause}");
        source = cause.source();
    }
    trace
}
