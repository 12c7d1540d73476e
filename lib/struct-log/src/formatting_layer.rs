use serde_json::{Map, Value};
use std::io::Write;
use time::format_description::well_known::Rfc3339;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::storage::FieldStorage;

const TIMESTAMP: &str = "timestamp";
const LEVEL: &str = "level";
const TARGET: &str = "target";
const MESSAGE: &str = "message";
const FILE: &str = "file";
const LINE: &str = "line";
const HOST: &str = "host";
const APPLICATION: &str = "application";
const VERSION: &str = "version";

const RESERVED_FIELDS: [&str; 9] = [
    TIMESTAMP,
    LEVEL,
    TARGET,
    MESSAGE,
    FILE,
    LINE,
    HOST,
    APPLICATION,
    VERSION,
];

/// Emits every event as a single-line JSON object
pub struct JsonLogLayer<W: for<'a> MakeWriter<'a> + 'static> {
    make_writer: W,
    application: String,
    version: String,
    hostname: String,
}

impl<W: for<'a> MakeWriter<'a> + 'static> JsonLogLayer<W> {
    pub fn new(application: String, version: String, make_writer: W) -> Self {
        let hostname = gethostname::gethostname().to_string_lossy().into_owned();
        Self::with_hostname(application, version, hostname, make_writer)
    }

    pub fn with_hostname(
        application: String,
        version: String,
        hostname: String,
        make_writer: W,
    ) -> Self {
        Self {
            make_writer,
            application,
            version,
            hostname,
        }
    }

    fn base_record(&self, event: &Event<'_>, message: &str) -> Map<String, Value> {
        let meta = event.metadata();
        let mut record = Map::new();

        if let Ok(ts) = time::OffsetDateTime::now_utc().format(&Rfc3339) {
            record.insert(TIMESTAMP.into(), Value::String(ts));
        }
        record.insert(LEVEL.into(), meta.level().as_str().to_lowercase().into());
        record.insert(TARGET.into(), meta.target().into());
        record.insert(MESSAGE.into(), message.into());
        record.insert(FILE.into(), meta.file().into());
        record.insert(LINE.into(), meta.line().into());
        record.insert(HOST.into(), self.hostname.clone().into());
        record.insert(APPLICATION.into(), self.application.clone().into());
        record.insert(VERSION.into(), self.version.clone().into());
        record
    }

    fn emit(&self, record: &Map<String, Value>) -> std::io::Result<()> {
        let mut buffer = serde_json::to_vec(record)?;
        buffer.push(b'\n');
        self.make_writer.make_writer().write_all(&buffer)
    }
}

fn merge_fields(record: &mut Map<String, Value>, fields: &Map<String, Value>) {
    for (key, value) in fields {
        if !RESERVED_FIELDS.contains(&key.as_str()) {
            record.insert(key.clone(), value.clone());
        }
    }
}

impl<S, W> Layer<S> for JsonLogLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'a> MakeWriter<'a> + 'static,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut event_fields = FieldStorage::default();
        event.record(&mut event_fields);

        // Fall back to the target when the event carries no message.
        let message = event_fields
            .message()
            .unwrap_or_else(|| event.metadata().target())
            .to_owned();
        let mut record = self.base_record(event, &message);

        // Span fields first so that event fields win on conflicts.
        if let Some(span) = ctx.event_span(event) {
            if let Some(storage) = span.extensions().get::<FieldStorage>() {
                merge_fields(&mut record, storage.values());
            }
        }
        merge_fields(&mut record, event_fields.values());

        let _ = self.emit(&record);
    }
}
