//! Event formatters for the pretty (development) and JSON (production) outputs.

use std::fmt;

use chrono::{Local, SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::field::MakeExt;
use tracing_subscriber::fmt::format::{self, FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::{FmtContext, FormattedFields};
use tracing_subscriber::registry::LookupSpan;
use yansi::{Painted, Paint, Style};

fn styled<T: ?Sized>(ansi: bool, value: &T, style: Style) -> Painted<&T> {
    value.paint(if ansi { style } else { Style::new() })
}

fn level_style(level: &Level) -> Style {
    match *level {
        Level::TRACE => Style::new().magenta(),
        Level::DEBUG => Style::new().blue(),
        Level::INFO => Style::new().green(),
        Level::WARN => Style::new().yellow().bold(),
        Level::ERROR => Style::new().red().bold(),
    }
}

/// `HH:MM:SS.mmm LEVEL span{fields}: target: message key=value`
pub struct CustomPrettyFormatter;

impl<S, N> FormatEvent<S, N> for CustomPrettyFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let ansi = writer.has_ansi_escapes();

        let timestamp = Local::now().format("%H:%M:%S%.3f").to_string();
        write!(writer, "{} ", styled(ansi, timestamp.as_str(), Style::new().dim()))?;

        let level = format!("{:>5}", meta.level());
        write!(writer, "{} ", styled(ansi, level.as_str(), level_style(meta.level())))?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", styled(ansi, span.name(), Style::new().bold()))?;
                let extensions = span.extensions();
                if let Some(fields) = extensions.get::<FormattedFields<N>>()
                    && !fields.is_empty()
                {
                    write!(writer, "{{{fields}}}")?;
                }
                writer.write_str(": ")?;
            }
        }

        write!(writer, "{}: ", styled(ansi, meta.target(), Style::new().dim()))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Message bare, other fields as `key=value`, space separated.
pub fn compact_fields() -> impl for<'writer> FormatFields<'writer> + 'static {
    format::debug_fn(|writer, field, value| {
        if field.name() == "message" {
            write!(writer, "{value:?}")
        } else {
            let ansi = writer.has_ansi_escapes();
            write!(
                writer,
                "{}={value:?}",
                styled(ansi, field.name(), Style::new().italic())
            )
        }
    })
    .delimited(" ")
}

/// One JSON object per event: `timestamp`, `level`, `target`, `message`,
/// plus `fields` and `spans` when present.
pub struct CustomJsonFormatter;

impl<S, N> FormatEvent<S, N> for CustomJsonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();

        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        let message = visitor.fields.remove("message").unwrap_or(Value::Null);

        let spans: Vec<Value> = ctx
            .event_scope()
            .into_iter()
            .flat_map(|scope| scope.from_root())
            .map(|span| {
                let mut entry = Map::new();
                entry.insert("name".to_owned(), Value::from(span.name()));
                let extensions = span.extensions();
                if let Some(fields) = extensions.get::<FormattedFields<N>>()
                    && let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(fields.as_str())
                {
                    entry.extend(fields);
                }
                Value::Object(entry)
            })
            .collect();

        let mut output = Map::new();
        output.insert(
            "timestamp".to_owned(),
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        output.insert("level".to_owned(), Value::from(meta.level().to_string()));
        output.insert("target".to_owned(), Value::from(meta.target()));
        output.insert("message".to_owned(), message);
        if !visitor.fields.is_empty() {
            output.insert("fields".to_owned(), Value::Object(visitor.fields));
        }
        if !spans.is_empty() {
            output.insert("spans".to_owned(), Value::Array(spans));
        }

        let line = serde_json::to_string(&Value::Object(output)).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}

#[derive(Default)]
struct JsonVisitor {
    fields: Map<String, Value>,
}

impl JsonVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name().to_owned(), value);
    }
}

impl Visit for JsonVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;
    use tracing_subscriber::fmt::format::JsonFields;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Buffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Buffer {
        type Writer = Buffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn emit() {
        let span = tracing::info_span!("request", req_id = "abc");
        let _guard = span.enter();
        tracing::info!(status = 200u16, "relayed");
    }

    #[test]
    fn json_lines_carry_fields_and_spans() {
        let buffer = Buffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_writer(buffer.clone())
            .fmt_fields(JsonFields::new())
            .event_format(CustomJsonFormatter)
            .finish();
        tracing::subscriber::with_default(subscriber, emit);

        let value: Value = serde_json::from_str(buffer.contents().trim()).unwrap();
        assert_eq!(value["level"], "INFO");
        assert_eq!(value["message"], "relayed");
        assert_eq!(value["fields"]["status"], 200);
        assert_eq!(value["spans"][0]["name"], "request");
        assert_eq!(value["spans"][0]["req_id"], "abc");
    }

    #[test]
    fn pretty_lines_are_plain_without_ansi() {
        let buffer = Buffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_ansi(false)
            .with_writer(buffer.clone())
            .fmt_fields(compact_fields())
            .event_format(CustomPrettyFormatter)
            .finish();
        tracing::subscriber::with_default(subscriber, emit);

        let line = buffer.contents();
        assert!(line.contains(" INFO "));
        assert!(line.contains("request{"));
        assert!(line.contains("relayed status=200"));
        assert!(!line.contains('\u{1b}'));
    }
}
