use std::io::Write;

use nu_ansi_term::Color;
use tracing::{field::Field, Event, Level, Metadata, Subscriber};
use tracing_subscriber::{
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields, MakeWriter},
    registry::LookupSpan,
};

use crate::{cli::Args, utils::Colored};

/// Collects the `message` field of an event; structured fields are dropped.
#[derive(Default)]
struct MessageCollector(Option<String>);

impl tracing::field::Visit for MessageCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

fn level_tag(level: &Level) -> Option<(Color, &'static str)> {
    match *level {
        Level::TRACE => Some((Color::Magenta, "[TRACE]")),
        Level::DEBUG => Some((Color::Blue, "[DEBUG]")),
        Level::INFO => None,
        Level::WARN => Some((Color::Yellow, "[WARN]")),
        Level::ERROR => Some((Color::Red, "[ERROR]")),
    }
}

/// Human output: the bare message, with a colored tag on everything but INFO.
struct PlainFormat;

impl<S, N> FormatEvent<S, N> for PlainFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        if let Some((color, tag)) = level_tag(event.metadata().level()) {
            write!(writer, "{} ", Colored(color, tag))?;
        }

        let mut message = MessageCollector::default();
        event.record(&mut message);
        writeln!(writer, "{}", message.0.unwrap_or_default())
    }
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Holds one formatted record and prints it on drop with the progress bars suspended.
struct RecordWriter {
    stream: Stream,
    buffer: Vec<u8>,
}

impl Write for RecordWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Drop for RecordWriter {
    fn drop(&mut self) {
        let record = String::from_utf8_lossy(&self.buffer);
        let record = record.trim_end_matches('\n');
        if record.is_empty() {
            return;
        }

        let stream = self.stream;
        crate::progress::suspend(|| {
            match stream {
                Stream::Stdout => println!("{record}"),
                Stream::Stderr => eprintln!("{record}"),
            }
        });
    }
}

/// INFO goes to stdout, every other level to stderr.
struct ProgressAwareWriter;

impl<'a> MakeWriter<'a> for ProgressAwareWriter {
    type Writer = RecordWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RecordWriter {
            stream: Stream::Stdout,
            buffer: Vec::new(),
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        let stream = if *meta.level() == Level::INFO {
            Stream::Stdout
        } else {
            Stream::Stderr
        };
        RecordWriter {
            stream,
            buffer: Vec::new(),
        }
    }
}

fn filter_level(args: &Args) -> Level {
    match (args.quiet, args.verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    }
}

/// Installs the global subscriber. Only events from the mirrorgen crates pass the filter.
pub fn setup_logging(args: &Args) {
    let builder = fmt::Subscriber::builder()
        .with_env_filter(format!("mirrorgen={}", filter_level(args)))
        .with_target(false)
        .with_writer(ProgressAwareWriter)
        .without_time();

    let subscriber: Box<dyn Subscriber + Send + Sync> = if args.json {
        Box::new(builder.json().flatten_event(true).finish())
    } else {
        Box::new(builder.event_format(PlainFormat).finish())
    };

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["mirrorgen", "out", "pkg", "1.0.0", "me"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_filter_level() {
        assert_eq!(filter_level(&args(&[])), Level::INFO);
        assert_eq!(filter_level(&args(&["-v"])), Level::DEBUG);
        assert_eq!(filter_level(&args(&["-vvv"])), Level::TRACE);
        assert_eq!(filter_level(&args(&["-q", "-v"])), Level::ERROR);
    }

    #[test]
    fn test_info_has_no_tag() {
        assert!(level_tag(&Level::INFO).is_none());
        assert_eq!(level_tag(&Level::WARN).map(|(_, tag)| tag), Some("[WARN]"));
    }
}
