use std::fmt::{self, Write};

use ansi_term::Colour::{Blue, Cyan, Purple, Red, Yellow};
use anyhow::{anyhow, Result};
use tracing::{
    field::{Field, Visit},
    subscriber::set_global_default,
    Event, Level, Subscriber,
};
use tracing_subscriber::{
    layer::{Context, SubscriberExt},
    EnvFilter, Layer, Registry,
};

/// Configure logging telemetry
pub fn init(verbose: bool) -> Result<()> {
    let level = match verbose {
        true => "debug",
        false => "info",
    };
    init_subscriber(get_subscriber(default_filter(level)))
}

/// Filter directives enabling `level` for the crate and its log targets.
pub fn default_filter(level: &str) -> String {
    ["opnode", "l1", "engine", "derive"]
        .map(|target| format!("{target}={level}"))
        .join(",")
}

/// Subscriber Composer
///
/// Layers an [EnvFilter] over the [AnsiTermLayer]. `RUST_LOG` takes
/// precedence over `env_filter` when set.
pub fn get_subscriber(env_filter: String) -> impl Subscriber + Sync + Send {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    Registry::default().with(env_filter).with(AnsiTermLayer)
}

/// Globally registers a subscriber.
/// This will error if a subscriber has already been registered.
pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) -> Result<()> {
    set_global_default(subscriber).map_err(|_| anyhow!("Failed to set subscriber"))
}

/// Collects the fields of an event into a single line.
///
/// The `message` field comes first, the rest follow as `key=value`.
#[derive(Debug, Default)]
pub struct AnsiVisitor {
    message: String,
    fields: String,
}

impl AnsiVisitor {
    pub fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }

    fn push(&mut self, field: &Field, value: fmt::Arguments<'_>) {
        if field.name() == "message" {
            let _ = self.message.write_fmt(value);
            return;
        }
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{}={}", Cyan.paint(field.name()), value);
    }
}

impl Visit for AnsiVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, format_args!("{value}"))
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, format_args!("{value}"))
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format_args!("{value:?}"))
    }
}

/// An Ansi Term layer for tracing
#[derive(Debug)]
pub struct AnsiTermLayer;

impl<S: Subscriber> Layer<S> for AnsiTermLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let utc = chrono::Utc::now();
        let level = match *event.metadata().level() {
            Level::ERROR => Red.paint("ERROR"),
            Level::WARN => Yellow.paint("WARN"),
            Level::INFO => Blue.paint("INFO"),
            Level::DEBUG => ansi_term::Style::new().paint("DEBUG"),
            Level::TRACE => Purple.paint("TRACE"),
        };

        let mut visitor = AnsiVisitor::default();
        event.record(&mut visitor);

        let line = format!(
            "[{}] {}: {} {}",
            Cyan.paint(utc.to_rfc2822()),
            level,
            Purple.paint(event.metadata().target()),
            visitor.finish()
        );
        match *event.metadata().level() {
            Level::ERROR => eprintln!("{line}"),
            _ => println!("{line}"),
        }
    }
}
