//! Logging for tests.
//!
//! Identities print as long hex strings. Register a nickname for each one a
//! test creates and the formatted output shows `alice` instead.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, RwLock},
};
use tracing::Subscriber;
use tracing_subscriber::{
    fmt::{
        format::{Format, Writer},
        FmtContext, FormatEvent, FormatFields,
    },
    registry::LookupSpan,
};

lazy_static::lazy_static! {
    // Shared by every test in the process so helpers can register nicknames
    // without threading a handle around
    static ref GLOBAL_REWRITER: LogRewriter = LogRewriter::new();
}

/// Install a test-writer subscriber filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
/// Nicknames registered by earlier tests are cleared.
pub fn init_logging() {
    GLOBAL_REWRITER.clear_rewrites();
    let _ = tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .event_format(&*GLOBAL_REWRITER)
        .try_init();
}

/// Print `from` as `to` in all subsequent log lines.
pub fn add_rewrite<S1: ToString, S2: AsRef<str>>(from: S1, to: S2) {
    GLOBAL_REWRITER.add_rewrite(from, to);
}

#[derive(Debug, Clone)]
pub struct LogRewriter {
    rewrites: Arc<RwLock<HashMap<String, String>>>,
    format: Format,
}

impl LogRewriter {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            rewrites: Arc::new(RwLock::new(HashMap::new())),
            format: Format::default().with_target(false),
        }
    }

    pub fn rewrite(&self, value: &str) -> String {
        let Ok(rewrites) = self.rewrites.read() else {
            return value.to_string();
        };

        // Longest first, so a nickname for a full id beats one for its prefix
        let mut ordered: Vec<(&String, &String)> = rewrites.iter().collect();
        ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(b.0)));

        ordered
            .into_iter()
            .fold(value.to_string(), |acc, (from, to)| acc.replace(from.as_str(), to))
    }

    pub fn add_rewrite<S: ToString, To: AsRef<str>>(&self, from: S, to: To) {
        if let Ok(mut rewrites) = self.rewrites.write() {
            rewrites.insert(from.to_string(), to.as_ref().to_string());
        }
    }

    pub fn clear_rewrites(&self) {
        if let Ok(mut rewrites) = self.rewrites.write() {
            rewrites.clear();
        }
    }
}

impl<S, N> FormatEvent<S, N> for &LogRewriter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> fmt::Result {
        let mut buffer = String::new();
        self.format.format_event(ctx, Writer::new(&mut buffer), event)?;
        writer.write_str(&self.rewrite(&buffer))
    }
}
