use irongpt_core::audit::{AuditEvent, AuditSink};
use irongpt_core::config::{LogFormat, LoggingConfig};
use tracing::Level;

/// Installs the global subscriber. Output goes to stderr so it never mixes with chat replies.
pub fn init_logging(config: &LoggingConfig) {
    let log_level = config.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // a subscriber may already be installed when commands run in-process
    let _ = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

/// Forwards audit events into the log stream.
#[derive(Clone, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        tracing::debug!(
            event_name = %event.event_type,
            session_id = %event.session_id,
            correlation_id = %event.correlation_id,
            category = ?event.category,
            outcome = ?event.outcome,
            metadata = ?event.metadata,
            "audit event"
        );
    }
}
