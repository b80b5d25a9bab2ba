use std::sync::Once;
use strum::{Display, EnumString};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;

static INIT: Once = Once::new();

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

pub fn init_instrumentation(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let builder = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(true)
            .with_level(true);

        let result = match format {
            LogFormat::Text => builder.finish().try_init(),
            LogFormat::Json => builder.json().finish().try_init(),
        };

        // No subscriber is installed to report through
        if let Err(err) = result {
            eprintln!("Failed to set tracing subscriber: {err}");
        }
    });
}
