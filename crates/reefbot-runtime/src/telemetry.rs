//! Tracing pipeline initialisation.
//!
//! Call [`init_tracing`] once at process startup.
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |---|---|
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | OTLP collector base URL (e.g. `http://localhost:4318`). When set, spans are exported over OTLP/HTTP. |
//! | `RUST_LOG` | Log filter (default `"info"`). |
//! | `REEFBOT_LOG_FORMAT=json` | Emit newline-delimited JSON logs. |
//!
//! # Example
//!
//! ```rust,no_run
//! // Hold the guard until the control loop has stopped.
//! let _guard = reefbot_runtime::telemetry::init_tracing("reefbot");
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Console output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Telemetry knobs read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySettings {
    pub filter: String,
    pub format: LogFormat,
    pub otlp_endpoint: Option<String>,
}

impl TelemetrySettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let format = match lookup("REEFBOT_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        };
        Self {
            filter: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            format,
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|e| !e.is_empty()),
        }
    }
}

/// Install the global `tracing` subscriber, with an OTLP layer when an
/// endpoint is configured.
///
/// Exporter failures are logged once the subscriber is up; logging then
/// continues on the console only.  The returned [`TracerProviderGuard`]
/// flushes pending spans when dropped.
pub fn init_tracing(service_name: &str) -> TracerProviderGuard {
    let settings = TelemetrySettings::from_env();
    let env_filter = EnvFilter::try_new(&settings.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let provider = settings
        .otlp_endpoint
        .as_deref()
        .map(|endpoint| build_provider(service_name, endpoint));
    let otel_layer = match &provider {
        Some(Ok(p)) => Some(tracing_opentelemetry::layer().with_tracer(p.tracer("reefbot"))),
        _ => None,
    };

    let registry = tracing_subscriber::registry().with(env_filter).with(otel_layer);
    match settings.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Compact => registry.with(tracing_subscriber::fmt::layer().compact()).init(),
    }

    match provider {
        Some(Ok(p)) => {
            info!(endpoint = settings.otlp_endpoint.as_deref(), "exporting spans over OTLP");
            TracerProviderGuard(Some(p))
        }
        Some(Err(e)) => {
            warn!(error = %e, "OTLP exporter init failed; console logging only");
            TracerProviderGuard(None)
        }
        None => TracerProviderGuard(None),
    }
}

/// Shuts the OTel provider down on drop, flushing pending spans.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take()
            && let Err(e) = provider.shutdown()
        {
            warn!(error = %e, "OpenTelemetry provider shutdown failed");
        }
    }
}

fn build_provider(service_name: &str, endpoint: &str) -> Result<SdkTracerProvider, String> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| e.to_string())?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    // Simple exporter: the control loop is synchronous and no Tokio runtime
    // is guaranteed to exist when this runs.
    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_simple_exporter(exporter)
        .build())
}
