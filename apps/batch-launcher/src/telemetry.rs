//! Logging Setup
//!
//! Console logging through `tracing-subscriber`, filtered by `RUST_LOG`.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Filter directives (default: `batch_launcher=info`)
//! - `NO_COLOR`: Disable ANSI colors when set
//!
//! # Usage
//!
//! ```ignore
//! use batch_launcher::telemetry;
//!
//! telemetry::init();
//! tracing::info!("Starting batch launcher");
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Directive applied on top of `RUST_LOG`.
const DEFAULT_DIRECTIVE: &str = "batch_launcher=info";

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Extra filter directives, e.g. `batch_instance=info`.
    pub directives: Vec<String>,
    /// Whether to emit ANSI colors.
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            directives: vec![DEFAULT_DIRECTIVE.to_string()],
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            ansi: std::env::var_os("NO_COLOR").is_none(),
            ..Self::default()
        }
    }

    /// Add a filter directive.
    #[must_use]
    pub fn with_directive(mut self, directive: &str) -> Self {
        self.directives.push(directive.to_string());
        self
    }
}

/// Initialize logging with configuration from the environment.
pub fn init() {
    init_with_config(&TelemetryConfig::from_env());
}

/// Initialize logging with custom configuration.
///
/// A second initialization in the same process is ignored.
pub fn init_with_config(config: &TelemetryConfig) {
    let mut env_filter = EnvFilter::from_default_env();
    for directive in &config.directives {
        match directive.parse::<Directive>() {
            Ok(parsed) => env_filter = env_filter.add_directive(parsed),
            Err(e) => eprintln!("Ignoring invalid log directive '{directive}': {e}"),
        }
    }

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_ansi(config.ansi)
        .with_file(false)
        .with_line_number(false);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}

// =============================================================================
// Tests
// =============================================================================
