//! Log output for the catalog server.
//!
//! `RUST_LOG` wins when set. Otherwise the configured level applies to the
//! catalog crates and HTTP request tracing while dependencies stay at `warn`.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

/// Targets whose events follow the configured level.
const CATALOG_TARGETS: &[&str] = &[
    "catalog_server",
    "catalog_api",
    "catalog_reconcile",
    "catalog_storage",
    "catalog_db_memory",
    "catalog_db_postgres",
    "tower_http",
];

static FILTER: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Filter directives for a configured level.
pub fn directives(level: &str) -> String {
    let level = level.to_ascii_lowercase();
    let rest = match level.as_str() {
        "error" | "off" => level.as_str(),
        _ => "warn",
    };
    CATALOG_TARGETS
        .iter()
        .fold(rest.to_string(), |mut out, target| {
            out.push_str(&format!(",{target}={level}"));
            out
        })
}

fn env_filter() -> Option<EnvFilter> {
    std::env::var_os("RUST_LOG")?;
    EnvFilter::try_from_default_env().ok()
}

/// Installs the global subscriber. Only the first call has an effect.
pub fn init_tracing(level: &str) {
    let filter = env_filter().unwrap_or_else(|| EnvFilter::new(directives(level)));
    let (filter, handle) = reload::Layer::new(filter);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .is_ok();
    if installed {
        let _ = FILTER.set(handle);
    }
}

/// Switches the running subscriber to `level` unless `RUST_LOG` is set.
pub fn set_level(level: &str) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    let Some(handle) = FILTER.get() else {
        return;
    };
    if let Err(err) = handle.reload(EnvFilter::new(directives(level))) {
        tracing::warn!(level, error = %err, "failed to apply log level");
    }
}
