use std::sync::OnceLock;

static DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();

/// Verbose pipeline tracing, enabled by setting `INSPECT_DEBUG`
pub(crate) fn debug_enabled() -> bool {
    *DEBUG_ENABLED.get_or_init(|| std::env::var("INSPECT_DEBUG").is_ok())
}
