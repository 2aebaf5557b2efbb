//! Environment-driven runtime tunables
//!
//! Each value is read once, on first use, and cached for the life of the
//! process. Unparseable values fall back to the default.

use std::sync::OnceLock;

fn parse_env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

static LOOP_SLEEP_MS: OnceLock<u64> = OnceLock::new();

/// Pause after every capture-loop iteration (`INSPECT_LOOP_SLEEP_MS`, default 16)
pub fn loop_sleep_ms() -> u64 {
    *LOOP_SLEEP_MS.get_or_init(|| parse_env_u64("INSPECT_LOOP_SLEEP_MS", 16).min(1000))
}

static PARAM_APPLY_INTERVAL: OnceLock<u32> = OnceLock::new();

/// Iterations between device parameter re-applications (`INSPECT_PARAM_APPLY_INTERVAL`)
pub fn param_apply_interval() -> u32 {
    *PARAM_APPLY_INTERVAL
        .get_or_init(|| parse_env_u64("INSPECT_PARAM_APPLY_INTERVAL", 15).clamp(1, 600) as u32)
}

static FRAME_SKIP: OnceLock<u32> = OnceLock::new();

/// Initial frame-skip divisor (`INSPECT_FRAME_SKIP`)
pub fn frame_skip() -> u32 {
    *FRAME_SKIP.get_or_init(|| parse_env_u64("INSPECT_FRAME_SKIP", 1).clamp(1, 30) as u32)
}

static WARMUP_MS: OnceLock<u64> = OnceLock::new();

/// Delay between device open and the first cycle (`INSPECT_WARMUP_MS`)
pub fn warmup_ms() -> u64 {
    *WARMUP_MS.get_or_init(|| parse_env_u64("INSPECT_WARMUP_MS", 1000).min(10_000))
}

static EVENT_QUEUE: OnceLock<usize> = OnceLock::new();

/// Per-subscriber event queue depth (`INSPECT_EVENT_QUEUE`)
pub fn event_queue_depth() -> usize {
    *EVENT_QUEUE.get_or_init(|| parse_env_usize("INSPECT_EVENT_QUEUE", 64).clamp(1, 4096))
}
