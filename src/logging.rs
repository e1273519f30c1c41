// src/logging.rs
//
// Platform logger initialization.

// Logger subsystem identifier
#[cfg(feature = "ios")]
const LOG_SUBSYSTEM: &str = "com.dataflow.engine";

/// Install the platform's log backend.
///
/// Call once at startup. Later calls are harmless: the first logger wins.
#[cfg(feature = "ios")]
pub fn init() {
    oslog::OsLogger::new(LOG_SUBSYSTEM)
        .level_filter(log::LevelFilter::Debug)
        .init()
        .ok();
}

/// Install the platform's log backend.
///
/// Also routes panics to the browser console.
#[cfg(all(feature = "web", not(feature = "ios")))]
pub fn init() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).ok();
}

/// Install the platform's log backend.
///
/// Honors `RUST_LOG`; defaults to `info`.
#[cfg(not(any(feature = "ios", feature = "web")))]
pub fn init() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init()
        .ok();
}
