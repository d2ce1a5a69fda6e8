use log::{info, warn};
use std::sync::Once;
use std::time::{SystemTime, UNIX_EPOCH};

static INIT_LOGGER: Once = Once::new();

/// Initialize the logging system (call once at application startup)
///
/// Configure logging levels via the `RUST_LOG` environment variable:
/// - `RUST_LOG=info` - info and above (recommended)
/// - `RUST_LOG=kvguard=debug` - module-specific levels
pub fn init() {
    INIT_LOGGER.call_once(|| {
        env_logger::Builder::from_default_env()
            .format_timestamp_micros()
            .init();
    });
}

/// Logs an administration-relevant event with standardized formatting
///
/// # Parameters
/// * `event_type` - Type of event (e.g., "ROLE_GRANT", "ITEM_EXPORT")
/// * `details` - Additional details about the event
/// * `success` - Whether the operation was successful
pub fn log_admin_event(event_type: &str, details: &str, success: bool) {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let status = if success { "SUCCESS" } else { "FAILURE" };

    if success {
        info!("[{}] {} - {}: {}", timestamp, status, event_type, details);
    } else {
        warn!("[{}] {} - {}: {}", timestamp, status, event_type, details);
    }
}
