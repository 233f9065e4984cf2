//! ID generation utilities for doubtq

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a unique doubt ID
///
/// Format: `dbt-{timestamp_ms}-{random_hex}`
/// Example: `dbt-1738300800123-a1b2`
pub fn generate_doubt_id() -> String {
    let random: u16 = rand::rng().random();
    format!("dbt-{}-{:04x}", now_ms(), random)
}
