//! Dangerous-call reporting.

use tracing::warn;

/// Target used for dangerous API call warnings.
pub const DANGEROUS_TARGET: &str = "switchboard::dangerous";

/// Report a direct mutation that bypasses the server-driven flow.
///
/// Debug builds stay quiet; release builds warn unless disabled.
pub fn log_dangerous_call(enabled: bool, call: &str, name: &str) {
    if !enabled || cfg!(debug_assertions) {
        return;
    }
    warn!(
        target: DANGEROUS_TARGET,
        call = call,
        name = name,
        "Dangerous API call used in production"
    );
}
