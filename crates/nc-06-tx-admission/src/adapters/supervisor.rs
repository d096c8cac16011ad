//! Process supervisor for integrity-fatal conditions.

use tracing::error;

use crate::ports::outbound::IntegritySupervisor;

/// Logs the reason and aborts the process without unwinding.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortSupervisor;

impl IntegritySupervisor for AbortSupervisor {
    fn integrity_fatal(&self, reason: &str) -> ! {
        error!("[nc-06] integrity failure, aborting: {}", reason);
        std::process::abort()
    }
}
