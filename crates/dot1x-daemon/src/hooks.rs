//! Upstream policy callbacks the dispatcher fires on authentication
//! outcomes. Pure, at-most-once-per-outcome notifications; the
//! dispatcher holds no reference back into whatever consumes them.

use dot1x_types::MacAddress;

/// Notifications the dispatcher fires as sessions conclude.
pub trait Hooks: Send + Sync {
    /// The supplicant authenticated successfully.
    fn auth_success(&self, supplicant: MacAddress, port: MacAddress);

    /// The supplicant failed to authenticate (RADIUS reject, AAA timeout,
    /// or retransmission exhaustion).
    fn auth_failure(&self, supplicant: MacAddress, port: MacAddress);

    /// The supplicant sent EAPOL-Logoff.
    fn auth_logoff(&self, supplicant: MacAddress, port: MacAddress);
}

/// A [`Hooks`] implementation that only logs; useful for a bare daemon run
/// with no upstream policy engine wired in.
#[derive(Debug, Default)]
pub struct LoggingHooks;

impl Hooks for LoggingHooks {
    fn auth_success(&self, supplicant: MacAddress, port: MacAddress) {
        tracing::info!(%supplicant, %port, "authentication succeeded");
    }

    fn auth_failure(&self, supplicant: MacAddress, port: MacAddress) {
        tracing::info!(%supplicant, %port, "authentication failed");
    }

    fn auth_logoff(&self, supplicant: MacAddress, port: MacAddress) {
        tracing::info!(%supplicant, %port, "supplicant logged off");
    }
}
