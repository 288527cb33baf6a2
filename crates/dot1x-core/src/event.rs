//! Events the per-supplicant state machine reacts to.

use dot1x_codec::EapMessage;

/// Something the state machine must react to on its next `handle` call.
#[derive(Debug, Clone)]
pub enum Event {
    /// A frame arrived from the supplicant over EAPOL.
    MessageReceived(EapMessage),
    /// A reply arrived from the RADIUS server, already unwrapped to its
    /// carried EAP message.
    RadiusMessageReceived {
        /// The EAP message the RADIUS server's EAP-Message attribute(s)
        /// decoded to.
        message: EapMessage,
        /// The RADIUS State attribute to echo on the next Access-Request
        /// for this exchange, if the server sent one.
        state: Option<Vec<u8>>,
    },
    /// The port this supplicant sits behind changed enabled/disabled.
    PortStatusChange {
        /// `true` if the port is now enabled.
        enabled: bool,
    },
    /// The retransmission timer for the outstanding request fired with no
    /// reply having arrived.
    Timeout,
}
