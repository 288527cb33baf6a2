//! The EAP method a proposed exchange runs. This authenticator only ever
//! runs [`PassthroughMethod`] — every method decision is deferred to the
//! AAA server — but the trait seam exists so a locally-terminated method
//! could be added without touching the state machine.

use dot1x_codec::{EapCode, EapMessage};
use dot1x_types::MacAddress;

/// The EAP method kind a proposal names. Only `Identity` is ever proposed
/// locally by this authenticator; `Notification` exists for parity with
/// the standard's Policy interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// EAP-Identity (type 1).
    Identity,
    /// EAP-Notification (type 2), never actually emitted by this
    /// authenticator.
    Notification,
}

/// A running method instance.
pub trait Method: std::fmt::Debug + Send {
    /// Returns `true` if `resp` should be ignored rather than processed.
    fn check(&self, resp: &EapMessage) -> bool;
    /// Feeds a validated response into the method.
    fn process(&mut self, resp: &EapMessage);
    /// Prepares the method for a new supplicant.
    fn init(&mut self, src_mac: MacAddress);
    /// Resets the method after a NAK, so a different method can be tried.
    fn reset(&mut self);
    /// `true` once the method has reached a terminal local state.
    fn is_done(&self) -> bool;
    /// Retransmission timeout, in seconds, for this method's requests.
    fn get_timeout(&self) -> u64;
    /// Key material the method produced, if any.
    fn get_key(&self) -> Option<Vec<u8>>;
    /// Builds the next request this method wants sent.
    fn build_req(&self, current_id: u8) -> EapMessage;
}

/// The only method this authenticator runs: ask for the identity, then
/// immediately defer everything else to the AAA server.
#[derive(Debug, Default)]
pub struct PassthroughMethod {
    done: bool,
    src_mac: Option<MacAddress>,
}

impl Method for PassthroughMethod {
    fn check(&self, _resp: &EapMessage) -> bool {
        false
    }

    fn process(&mut self, resp: &EapMessage) {
        if matches!(resp, EapMessage::Identity { code: EapCode::Response, .. }) {
            self.done = true;
        }
    }

    fn init(&mut self, src_mac: MacAddress) {
        self.src_mac = Some(src_mac);
    }

    fn reset(&mut self) {
        self.done = false;
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn get_timeout(&self) -> u64 {
        1
    }

    fn get_key(&self) -> Option<Vec<u8>> {
        None
    }

    fn build_req(&self, current_id: u8) -> EapMessage {
        EapMessage::Identity {
            src_mac: self.src_mac.expect("init called before build_req"),
            message_id: current_id,
            code: EapCode::Request,
            identity: String::new(),
        }
    }
}
