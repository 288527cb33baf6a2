//! The pluggable decision points RFC 4137 calls out as "Policy": which
//! method to propose next, and whether a given response should be
//! answered locally or passed through to the AAA server.
//!
//! This authenticator only ever passes through, but the two decisions
//! stay separate functions so a future local method (e.g. MD5-Challenge
//! answered without a RADIUS round trip) has a seam to plug into.

use dot1x_codec::EapMessage;

use crate::method::MethodKind;

/// The authenticator's next move after `SELECT_ACTION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// End the exchange with EAP-Success.
    Success,
    /// End the exchange with EAP-Failure.
    Failure,
    /// Propose a method and handle it locally.
    Continue,
    /// Hand the exchange off to the AAA server.
    Passthrough,
}

/// Decision oracle. Stateless: every call is a pure function of its inputs.
#[derive(Debug, Default, Clone, Copy)]
pub struct Policy;

impl Policy {
    /// Chooses the method to propose for a fresh exchange. Only called
    /// when `get_decision` would return [`Decision::Continue`]; this
    /// authenticator never does, since it always passes through, but the
    /// method exists to mirror the standard's state diagram.
    #[must_use]
    pub fn next_method(resp: Option<&EapMessage>) -> MethodKind {
        match resp {
            Some(EapMessage::EapolStart { .. }) => MethodKind::Identity,
            _ => MethodKind::Notification,
        }
    }

    /// Decides what to do with the current exchange. EAPOL-Start always
    /// restarts the method proposal cycle (which for this authenticator
    /// means requesting the identity before deferring to RADIUS);
    /// anything else is handed to the AAA server.
    #[must_use]
    pub fn decision(resp: Option<&EapMessage>) -> Decision {
        match resp {
            Some(EapMessage::EapolStart { .. }) => Decision::Continue,
            _ => Decision::Passthrough,
        }
    }

    /// Hook for a method to report back what it learned (key material,
    /// method preference) so future `next_method`/`decision` calls can
    /// account for it. Unused while every exchange passes through.
    pub fn update() {}
}
