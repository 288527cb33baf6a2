//! The per-supplicant EAP state machine: RFC 4137 section 7's Full
//! Authenticator and Pass-Through Authenticator halves, coupled into one
//! fixed-point loop — each call to [`EapStateMachine::handle`]
//! re-evaluates the combined state diagram until it stops moving, then
//! reports what (if anything) should be sent to the supplicant and to
//! the AAA server.

use dot1x_codec::{EapCode, EapMessage};
use dot1x_types::MacAddress;
use tracing::{debug, trace, warn};

use crate::event::Event;
use crate::method::{Method, MethodKind, PassthroughMethod};
use crate::policy::{Decision, Policy};

const MAX_RETRANS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NoState,
    Disabled,
    Initialize,
    Idle,
    Received,
    IntegrityCheck,
    MethodResponse,
    MethodRequest,
    ProposeMethod,
    SelectAction,
    SendRequest,
    Discard,
    Nak,
    Retransmit,
    Success,
    Failure,
    TimeoutFailure,
    InitializePassthrough,
    Idle2,
    Received2,
    AaaRequest,
    AaaIdle,
    AaaResponse,
    SendRequest2,
    Discard2,
    Retransmit2,
    Success2,
    Failure2,
    TimeoutFailure2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MethodState {
    Continue,
    End,
    Proposed,
    Identity,
    Nak,
}

/// What the AAA server should be asked about this exchange, alongside the
/// identity the session presented and the State attribute to echo.
#[derive(Debug, Clone)]
pub struct RadiusRequest {
    /// The EAP message to wrap in EAP-Message attribute(s).
    pub message: EapMessage,
    /// The identity string this session presented, for User-Name.
    pub identity: String,
    /// The RADIUS State attribute to echo back, if the exchange has one.
    pub state: Option<Vec<u8>>,
}

/// What resulted from processing one [`Event`].
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    /// An EAP frame to send to the supplicant over EAPOL.
    pub eap_frame: Option<EapMessage>,
    /// An Access-Request to send to the AAA server.
    pub radius_request: Option<RadiusRequest>,
    /// Authentication succeeded this step.
    pub auth_success: bool,
    /// Authentication failed this step.
    pub auth_failure: bool,
}

/// The coupled Full Authenticator / Pass-Through Authenticator state
/// machine for one supplicant session.
#[derive(Debug)]
pub struct EapStateMachine {
    state: State,
    src_mac: MacAddress,
    port_enabled: bool,
    eap_restart: bool,
    method: Box<dyn Method>,
    current_method: Option<MethodKind>,
    current_id: Option<u8>,
    method_state: Option<MethodState>,
    retrans_count: u32,
    last_req_data: Option<EapMessage>,
    retrans_while_expired: bool,

    eap_resp: bool,
    eap_resp_data: Option<EapMessage>,
    eap_req: bool,
    eap_req_data: Option<EapMessage>,
    eap_success: bool,
    eap_fail: bool,
    eap_timeout: bool,
    eap_key_data: Option<Vec<u8>>,
    eap_key_available: bool,

    aaa_eap_req: bool,
    aaa_eap_req_data: Option<EapMessage>,
    aaa_eap_resp: bool,
    aaa_eap_resp_data: Option<EapMessage>,
    aaa_identity: Option<String>,
    aaa_success: bool,
    aaa_fail: bool,
    aaa_timeout: bool,
    aaa_eap_key_data: Option<Vec<u8>>,
    aaa_eap_key_available: bool,

    radius_state_attribute: Option<Vec<u8>>,
}

impl EapStateMachine {
    /// Creates a fresh state machine for `src_mac`, with the port
    /// initially disabled (the caller enables it once the session is
    /// admitted, mirroring `PortStatusChange`).
    #[must_use]
    pub fn new(src_mac: MacAddress) -> Self {
        let mut method = Box::<PassthroughMethod>::default();
        method.init(src_mac);
        Self {
            state: State::NoState,
            src_mac,
            port_enabled: true,
            eap_restart: false,
            method,
            current_method: None,
            current_id: None,
            method_state: None,
            retrans_count: 0,
            last_req_data: None,
            retrans_while_expired: false,
            eap_resp: false,
            eap_resp_data: None,
            eap_req: false,
            eap_req_data: None,
            eap_success: false,
            eap_fail: false,
            eap_timeout: false,
            eap_key_data: None,
            eap_key_available: false,
            aaa_eap_req: false,
            aaa_eap_req_data: None,
            aaa_eap_resp: false,
            aaa_eap_resp_data: None,
            aaa_identity: None,
            aaa_success: false,
            aaa_fail: false,
            aaa_timeout: false,
            aaa_eap_key_data: None,
            aaa_eap_key_available: false,
            radius_state_attribute: None,
        }
    }

    /// The supplicant this session authenticates.
    #[must_use]
    pub fn src_mac(&self) -> MacAddress {
        self.src_mac
    }

    /// `true` once this exchange has ended in EAP-Success.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, State::Success | State::Success2)
    }

    /// Whether the port this session is behind is currently enabled, per
    /// the last `PortStatusChange` event delivered to it.
    #[must_use]
    pub fn port_enabled(&self) -> bool {
        self.port_enabled
    }

    fn next_id(&self) -> u8 {
        self.current_id.map_or(1, |id| id.wrapping_add(1))
    }

    fn build_success(&self) -> EapMessage {
        EapMessage::Success {
            src_mac: self.src_mac,
            message_id: self.current_id.unwrap_or(0),
        }
    }

    fn build_failure(&self) -> EapMessage {
        EapMessage::Failure {
            src_mac: self.src_mac,
            message_id: self.current_id.unwrap_or(0),
        }
    }

    fn parse_eap_resp(&self) -> (Option<EapCode>, Option<u8>, Option<MethodState>) {
        let Some(eap) = &self.eap_resp_data else {
            return (None, None, None);
        };
        let resp_method = match eap {
            EapMessage::Identity { code: EapCode::Response, .. } => Some(MethodState::Identity),
            EapMessage::LegacyNak { .. } => Some(MethodState::Nak),
            _ => None,
        };
        (eap.code(), eap.message_id(), resp_method)
    }

    fn disabled_state(&mut self) {
        trace!(mac = %self.src_mac, "DISABLED");
    }

    fn propose_method_state(&mut self) {
        self.current_method = Some(Policy::next_method(self.eap_resp_data.as_ref()));
        self.method.init(self.src_mac);
        self.method_state = Some(MethodState::Continue);
    }

    fn failure_state(&mut self) {
        self.eap_req_data = Some(self.build_failure());
        self.eap_fail = true;
    }

    fn success_state(&mut self) {
        self.eap_req_data = Some(self.build_success());
        if self.eap_key_data.is_some() {
            self.eap_key_available = true;
        }
        self.eap_success = true;
    }

    fn initialize_state(&mut self) {
        self.current_id = None;
        self.eap_success = false;
        self.eap_fail = false;
        self.eap_key_data = None;
        self.eap_restart = false;
    }

    fn idle_state(&mut self) {
        self.retrans_while_expired = false;
    }

    fn received_state(&mut self) -> (Option<EapCode>, Option<u8>, Option<MethodState>) {
        self.parse_eap_resp()
    }

    fn select_action_state(&mut self) -> Decision {
        Policy::decision(self.eap_resp_data.as_ref())
    }

    fn method_response_state(&mut self) {
        if let Some(resp) = &self.eap_resp_data {
            self.method.process(resp);
        }
        if self.method.is_done() {
            Policy::update();
            self.eap_key_data = self.method.get_key();
            self.method_state = Some(MethodState::End);
        } else {
            self.method_state = Some(MethodState::Continue);
        }
    }

    fn discard_state(&mut self) {
        self.eap_resp = false;
    }

    fn integrity_check_state(&mut self) -> bool {
        self.eap_resp_data.as_ref().is_some_and(|r| self.method.check(r))
    }

    fn nak_state(&mut self) {
        self.method.reset();
        Policy::update();
    }

    fn retransmit_state(&mut self) {
        // One timer fire buys exactly one retransmission: clear the flag
        // immediately so the fixed-point loop settles back in IDLE rather
        // than cascading through every remaining attempt in one call.
        self.retrans_while_expired = false;
        self.retrans_count += 1;
        if self.retrans_count <= MAX_RETRANS {
            self.eap_req_data.clone_from(&self.last_req_data);
            self.eap_req = true;
        }
    }

    fn send_request_state(&mut self) {
        self.retrans_count = 0;
        self.last_req_data.clone_from(&self.eap_req_data);
        self.eap_resp = false;
        self.eap_req = true;
    }

    fn method_request_state(&mut self) {
        self.current_id = Some(self.next_id());
        self.eap_req_data = Some(self.method.build_req(self.current_id.unwrap()));
    }

    fn initialize_passthrough_state(&mut self) {
        self.aaa_eap_resp = false;
    }

    fn aaa_request_state(&mut self, resp_method: Option<MethodState>) {
        if resp_method == Some(MethodState::Identity) {
            if let Some(EapMessage::Identity { identity, .. }) = &self.eap_resp_data {
                self.aaa_identity = Some(identity.clone());
            }
        }
        self.aaa_eap_resp_data.clone_from(&self.eap_resp_data);
    }

    fn aaa_idle_state(&mut self) {
        self.aaa_fail = false;
        self.aaa_success = false;
        self.aaa_eap_req = false;
        self.aaa_eap_resp = true;
    }

    fn aaa_response_state(&mut self) {
        self.eap_req_data.clone_from(&self.aaa_eap_req_data);
        self.current_id = self.aaa_eap_req_data.as_ref().and_then(EapMessage::message_id);
    }

    fn discard2_state(&mut self) {
        self.eap_resp = false;
    }

    fn retransmit2_state(&mut self) {
        self.retrans_while_expired = false;
        self.retrans_count += 1;
        if self.retrans_count <= MAX_RETRANS {
            self.eap_req_data.clone_from(&self.last_req_data);
            self.eap_req = true;
        }
    }

    fn success2_state(&mut self) {
        self.eap_req = true;
        self.eap_req_data.clone_from(&self.aaa_eap_req_data);
        self.eap_key_data.clone_from(&self.aaa_eap_key_data);
        self.eap_key_available = self.aaa_eap_key_available;
        self.eap_success = true;
    }

    fn failure2_state(&mut self) {
        self.eap_req = true;
        self.eap_req_data.clone_from(&self.aaa_eap_req_data);
        self.eap_fail = true;
    }

    fn timeout_failure2_state(&mut self) {
        self.eap_timeout = true;
    }

    /// Re-runs the combined state diagram until it reaches a fixed point,
    /// exactly as RFC 4137 figure 6 describes: each pass through the loop
    /// evaluates every state transition in order, and a single call may
    /// cascade through several states before settling.
    fn run_to_fixed_point(&mut self) {
        let mut rx_resp: Option<EapCode> = None;
        let mut resp_id: Option<u8> = None;
        let mut resp_method: Option<MethodState> = None;
        let mut ignore = false;
        let mut decision = Decision::Passthrough;

        let mut last_state: Option<State> = None;
        while last_state != Some(self.state) {
            last_state = Some(self.state);

            if !self.port_enabled {
                self.disabled_state();
                self.state = State::Disabled;
            }

            if self.eap_restart && self.port_enabled {
                self.initialize_state();
                self.state = State::Initialize;
            }

            if self.state == State::Initialize {
                decision = self.select_action_state();
                self.state = State::SelectAction;
            }

            if self.state == State::Disabled && self.port_enabled {
                self.initialize_state();
                self.state = State::Initialize;
            }

            if self.state == State::SelectAction {
                self.state = match decision {
                    Decision::Success => {
                        self.success_state();
                        State::Success
                    }
                    Decision::Failure => {
                        self.failure_state();
                        State::Failure
                    }
                    Decision::Passthrough => {
                        self.initialize_passthrough_state();
                        State::InitializePassthrough
                    }
                    Decision::Continue => {
                        self.propose_method_state();
                        State::ProposeMethod
                    }
                };
            }

            if self.state == State::ProposeMethod {
                self.method_request_state();
                self.state = State::MethodRequest;
            }

            if self.state == State::MethodRequest {
                self.send_request_state();
                self.state = State::SendRequest;
            }

            if self.state == State::SendRequest {
                self.idle_state();
                self.state = State::Idle;
            }

            if self.state == State::Idle {
                if self.retrans_while_expired {
                    self.retransmit_state();
                    self.state = State::Retransmit;
                } else if self.eap_resp {
                    let (a, b, c) = self.received_state();
                    rx_resp = a;
                    resp_id = b;
                    resp_method = c;
                    self.state = State::Received;
                }
            }

            if self.state == State::Retransmit {
                self.state = if self.retrans_count > MAX_RETRANS {
                    State::TimeoutFailure
                } else {
                    State::Idle
                };
            }

            if self.state == State::Received {
                let is_nak = resp_method == Some(MethodState::Nak);
                if rx_resp == Some(EapCode::Response)
                    && resp_id == self.current_id
                    && is_nak
                    && self.method_state == Some(MethodState::Proposed)
                {
                    self.nak_state();
                    self.state = State::Nak;
                } else if rx_resp == Some(EapCode::Response) && resp_id == self.current_id {
                    ignore = self.integrity_check_state();
                    self.state = State::IntegrityCheck;
                } else {
                    self.discard_state();
                    self.state = State::Discard;
                }
            }

            if self.state == State::Discard {
                self.idle_state();
                self.state = State::Idle;
            }

            if self.state == State::Nak {
                decision = self.select_action_state();
                self.state = State::SelectAction;
            }

            if self.state == State::IntegrityCheck {
                self.state = if ignore {
                    self.discard_state();
                    State::Discard
                } else {
                    self.method_response_state();
                    State::MethodResponse
                };
            }

            if self.state == State::MethodResponse {
                if self.method_state == Some(MethodState::End) {
                    decision = self.select_action_state();
                    self.state = State::SelectAction;
                } else {
                    self.method_request_state();
                    self.state = State::MethodRequest;
                }
            }

            if self.state == State::InitializePassthrough {
                if self.current_id.is_some() {
                    self.aaa_request_state(resp_method);
                    self.state = State::AaaRequest;
                } else {
                    self.aaa_idle_state();
                    self.state = State::AaaIdle;
                }
            }

            if self.state == State::AaaIdle {
                if self.aaa_fail {
                    self.failure2_state();
                    self.state = State::Failure2;
                } else if self.aaa_success {
                    self.success2_state();
                    self.state = State::Success2;
                } else if self.aaa_timeout {
                    self.timeout_failure2_state();
                    self.state = State::TimeoutFailure2;
                } else if self.aaa_eap_req {
                    self.aaa_response_state();
                    self.state = State::AaaResponse;
                } else {
                    self.discard2_state();
                    self.state = State::Discard2;
                }
            }

            if self.state == State::AaaResponse {
                self.send_request_state();
                self.state = State::SendRequest2;
            }

            if self.state == State::SendRequest2 {
                self.idle_state();
                self.state = State::Idle2;
            }

            if self.state == State::Discard2 {
                self.idle_state();
                self.state = State::Idle2;
            }

            if self.state == State::Idle2 {
                if self.retrans_while_expired {
                    self.retransmit2_state();
                    self.state = State::Retransmit2;
                } else if self.eap_resp {
                    let (a, b, c) = self.received_state();
                    rx_resp = a;
                    resp_id = b;
                    resp_method = c;
                    self.state = State::Received2;
                }
            }

            if self.state == State::Retransmit2 {
                if self.retrans_count > MAX_RETRANS {
                    self.timeout_failure2_state();
                    self.state = State::TimeoutFailure2;
                } else {
                    self.idle_state();
                    self.state = State::Idle2;
                }
            }

            if self.state == State::Received2 {
                if rx_resp == Some(EapCode::Response) && resp_id == self.current_id {
                    self.aaa_request_state(resp_method);
                    self.state = State::AaaRequest;
                } else {
                    debug!(mac = %self.src_mac, "RECEIVED2 id mismatch, discarding");
                    self.discard2_state();
                    self.state = State::Discard2;
                }
            }

            if self.state == State::AaaRequest {
                self.aaa_idle_state();
                self.state = State::AaaIdle;
            }
        }
    }

    /// Feeds `event` into the state machine and reports what should be
    /// sent out as a result.
    pub fn handle(&mut self, event: Event) -> StepOutput {
        let mut timer_expired = false;
        match &event {
            Event::MessageReceived(message) => {
                if matches!(message, EapMessage::EapolStart { .. }) {
                    self.eap_restart = true;
                }
                if matches!(message, EapMessage::EapolLogoff { .. }) {
                    self.port_enabled = false;
                }
                self.eap_resp_data = Some(message.clone());
                self.eap_resp = true;
                self.aaa_eap_req = false;
            }
            Event::RadiusMessageReceived { message, state } => {
                self.eap_resp_data = None;
                self.eap_resp = false;
                self.radius_state_attribute.clone_from(state);
                self.aaa_eap_req = true;
                self.aaa_eap_req_data = Some(message.clone());
                self.aaa_success = matches!(message, EapMessage::Success { .. });
                self.aaa_fail = matches!(message, EapMessage::Failure { .. });
            }
            Event::PortStatusChange { enabled } => {
                self.port_enabled = *enabled;
                self.eap_resp = false;
                self.aaa_eap_req = false;
            }
            Event::Timeout => {
                timer_expired = true;
                self.eap_resp = false;
                self.aaa_eap_req = false;
            }
        }

        self.eap_req = false;
        self.eap_success = false;
        self.eap_fail = false;
        self.eap_timeout = false;
        self.aaa_eap_resp = false;
        if !matches!(event, Event::RadiusMessageReceived { .. }) {
            self.aaa_success = false;
            self.aaa_fail = false;
        }
        self.retrans_while_expired = timer_expired;

        self.run_to_fixed_point();

        let mut out = StepOutput::default();

        if self.eap_req {
            if let Some(req) = &self.eap_req_data {
                out.eap_frame = Some(req.clone());
            } else {
                warn!(mac = %self.src_mac, "eap_req set with no eap_req_data");
            }
            self.eap_req = false;
        }

        if self.aaa_eap_resp {
            if let Some(resp) = self.aaa_eap_resp_data.clone() {
                out.radius_request = Some(RadiusRequest {
                    message: resp,
                    identity: self.aaa_identity.clone().unwrap_or_default(),
                    state: self.radius_state_attribute.clone(),
                });
            }
            self.aaa_eap_resp = false;
        }

        if self.eap_success {
            debug!(mac = %self.src_mac, "authentication succeeded");
            out.auth_success = true;
        }
        if self.eap_fail {
            debug!(mac = %self.src_mac, "authentication failed");
            out.auth_failure = true;
        }
        if self.eap_timeout {
            warn!(mac = %self.src_mac, "AAA exchange timed out");
            out.auth_failure = true;
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dot1x_codec::EapCode;

    fn mac() -> MacAddress {
        MacAddress::new([0, 1, 2, 3, 4, 5])
    }

    #[test]
    fn eapol_start_yields_identity_request() {
        let mut sm = EapStateMachine::new(mac());
        let out = sm.handle(Event::MessageReceived(EapMessage::EapolStart { src_mac: mac() }));
        match out.eap_frame {
            Some(EapMessage::Identity { code: EapCode::Request, .. }) => {}
            other => panic!("expected Identity Request, got {other:?}"),
        }
    }

    #[test]
    fn identity_response_is_passed_through_to_radius() {
        let mut sm = EapStateMachine::new(mac());
        sm.handle(Event::MessageReceived(EapMessage::EapolStart { src_mac: mac() }));
        let out = sm.handle(Event::MessageReceived(EapMessage::Identity {
            src_mac: mac(),
            message_id: 1,
            code: EapCode::Response,
            identity: "alice".to_string(),
        }));
        let req = out.radius_request.expect("expected a RADIUS request");
        assert_eq!(req.identity, "alice");
    }

    #[test]
    fn radius_challenge_is_forwarded_to_supplicant() {
        let mut sm = EapStateMachine::new(mac());
        sm.handle(Event::MessageReceived(EapMessage::EapolStart { src_mac: mac() }));
        sm.handle(Event::MessageReceived(EapMessage::Identity {
            src_mac: mac(),
            message_id: 1,
            code: EapCode::Response,
            identity: "alice".to_string(),
        }));
        let challenge = EapMessage::Md5Challenge {
            src_mac: mac(),
            message_id: 2,
            code: EapCode::Request,
            value: vec![1, 2, 3, 4],
            name: vec![],
        };
        let out = sm.handle(Event::RadiusMessageReceived {
            message: challenge.clone(),
            state: Some(b"abc".to_vec()),
        });
        assert_eq!(out.eap_frame, Some(challenge));
    }

    #[test]
    fn radius_success_ends_in_eap_success() {
        let mut sm = EapStateMachine::new(mac());
        sm.handle(Event::MessageReceived(EapMessage::EapolStart { src_mac: mac() }));
        sm.handle(Event::MessageReceived(EapMessage::Identity {
            src_mac: mac(),
            message_id: 1,
            code: EapCode::Response,
            identity: "alice".to_string(),
        }));
        let success = EapMessage::Success {
            src_mac: mac(),
            message_id: 2,
        };
        let out = sm.handle(Event::RadiusMessageReceived {
            message: success.clone(),
            state: None,
        });
        assert_eq!(out.eap_frame, Some(success));
        assert!(out.auth_success);
        assert!(sm.is_authenticated());
    }

    #[test]
    fn radius_reject_ends_in_eap_failure() {
        let mut sm = EapStateMachine::new(mac());
        sm.handle(Event::MessageReceived(EapMessage::EapolStart { src_mac: mac() }));
        sm.handle(Event::MessageReceived(EapMessage::Identity {
            src_mac: mac(),
            message_id: 1,
            code: EapCode::Response,
            identity: "alice".to_string(),
        }));
        let failure = EapMessage::Failure {
            src_mac: mac(),
            message_id: 2,
        };
        let out = sm.handle(Event::RadiusMessageReceived {
            message: failure.clone(),
            state: None,
        });
        assert_eq!(out.eap_frame, Some(failure));
        assert!(out.auth_failure);
    }

    #[test]
    fn logoff_disables_the_port() {
        let mut sm = EapStateMachine::new(mac());
        sm.handle(Event::MessageReceived(EapMessage::EapolLogoff { src_mac: mac() }));
        assert!(!sm.port_enabled);
    }
}
