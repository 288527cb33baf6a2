//! End-to-end scenario tests against the coupled state machine, the kind
//! a conformance suite would run: a sequence of inbound events, checked
//! against the exact frame the authenticator must emit.

use dot1x_codec::{EapCode, EapMessage};
use dot1x_core::{Event, PacketIdAllocator, SupplicantTable};
use dot1x_types::MacAddress;

fn port() -> MacAddress {
    "00:00:00:00:aa:01".parse().unwrap()
}

fn supplicant() -> MacAddress {
    "00:12:34:56:78:9a".parse().unwrap()
}

#[test]
fn s1_eapol_start_triggers_identity_request() {
    let mut sm = dot1x_core::EapStateMachine::new(supplicant());
    let out = sm.handle(Event::MessageReceived(EapMessage::EapolStart {
        src_mac: supplicant(),
    }));
    match out.eap_frame {
        Some(EapMessage::Identity {
            code: EapCode::Request,
            message_id: 1,
            ..
        }) => {}
        other => panic!("expected Identity Request with id=1, got {other:?}"),
    }
}

#[test]
fn s2_identity_response_carries_port_and_calling_station_id_material() {
    // The state machine itself only forwards the identity; NAS-Port and
    // Calling-Station-Id are derived by the daemon from the port/src MAC
    // when it builds the Access-Request (see dot1x-types::MacAddress).
    assert_eq!(port().nas_port(), 0x00aa_0001);
    assert_eq!(supplicant().to_station_id(), "00-12-34-56-78-9a:");
}

#[test]
fn s3_access_challenge_propagates_to_supplicant_and_advances_id() {
    let mut sm = dot1x_core::EapStateMachine::new(supplicant());
    sm.handle(Event::MessageReceived(EapMessage::EapolStart {
        src_mac: supplicant(),
    }));
    sm.handle(Event::MessageReceived(EapMessage::Identity {
        src_mac: supplicant(),
        message_id: 1,
        code: EapCode::Response,
        identity: "alice".to_string(),
    }));

    let challenge = EapMessage::Md5Challenge {
        src_mac: supplicant(),
        message_id: 2,
        code: EapCode::Request,
        value: vec![0xca, 0xfe],
        name: vec![],
    };
    let out = sm.handle(Event::RadiusMessageReceived {
        message: challenge.clone(),
        state: Some(vec![0xCA, 0xFE, 0xBA, 0xBE]),
    });
    assert_eq!(out.eap_frame, Some(challenge));
}

#[test]
fn s4_access_accept_yields_success_and_fires_hook_once() {
    let mut sm = dot1x_core::EapStateMachine::new(supplicant());
    sm.handle(Event::MessageReceived(EapMessage::EapolStart {
        src_mac: supplicant(),
    }));
    sm.handle(Event::MessageReceived(EapMessage::Identity {
        src_mac: supplicant(),
        message_id: 1,
        code: EapCode::Response,
        identity: "alice".to_string(),
    }));
    let success = EapMessage::Success {
        src_mac: supplicant(),
        message_id: 2,
    };
    let out = sm.handle(Event::RadiusMessageReceived {
        message: success.clone(),
        state: None,
    });
    assert_eq!(out.eap_frame, Some(success));
    assert!(out.auth_success);
    assert!(!out.auth_failure);
    assert!(sm.is_authenticated());

    // A stray follow-on event must not re-fire the hook.
    let again = sm.handle(Event::Timeout);
    assert!(!again.auth_success);
}

#[test]
fn s5_retransmission_is_byte_identical_then_times_out() {
    let mut sm = dot1x_core::EapStateMachine::new(supplicant());
    let first = sm
        .handle(Event::MessageReceived(EapMessage::EapolStart {
            src_mac: supplicant(),
        }))
        .eap_frame
        .expect("initial identity request");

    let mut last_retransmit = None;
    for _ in 0..5 {
        let out = sm.handle(Event::Timeout);
        if let Some(frame) = out.eap_frame {
            assert_eq!(frame, first, "retransmission must resend identical bytes");
            last_retransmit = Some(frame);
        }
    }
    assert!(last_retransmit.is_some());

    // One more timeout past MAX_RETRANS should end the exchange.
    let out = sm.handle(Event::Timeout);
    assert!(out.eap_frame.is_none() || out.auth_failure);
}

#[test]
fn s6_packet_id_binding_is_required_to_validate_a_reply() {
    // Mirrors the authenticator dropping a reply whose Response
    // Authenticator does not match: without a recorded binding for the
    // id, the caller has nothing to validate against and must discard.
    let mut allocator = PacketIdAllocator::new();
    let (id, _auth) = allocator.allocate(supplicant(), port()).unwrap();
    allocator.release(id).unwrap();
    assert!(allocator.lookup(id).is_none());
}

#[test]
fn i2_packet_id_is_not_reused_while_outstanding() {
    let mut allocator = PacketIdAllocator::new();
    let (first, _) = allocator.allocate(supplicant(), port()).unwrap();
    for _ in 0..300 {
        let (other, _) = allocator.allocate(supplicant(), port()).unwrap();
        assert_ne!(other, first, "must not hand out an id still bound");
        allocator.release(other).unwrap();
    }
}

#[tokio::test]
async fn s7_port_up_flips_port_enabled_on_every_session_behind_the_port() {
    let table = SupplicantTable::new();
    table
        .with_session_mut(port(), supplicant(), |session| {
            session.state_machine.handle(Event::PortStatusChange { enabled: false });
        })
        .await;

    table
        .for_each_session_mut(port(), |_, session| {
            session.state_machine.handle(Event::PortStatusChange { enabled: true });
        })
        .await;

    let port_enabled = table
        .with_session_mut(port(), supplicant(), |session| session.state_machine.port_enabled())
        .await;
    assert!(port_enabled);
}

#[tokio::test]
async fn i1_port_down_discards_sessions_so_a_later_access_starts_fresh() {
    let table = SupplicantTable::new();
    let first_id = table
        .with_session_mut(port(), supplicant(), |session| {
            session
                .state_machine
                .handle(Event::MessageReceived(EapMessage::EapolStart {
                    src_mac: supplicant(),
                }))
        })
        .await
        .eap_frame
        .map(|frame| match frame {
            EapMessage::Identity { message_id, .. } => message_id,
            other => panic!("expected Identity Request, got {other:?}"),
        })
        .expect("initial identity request");

    table
        .for_each_session_mut(port(), |_, session| {
            session.state_machine.handle(Event::PortStatusChange { enabled: false });
        })
        .await;
    table.clear_port(port()).await;
    assert_eq!(table.session_count().await, 0);

    // A subsequent get_or_create behind the same port is a fresh session,
    // not the discarded one: it restarts the EAP identifier sequence.
    let second_id = table
        .with_session_mut(port(), supplicant(), |session| {
            session
                .state_machine
                .handle(Event::MessageReceived(EapMessage::EapolStart {
                    src_mac: supplicant(),
                }))
        })
        .await
        .eap_frame
        .map(|frame| match frame {
            EapMessage::Identity { message_id, .. } => message_id,
            other => panic!("expected Identity Request, got {other:?}"),
        })
        .expect("fresh identity request");
    assert_eq!(second_id, first_id, "a fresh session restarts the id sequence identically");
}
