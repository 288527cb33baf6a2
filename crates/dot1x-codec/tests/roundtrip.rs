//! Property-based round-trip checks for the wire codecs: packing a value
//! and parsing it back must reproduce the original.

use dot1x_codec::eap::{self, EapCode, EapMessage};
use dot1x_codec::radius::{self, attr_type, RadiusAttribute, RadiusCode, RadiusPacket};
use dot1x_codec::{eapol, ethernet};
use dot1x_types::MacAddress;
use proptest::prelude::*;

fn arb_mac() -> impl Strategy<Value = MacAddress> {
    any::<[u8; 6]>().prop_map(MacAddress::new)
}

fn arb_eap_code() -> impl Strategy<Value = EapCode> {
    prop_oneof![Just(EapCode::Request), Just(EapCode::Response)]
}

proptest! {
    #[test]
    fn ethernet_round_trips(
        dst in arb_mac(),
        src in arb_mac(),
        payload in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let framed = ethernet::pack(dst, src, ethernet::ETHERTYPE_EAPOL, &payload);
        let (hdr, parsed_payload) = ethernet::parse(&framed).unwrap();
        prop_assert_eq!(hdr.dst, dst);
        prop_assert_eq!(hdr.src, src);
        prop_assert_eq!(hdr.ethertype, ethernet::ETHERTYPE_EAPOL);
        prop_assert_eq!(parsed_payload, payload.as_slice());
    }

    #[test]
    fn eapol_round_trips(
        body in proptest::collection::vec(any::<u8>(), 0..128),
    ) {
        let framed = eapol::pack(eapol::EapolType::EapPacket, &body);
        let parsed = eapol::parse(&framed).unwrap();
        prop_assert_eq!(parsed.eapol_type, eapol::EapolType::EapPacket);
        prop_assert_eq!(parsed.body, body);
    }

    #[test]
    fn eap_identity_round_trips(
        mac in arb_mac(),
        message_id in any::<u8>(),
        code in arb_eap_code(),
        identity in "[a-zA-Z0-9_@.]{0,32}",
    ) {
        let msg = EapMessage::Identity {
            src_mac: mac,
            message_id,
            code,
            identity,
        };
        let bytes = eap::pack(&msg).unwrap();
        let parsed = eap::parse(&bytes, mac).unwrap();
        prop_assert_eq!(parsed, msg);
    }

    #[test]
    fn eap_md5_challenge_round_trips(
        mac in arb_mac(),
        message_id in any::<u8>(),
        code in arb_eap_code(),
        value in proptest::collection::vec(any::<u8>(), 1..17),
    ) {
        let msg = EapMessage::Md5Challenge {
            src_mac: mac,
            message_id,
            code,
            value,
            name: vec![],
        };
        let bytes = eap::pack(&msg).unwrap();
        let parsed = eap::parse(&bytes, mac).unwrap();
        prop_assert_eq!(parsed, msg);
    }

    #[test]
    fn radius_attribute_set_round_trips(
        identifier in any::<u8>(),
        authenticator in any::<[u8; 16]>(),
        user_name in proptest::collection::vec(any::<u8>(), 1..20),
        nas_port in any::<u32>(),
    ) {
        let packet = RadiusPacket {
            code: RadiusCode::AccessRequest,
            identifier,
            authenticator,
            attributes: vec![
                RadiusAttribute::new(attr_type::USER_NAME, user_name),
                RadiusAttribute::new(attr_type::NAS_PORT, nas_port.to_be_bytes().to_vec()),
            ],
        };
        let bytes = radius::pack(&packet).unwrap();
        let parsed = radius::parse(&bytes).unwrap();
        prop_assert_eq!(parsed, packet);
    }

    #[test]
    fn eap_message_fragmentation_reassembles_exactly(
        pdu in proptest::collection::vec(any::<u8>(), 0..900),
    ) {
        let frags = radius::fragment_eap_message(&pdu);
        let packet = RadiusPacket {
            code: RadiusCode::AccessRequest,
            identifier: 1,
            authenticator: [0u8; 16],
            attributes: frags,
        };
        let bytes = radius::pack(&packet).unwrap();
        let parsed = radius::parse(&bytes).unwrap();
        prop_assert_eq!(parsed.concat_attr(attr_type::EAP_MESSAGE), pdu);
    }
}
