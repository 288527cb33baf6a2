//! RADIUS authenticator and attribute cryptography (RFC 2865 / RFC 3579).
//!
//! Covers the three MD5-family computations this authenticator needs:
//! the Message-Authenticator attribute (HMAC-MD5), the Response and
//! Accounting-Request authenticators (plain MD5), and the User-Password
//! block-cipher attribute encoding. None of this is a strength claim —
//! it implements what RADIUS specifies, not a modern cipher suite.

use hmac::{Hmac, Mac};
use md5::{Digest, Md5};

use crate::radius::{attr_type, RadiusAttribute, RadiusPacket};

type HmacMd5 = Hmac<Md5>;

/// Computes the HMAC-MD5 Message-Authenticator over `packet` as it would
/// appear on the wire, with the Message-Authenticator attribute's value
/// zeroed out for the computation (RFC 3579 section 3.2) and, for replies,
/// the authenticator field set to the matching request's authenticator.
#[must_use]
pub fn compute_message_authenticator(
    packet: &RadiusPacket,
    request_authenticator: Option<&[u8; 16]>,
    secret: &[u8],
) -> [u8; 16] {
    let mut scratch = packet.clone();
    if let Some(req_auth) = request_authenticator {
        scratch.authenticator = *req_auth;
    }
    for attr in &mut scratch.attributes {
        if attr.attr_type == attr_type::MESSAGE_AUTHENTICATOR {
            attr.value = vec![0u8; 16];
        }
    }
    let bytes = crate::radius::pack(&scratch).expect("scratch packet always packs");

    let mut mac = HmacMd5::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(&bytes);
    let result = mac.finalize().into_bytes();
    let mut out = [0u8; 16];
    out.copy_from_slice(&result);
    out
}

/// Builds the Message-Authenticator attribute for `packet`, replacing any
/// placeholder already present.
#[must_use]
pub fn message_authenticator_attribute(
    packet: &RadiusPacket,
    request_authenticator: Option<&[u8; 16]>,
    secret: &[u8],
) -> RadiusAttribute {
    let value = compute_message_authenticator(packet, request_authenticator, secret);
    RadiusAttribute::new(attr_type::MESSAGE_AUTHENTICATOR, value.to_vec())
}

/// Computes the Response Authenticator for an Access-Accept/Reject/Challenge
/// reply (RFC 2865 section 3): `MD5(code + id + length + request_authenticator
/// + attributes + secret)`.
#[must_use]
pub fn compute_response_authenticator(
    reply: &RadiusPacket,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> [u8; 16] {
    let mut scratch = reply.clone();
    scratch.authenticator = *request_authenticator;
    let mut bytes = crate::radius::pack(&scratch).expect("scratch packet always packs");
    bytes.extend_from_slice(secret);

    let mut hasher = Md5::new();
    hasher.update(&bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest);
    out
}

/// Verifies a reply's Response Authenticator against the request that
/// provoked it.
#[must_use]
pub fn verify_response_authenticator(
    reply: &RadiusPacket,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> bool {
    compute_response_authenticator(reply, request_authenticator, secret) == reply.authenticator
}

/// Computes the Accounting-Request Authenticator (RFC 2866 section 4):
/// `MD5(code + id + length + 16-zero-bytes + attributes + secret)`.
#[must_use]
pub fn compute_accounting_authenticator(request: &RadiusPacket, secret: &[u8]) -> [u8; 16] {
    let mut scratch = request.clone();
    scratch.authenticator = [0u8; 16];
    let mut bytes = crate::radius::pack(&scratch).expect("scratch packet always packs");
    bytes.extend_from_slice(secret);

    let mut hasher = Md5::new();
    hasher.update(&bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest);
    out
}

/// Encodes `password` as a User-Password attribute value (RFC 2865
/// section 5.2): XOR each 16-byte block with `MD5(secret + prior-ciphertext-
/// or-request-authenticator)`, zero-padding the password to a multiple of 16.
#[must_use]
pub fn encode_user_password(password: &[u8], request_authenticator: &[u8; 16], secret: &[u8]) -> Vec<u8> {
    let mut padded = password.to_vec();
    let pad_to = padded.len().div_ceil(16).max(1) * 16;
    padded.resize(pad_to, 0);

    let mut out = Vec::with_capacity(padded.len());
    let mut prev_block = *request_authenticator;
    for chunk in padded.chunks(16) {
        let mut hasher = Md5::new();
        hasher.update(secret);
        hasher.update(prev_block);
        let key = hasher.finalize();

        let mut block = [0u8; 16];
        for i in 0..16 {
            block[i] = chunk[i] ^ key[i];
        }
        out.extend_from_slice(&block);
        prev_block = block;
    }
    out
}

/// Decodes a User-Password attribute value, the inverse of
/// [`encode_user_password`]. Not needed on the authenticator's own send
/// path but kept alongside the encoder since both halves share the same
/// block-chaining construction.
#[must_use]
pub fn decode_user_password(encoded: &[u8], request_authenticator: &[u8; 16], secret: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded.len());
    let mut prev_block = *request_authenticator;
    for chunk in encoded.chunks(16) {
        let mut hasher = Md5::new();
        hasher.update(secret);
        hasher.update(prev_block);
        let key = hasher.finalize();

        for (i, byte) in chunk.iter().enumerate() {
            out.push(byte ^ key[i]);
        }
        prev_block.copy_from_slice(chunk);
    }
    while out.last() == Some(&0) {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radius::{RadiusCode, RadiusPacket};

    fn sample_packet() -> RadiusPacket {
        RadiusPacket {
            code: RadiusCode::AccessRequest,
            identifier: 4,
            authenticator: [0x42; 16],
            attributes: vec![
                RadiusAttribute::new(attr_type::USER_NAME, b"bob".to_vec()),
                RadiusAttribute::new(attr_type::MESSAGE_AUTHENTICATOR, vec![0u8; 16]),
            ],
        }
    }

    #[test]
    fn message_authenticator_is_deterministic_and_zeroes_placeholder() {
        let packet = sample_packet();
        let mac1 = compute_message_authenticator(&packet, None, b"secret");
        let mac2 = compute_message_authenticator(&packet, None, b"secret");
        assert_eq!(mac1, mac2);

        let mut tampered = packet.clone();
        for attr in &mut tampered.attributes {
            if attr.attr_type == attr_type::MESSAGE_AUTHENTICATOR {
                attr.value = vec![0xFF; 16];
            }
        }
        let mac3 = compute_message_authenticator(&tampered, None, b"secret");
        assert_eq!(mac1, mac3, "placeholder contents must not affect the digest");
    }

    #[test]
    fn response_authenticator_round_trips() {
        let request_auth = [0x07; 16];
        let mut reply = RadiusPacket {
            code: RadiusCode::AccessAccept,
            identifier: 4,
            authenticator: [0u8; 16],
            attributes: vec![],
        };
        let computed = compute_response_authenticator(&reply, &request_auth, b"secret");
        reply.authenticator = computed;
        assert!(verify_response_authenticator(&reply, &request_auth, b"secret"));
    }

    #[test]
    fn tampered_reply_fails_verification() {
        let request_auth = [0x07; 16];
        let mut reply = RadiusPacket {
            code: RadiusCode::AccessReject,
            identifier: 4,
            authenticator: [0u8; 16],
            attributes: vec![],
        };
        reply.authenticator = compute_response_authenticator(&reply, &request_auth, b"secret");
        reply.attributes.push(RadiusAttribute::new(1, b"injected".to_vec()));
        assert!(!verify_response_authenticator(&reply, &request_auth, b"secret"));
    }

    #[test]
    fn user_password_round_trips() {
        let request_auth = [0x55; 16];
        let encoded = encode_user_password(b"hunter2", &request_auth, b"secret");
        assert_eq!(encoded.len(), 16);
        let decoded = decode_user_password(&encoded, &request_auth, b"secret");
        assert_eq!(decoded, b"hunter2");
    }

    #[test]
    fn user_password_pads_to_16_byte_blocks() {
        let request_auth = [0x01; 16];
        let encoded = encode_user_password(&[0x41; 20], &request_auth, b"secret");
        assert_eq!(encoded.len(), 32);
    }
}
