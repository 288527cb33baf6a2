//! Allocates RADIUS packet identifiers and remembers which supplicant and
//! Request Authenticator each outstanding one belongs to, so a reply can
//! be routed back and its Response Authenticator validated.

use std::collections::HashMap;

use dot1x_types::MacAddress;
use rand::RngCore;

use crate::error::{CoreError, CoreResult};

/// What a single outstanding RADIUS packet id is bound to.
#[derive(Debug, Clone, Copy)]
pub struct PacketIdBinding {
    /// The supplicant this exchange concerns.
    pub src_mac: MacAddress,
    /// The port (switch-side) identifier for this exchange.
    pub port_mac: MacAddress,
    /// The Request Authenticator sent with this id, needed to validate
    /// the Response Authenticator and to decode User-Password.
    pub request_authenticator: [u8; 16],
}

/// Allocates the 8-bit RADIUS packet-id space and tracks the binding for
/// each id currently in flight.
#[derive(Debug, Default)]
pub struct PacketIdAllocator {
    next: u8,
    bindings: HashMap<u8, PacketIdBinding>,
}

impl PacketIdAllocator {
    /// Creates an empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next free packet id, generates a fresh random
    /// Request Authenticator for it, and records the binding.
    pub fn allocate(&mut self, src_mac: MacAddress, port_mac: MacAddress) -> CoreResult<(u8, [u8; 16])> {
        if self.bindings.len() >= 256 {
            return Err(CoreError::PacketIdExhausted);
        }

        let mut candidate = self.next;
        loop {
            if !self.bindings.contains_key(&candidate) {
                break;
            }
            candidate = candidate.wrapping_add(1);
        }
        self.next = candidate.wrapping_add(1);

        let mut request_authenticator = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut request_authenticator);

        self.bindings.insert(
            candidate,
            PacketIdBinding {
                src_mac,
                port_mac,
                request_authenticator,
            },
        );
        Ok((candidate, request_authenticator))
    }

    /// Looks up the binding for an id without releasing it.
    #[must_use]
    pub fn lookup(&self, id: u8) -> Option<&PacketIdBinding> {
        self.bindings.get(&id)
    }

    /// Releases a packet id once its reply has been processed (or it has
    /// been abandoned after retransmission exhaustion), freeing it for
    /// reuse.
    pub fn release(&mut self, id: u8) -> CoreResult<PacketIdBinding> {
        self.bindings.remove(&id).ok_or(CoreError::UnknownPacketId(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(last: u8) -> MacAddress {
        MacAddress::new([0, 0, 0, 0, 0, last])
    }

    #[test]
    fn allocate_and_release_round_trips() {
        let mut alloc = PacketIdAllocator::new();
        let (id, auth) = alloc.allocate(mac(1), mac(2)).unwrap();
        let binding = alloc.lookup(id).unwrap();
        assert_eq!(binding.src_mac, mac(1));
        assert_eq!(binding.request_authenticator, auth);

        let released = alloc.release(id).unwrap();
        assert_eq!(released.src_mac, mac(1));
        assert!(alloc.lookup(id).is_none());
    }

    #[test]
    fn releasing_unknown_id_errors() {
        let mut alloc = PacketIdAllocator::new();
        assert!(matches!(alloc.release(9), Err(CoreError::UnknownPacketId(9))));
    }

    #[test]
    fn exhausts_after_256_outstanding_allocations() {
        let mut alloc = PacketIdAllocator::new();
        for i in 0..256u16 {
            alloc.allocate(mac(0), mac(i as u8)).unwrap();
        }
        assert!(matches!(alloc.allocate(mac(0), mac(0)), Err(CoreError::PacketIdExhausted)));
    }
}
