//! The two-level table of live sessions: switch port, then supplicant
//! MAC, then the state machine tracking that supplicant's exchange.

use std::collections::HashMap;

use dot1x_types::MacAddress;
use tokio::sync::RwLock;

use crate::state_machine::EapStateMachine;

/// Everything kept about one supplicant's in-progress or completed
/// exchange.
pub struct SupplicantSession {
    /// The coupled state machine driving this exchange.
    pub state_machine: EapStateMachine,
    /// The RADIUS packet id currently outstanding for this session, if
    /// any Access-Request is in flight.
    pub pending_packet_id: Option<u8>,
}

impl SupplicantSession {
    fn new(src_mac: MacAddress) -> Self {
        Self {
            state_machine: EapStateMachine::new(src_mac),
            pending_packet_id: None,
        }
    }
}

/// Port MAC -> supplicant MAC -> session. Guarded by a single `RwLock`
/// since sessions across different ports and supplicants are independent
/// and reads (the common case: routing an inbound frame) vastly outnumber
/// structural writes (a supplicant appearing or logging off).
#[derive(Default)]
pub struct SupplicantTable {
    inner: RwLock<HashMap<MacAddress, HashMap<MacAddress, SupplicantSession>>>,
}

impl SupplicantTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against the session for `(port_mac, src_mac)`, creating it
    /// first if this is a new supplicant.
    pub async fn with_session_mut<F, R>(&self, port_mac: MacAddress, src_mac: MacAddress, f: F) -> R
    where
        F: FnOnce(&mut SupplicantSession) -> R,
    {
        let mut guard = self.inner.write().await;
        let port_table = guard.entry(port_mac).or_default();
        let session = port_table.entry(src_mac).or_insert_with(|| SupplicantSession::new(src_mac));
        f(session)
    }

    /// Removes and returns the session for `(port_mac, src_mac)`, if one
    /// exists (e.g. on EAPOL-Logoff).
    pub async fn remove(&self, port_mac: MacAddress, src_mac: MacAddress) -> Option<SupplicantSession> {
        let mut guard = self.inner.write().await;
        let session = guard.get_mut(&port_mac)?.remove(&src_mac);
        if guard.get(&port_mac).is_some_and(HashMap::is_empty) {
            guard.remove(&port_mac);
        }
        session
    }

    /// Removes every session behind `port_mac` (e.g. on port link-down).
    pub async fn clear_port(&self, port_mac: MacAddress) {
        self.inner.write().await.remove(&port_mac);
    }

    /// Runs `f` against every session currently live behind `port_mac`,
    /// e.g. to deliver a `PortStatusChange` event to each of them. A no-op
    /// if the port has no sessions.
    pub async fn for_each_session_mut<F>(&self, port_mac: MacAddress, mut f: F)
    where
        F: FnMut(MacAddress, &mut SupplicantSession),
    {
        let mut guard = self.inner.write().await;
        if let Some(port_table) = guard.get_mut(&port_mac) {
            for (&src_mac, session) in port_table.iter_mut() {
                f(src_mac, session);
            }
        }
    }

    /// Total number of live sessions across every port.
    pub async fn session_count(&self) -> usize {
        self.inner.read().await.values().map(HashMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use dot1x_codec::EapMessage;

    fn mac(last: u8) -> MacAddress {
        MacAddress::new([0, 0, 0, 0, 0, last])
    }

    #[tokio::test]
    async fn creates_session_on_first_access() {
        let table = SupplicantTable::new();
        let out = table
            .with_session_mut(mac(1), mac(2), |session| {
                session
                    .state_machine
                    .handle(Event::MessageReceived(EapMessage::EapolStart { src_mac: mac(2) }))
            })
            .await;
        assert!(out.eap_frame.is_some());
        assert_eq!(table.session_count().await, 1);
    }

    #[tokio::test]
    async fn remove_drops_the_session_and_empty_port_entry() {
        let table = SupplicantTable::new();
        table
            .with_session_mut(mac(1), mac(2), |session| {
                session
                    .state_machine
                    .handle(Event::MessageReceived(EapMessage::EapolStart { src_mac: mac(2) }));
            })
            .await;
        assert!(table.remove(mac(1), mac(2)).await.is_some());
        assert_eq!(table.session_count().await, 0);
    }

    #[tokio::test]
    async fn for_each_session_mut_visits_every_supplicant_on_the_port() {
        let table = SupplicantTable::new();
        table.with_session_mut(mac(1), mac(2), |_| {}).await;
        table.with_session_mut(mac(1), mac(3), |_| {}).await;
        table.with_session_mut(mac(9), mac(2), |_| {}).await;

        let mut visited = Vec::new();
        table
            .for_each_session_mut(mac(1), |src_mac, _| visited.push(src_mac))
            .await;

        visited.sort_by_key(MacAddress::octets);
        assert_eq!(visited, vec![mac(2), mac(3)]);
    }

    #[tokio::test]
    async fn for_each_session_mut_is_a_no_op_for_an_unknown_port() {
        let table = SupplicantTable::new();
        let mut visited = 0;
        table.for_each_session_mut(mac(1), |_, _| visited += 1).await;
        assert_eq!(visited, 0);
    }
}
