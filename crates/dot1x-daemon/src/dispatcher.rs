//! The five cooperative tasks that glue the wire transports to the
//! per-supplicant state machines: `eap_rx`, `eap_tx`, `radius_tx`,
//! `radius_rx`, and the retransmission timer relay. Every task body is
//! wrapped in its own loop with per-item error handling so a single
//! malformed frame logs and moves on rather than taking the task down.

use std::sync::Arc;
use std::time::Duration;

use dot1x_codec::{attr_type, crypto, eap, radius, EapCode, EapMessage, RadiusAttribute, RadiusCode, RadiusPacket};
use dot1x_core::{Event, PacketIdAllocator, StepOutput, SupplicantTable, TimerKey, TimerScheduler};
use dot1x_net::{EapolLink, EapolLinkConfig, InboundEapol, OutboundEapol, RadiusLink, RadiusLinkConfig};
use dot1x_types::MacAddress;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::DaemonConfig;
use crate::error::Result;
use crate::hooks::Hooks;

/// NAS-Port-Type: Ethernet (15), the only value this authenticator ever
/// sends.
const NAS_PORT_TYPE_ETHERNET: u32 = 15;

/// How long to wait for a reply before retransmitting.
const RETRANS_INTERVAL: Duration = Duration::from_secs(1);

/// Capacity of the two inter-task queues (spec requires >= 1024).
const QUEUE_CAPACITY: usize = 1024;

/// How many times to retry packet-id allocation under contention before
/// giving up on a single Access-Request (a Resource error per spec: retry,
/// never silently discard).
const ALLOCATE_RETRIES: u32 = 8;

/// An EAP frame queued for delivery to a supplicant over EAPOL.
#[derive(Debug, Clone)]
struct EapTxItem {
    port_mac: MacAddress,
    src_mac: MacAddress,
    message: EapMessage,
}

/// Which RADIUS server port a pending request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RadiusRequestKind {
    Authentication,
    Accounting,
}

/// An EAP message queued for wrapping into an Access-Request (or, when
/// explicitly driven, an Accounting-Request) and sending to the AAA
/// server.
#[derive(Debug, Clone)]
struct RadiusTxItem {
    port_mac: MacAddress,
    src_mac: MacAddress,
    identity: String,
    message: EapMessage,
    state: Option<Vec<u8>>,
    kind: RadiusRequestKind,
}

/// Handles shared by every dispatcher task.
#[derive(Clone)]
struct Shared {
    supplicants: Arc<SupplicantTable>,
    timer: TimerScheduler,
    eap_tx: mpsc::Sender<EapTxItem>,
    radius_tx: mpsc::Sender<RadiusTxItem>,
    hooks: Arc<dyn Hooks>,
}

impl Shared {
    fn retrans_key(port_mac: MacAddress, src_mac: MacAddress) -> TimerKey {
        (port_mac, src_mac)
    }

    /// Flushes one [`StepOutput`]: arms/cancels the retransmission timer,
    /// enqueues outbound frames, and fires upstream hooks.
    async fn flush(&self, port_mac: MacAddress, src_mac: MacAddress, out: StepOutput) {
        let key = Self::retrans_key(port_mac, src_mac);

        if let Some(message) = out.eap_frame.clone() {
            match message.code() {
                Some(EapCode::Request) => self.timer.arm(key, RETRANS_INTERVAL),
                Some(EapCode::Success | EapCode::Failure) => self.timer.cancel(key),
                _ => {}
            }
            if self
                .eap_tx
                .send(EapTxItem {
                    port_mac,
                    src_mac,
                    message,
                })
                .await
                .is_err()
            {
                warn!(%src_mac, "EAP tx queue closed, dropping frame");
            }
        }

        if let Some(req) = out.radius_request {
            if matches!(req.message.code(), Some(EapCode::Response)) {
                if self
                    .radius_tx
                    .send(RadiusTxItem {
                        port_mac,
                        src_mac,
                        identity: req.identity,
                        message: req.message,
                        state: req.state,
                        kind: RadiusRequestKind::Authentication,
                    })
                    .await
                    .is_err()
                {
                    warn!(%src_mac, "RADIUS tx queue closed, dropping request");
                }
            }
        }

        if out.auth_success {
            self.timer.cancel(key);
            self.hooks.auth_success(src_mac, port_mac);
        }
        if out.auth_failure {
            self.timer.cancel(key);
            self.hooks.auth_failure(src_mac, port_mac);
        }
    }

    /// Delivers a port-up `PortStatusChange` to every session behind
    /// `port_mac`.
    async fn port_up(&self, port_mac: MacAddress) {
        let mut outs = Vec::new();
        self.supplicants
            .for_each_session_mut(port_mac, |src_mac, session| {
                let out = session.state_machine.handle(Event::PortStatusChange { enabled: true });
                outs.push((src_mac, out));
            })
            .await;
        for (src_mac, out) in outs {
            self.flush(port_mac, src_mac, out).await;
        }
    }

    /// Delivers a port-down `PortStatusChange` to every session behind
    /// `port_mac`, then discards them: a port that has gone down has no
    /// supplicants left to authenticate, and a fresh EAPOL-Start starts a
    /// clean session rather than resuming a stale one.
    async fn port_down(&self, port_mac: MacAddress) {
        let mut outs = Vec::new();
        self.supplicants
            .for_each_session_mut(port_mac, |src_mac, session| {
                let out = session.state_machine.handle(Event::PortStatusChange { enabled: false });
                outs.push((src_mac, out));
            })
            .await;
        for (src_mac, out) in outs {
            self.flush(port_mac, src_mac, out).await;
            self.timer.cancel(Self::retrans_key(port_mac, src_mac));
        }
        self.supplicants.clear_port(port_mac).await;
    }
}

/// Owns every long-running task behind one authenticator instance.
pub struct Dispatcher {
    tasks: Vec<JoinHandle<()>>,
    eapol_link: Arc<EapolLink>,
    shared: Shared,
}

impl Dispatcher {
    /// Opens the configured transports and spawns all five tasks.
    pub async fn spawn(config: DaemonConfig, hooks: Arc<dyn Hooks>) -> Result<Self> {
        let own_mac = config.port_id;
        let (eapol_link, inbound_rx) = EapolLink::open(
            EapolLinkConfig {
                device: config.dp_interface.clone(),
                ..EapolLinkConfig::default()
            },
            own_mac,
        )?;
        let eapol_link = Arc::new(eapol_link);

        let bind_ip = config.radius_interface_bind_ip()?;
        let radius_link = Arc::new(
            RadiusLink::bind(RadiusLinkConfig {
                bind_addr: std::net::SocketAddr::new(bind_ip, 0),
                auth_server_addr: std::net::SocketAddr::new(config.radius_ip, config.radius_auth_port),
                acct_server_addr: std::net::SocketAddr::new(config.radius_ip, config.radius_acct_port),
            })
            .await?,
        );

        let supplicants = Arc::new(SupplicantTable::new());
        let packet_ids = Arc::new(Mutex::new(PacketIdAllocator::new()));

        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let timer = TimerScheduler::spawn(fired_tx);

        let (eap_tx, eap_tx_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (radius_tx, radius_tx_rx) = mpsc::channel(QUEUE_CAPACITY);

        let shared = Shared {
            supplicants: supplicants.clone(),
            timer: timer.clone(),
            eap_tx,
            radius_tx,
            hooks,
        };

        let nas_identifier = config
            .nas_identifier
            .clone()
            .unwrap_or_else(|| own_mac.to_station_id());
        let called_station_id = own_mac.to_station_id();
        let secret = config.radius_secret.clone().into_bytes();

        let mut tasks = Vec::with_capacity(5);

        tasks.push(tokio::spawn(eap_rx_task(
            inbound_rx,
            config.port_id,
            shared.clone(),
        )));
        tasks.push(tokio::spawn(eap_tx_task(eap_tx_rx, eapol_link.clone())));
        tasks.push(tokio::spawn(radius_tx_task(
            radius_tx_rx,
            radius_link.clone(),
            packet_ids.clone(),
            secret.clone(),
            nas_identifier,
            called_station_id,
        )));
        tasks.push(tokio::spawn(radius_rx_task(
            radius_link,
            packet_ids,
            secret,
            shared.clone(),
        )));
        tasks.push(tokio::spawn(timer_relay_task(fired_rx, shared.clone())));

        Ok(Self {
            tasks,
            eapol_link,
            shared,
        })
    }

    /// Signals every task to stop and closes the underlying transports.
    /// Does not block for the tasks to finish draining.
    pub fn shutdown(&self) {
        self.eapol_link.close();
        for task in &self.tasks {
            task.abort();
        }
    }

    /// The EAPOL link's own MAC, used as the source of injected frames.
    #[must_use]
    pub fn own_mac(&self) -> MacAddress {
        self.eapol_link.own_mac()
    }

    /// Notifies every session behind `port_mac` that the port has come up.
    pub async fn port_up(&self, port_mac: MacAddress) {
        self.shared.port_up(port_mac).await;
    }

    /// Notifies every session behind `port_mac` that the port has gone
    /// down, then discards them.
    pub async fn port_down(&self, port_mac: MacAddress) {
        self.shared.port_down(port_mac).await;
    }
}

async fn eap_rx_task(mut inbound_rx: mpsc::Receiver<InboundEapol>, port_mac: MacAddress, shared: Shared) {
    while let Some(inbound) = inbound_rx.recv().await {
        let src_mac = inbound.src_mac;
        let message = match decode_message(&inbound) {
            Some(m) => m,
            None => continue,
        };

        let is_logoff = matches!(message, EapMessage::EapolLogoff { .. });

        let out = shared
            .supplicants
            .with_session_mut(port_mac, src_mac, |session| {
                session.state_machine.handle(Event::MessageReceived(message))
            })
            .await;

        shared.flush(port_mac, src_mac, out).await;

        if is_logoff {
            shared.timer.cancel(Shared::retrans_key(port_mac, src_mac));
            shared.hooks.auth_logoff(src_mac, port_mac);
            shared.supplicants.remove(port_mac, src_mac).await;
        }
    }
    debug!("eap_rx task exiting: inbound channel closed");
}

fn decode_message(inbound: &InboundEapol) -> Option<EapMessage> {
    use dot1x_codec::EapolType;
    match inbound.frame.eapol_type {
        EapolType::Start => Some(EapMessage::EapolStart { src_mac: inbound.src_mac }),
        EapolType::Logoff => Some(EapMessage::EapolLogoff { src_mac: inbound.src_mac }),
        EapolType::EapPacket => match eap::parse(&inbound.frame.body, inbound.src_mac) {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(src_mac = %inbound.src_mac, error = %e, "dropping malformed EAP PDU");
                None
            }
        },
        EapolType::Key => None,
    }
}

async fn eap_tx_task(mut queue: mpsc::Receiver<EapTxItem>, link: Arc<EapolLink>) {
    while let Some(item) = queue.recv().await {
        let bytes = match eap::pack(&item.message) {
            Ok(b) => b,
            Err(e) => {
                warn!(src_mac = %item.src_mac, error = %e, "cannot serialize outbound EAP message");
                continue;
            }
        };
        let outbound = OutboundEapol {
            dst_mac: item.src_mac,
            eapol_type: dot1x_codec::EapolType::EapPacket,
            body: bytes,
        };
        if let Err(e) = link.send(outbound) {
            warn!(src_mac = %item.src_mac, error = %e, "failed to inject EAPOL frame");
        }
    }
    debug!(own_mac = %link.own_mac(), "eap_tx task exiting: queue closed");
}

async fn radius_tx_task(
    mut queue: mpsc::Receiver<RadiusTxItem>,
    radius_link: Arc<RadiusLink>,
    packet_ids: Arc<Mutex<PacketIdAllocator>>,
    secret: Vec<u8>,
    nas_identifier: String,
    called_station_id: String,
) {
    while let Some(item) = queue.recv().await {
        let Some((identifier, request_authenticator)) =
            allocate_with_retry(&packet_ids, item.src_mac, item.port_mac).await
        else {
            error!(src_mac = %item.src_mac, "packet id space exhausted, dropping Access-Request");
            continue;
        };

        let eap_bytes = match eap::pack(&item.message) {
            Ok(b) => b,
            Err(e) => {
                warn!(src_mac = %item.src_mac, error = %e, "cannot serialize EAP message for RADIUS");
                continue;
            }
        };

        let mut attributes = vec![
            RadiusAttribute::new(attr_type::USER_NAME, item.identity.as_bytes().to_vec()),
            RadiusAttribute::new(attr_type::NAS_PORT, item.port_mac.nas_port().to_be_bytes().to_vec()),
            RadiusAttribute::new(
                attr_type::NAS_PORT_TYPE,
                NAS_PORT_TYPE_ETHERNET.to_be_bytes().to_vec(),
            ),
            RadiusAttribute::new(attr_type::NAS_IDENTIFIER, nas_identifier.as_bytes().to_vec()),
            RadiusAttribute::new(attr_type::CALLED_STATION_ID, called_station_id.as_bytes().to_vec()),
            RadiusAttribute::new(
                attr_type::CALLING_STATION_ID,
                item.src_mac.to_station_id().as_bytes().to_vec(),
            ),
        ];
        attributes.extend(radius::fragment_eap_message(&eap_bytes));
        if let Some(state) = &item.state {
            attributes.push(RadiusAttribute::new(attr_type::STATE, state.clone()));
        }

        let code = match item.kind {
            RadiusRequestKind::Authentication => RadiusCode::AccessRequest,
            RadiusRequestKind::Accounting => RadiusCode::AccountingRequest,
        };

        if matches!(item.kind, RadiusRequestKind::Authentication) {
            // Reserve the Message-Authenticator's slot with zeros so the
            // HMAC below is computed over the packet's final shape; the
            // placeholder's contents don't matter, only its presence does.
            attributes.push(RadiusAttribute::new(attr_type::MESSAGE_AUTHENTICATOR, vec![0u8; 16]));
        }

        let mut packet = RadiusPacket {
            code,
            identifier,
            authenticator: request_authenticator,
            attributes,
        };

        match item.kind {
            RadiusRequestKind::Authentication => {
                let real_ma = crypto::compute_message_authenticator(&packet, None, &secret);
                for attr in &mut packet.attributes {
                    if attr.attr_type == attr_type::MESSAGE_AUTHENTICATOR {
                        attr.value = real_ma.to_vec();
                    }
                }
            }
            RadiusRequestKind::Accounting => {
                packet.authenticator = [0u8; 16];
                packet.authenticator = crypto::compute_accounting_authenticator(&packet, &secret);
            }
        }

        let bytes = match radius::pack(&packet) {
            Ok(b) => b,
            Err(e) => {
                error!(src_mac = %item.src_mac, error = %e, "failed to serialize RADIUS packet");
                continue;
            }
        };

        let sent = match item.kind {
            RadiusRequestKind::Authentication => radius_link.send_auth(&bytes).await,
            RadiusRequestKind::Accounting => radius_link.send_acct(&bytes).await,
        };
        if let Err(e) = sent {
            error!(src_mac = %item.src_mac, error = %e, "failed to send RADIUS packet");
        }
    }
    debug!("radius_tx task exiting: queue closed");
}

async fn allocate_with_retry(
    packet_ids: &Arc<Mutex<PacketIdAllocator>>,
    src_mac: MacAddress,
    port_mac: MacAddress,
) -> Option<(u8, [u8; 16])> {
    for attempt in 0..ALLOCATE_RETRIES {
        match packet_ids.lock().await.allocate(src_mac, port_mac) {
            Ok(binding) => return Some(binding),
            Err(_) => {
                warn!(%src_mac, attempt, "packet id space full, backing off");
                tokio::time::sleep(Duration::from_millis(20 * u64::from(attempt + 1))).await;
            }
        }
    }
    None
}

async fn radius_rx_task(
    radius_link: Arc<RadiusLink>,
    packet_ids: Arc<Mutex<PacketIdAllocator>>,
    secret: Vec<u8>,
    shared: Shared,
) {
    loop {
        let (_from, bytes) = match radius_link.receive().await {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "RADIUS socket error, radius_rx task exiting");
                return;
            }
        };

        let packet = match radius::parse(&bytes) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "dropping malformed RADIUS packet");
                continue;
            }
        };

        let binding = {
            let guard = packet_ids.lock().await;
            guard.lookup(packet.identifier).copied()
        };
        let Some(binding) = binding else {
            warn!(id = packet.identifier, "RADIUS reply for unknown packet id, dropping");
            continue;
        };

        if !crypto::verify_response_authenticator(&packet, &binding.request_authenticator, &secret) {
            warn!(
                id = packet.identifier,
                src_mac = %binding.src_mac,
                "Response Authenticator mismatch, dropping"
            );
            continue;
        }

        packet_ids.lock().await.release(packet.identifier).ok();

        let eap_bytes = packet.concat_attr(attr_type::EAP_MESSAGE);
        let message = match eap::parse(&eap_bytes, binding.src_mac) {
            Ok(m) => m,
            Err(e) => {
                warn!(src_mac = %binding.src_mac, error = %e, "dropping unparsable RADIUS EAP-Message");
                continue;
            }
        };
        let state = packet.first_attr(attr_type::STATE).map(<[u8]>::to_vec);

        let out = shared
            .supplicants
            .with_session_mut(binding.port_mac, binding.src_mac, |session| {
                session
                    .state_machine
                    .handle(Event::RadiusMessageReceived { message, state })
            })
            .await;

        shared.flush(binding.port_mac, binding.src_mac, out).await;
    }
}

async fn timer_relay_task(mut fired_rx: mpsc::UnboundedReceiver<TimerKey>, shared: Shared) {
    while let Some((port_mac, src_mac)) = fired_rx.recv().await {
        let out = shared
            .supplicants
            .with_session_mut(port_mac, src_mac, |session| session.state_machine.handle(Event::Timeout))
            .await;
        shared.flush(port_mac, src_mac, out).await;
    }
    debug!("timer relay task exiting: channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingHooks {
        successes: std::sync::Mutex<Vec<(MacAddress, MacAddress)>>,
    }

    impl Hooks for RecordingHooks {
        fn auth_success(&self, supplicant: MacAddress, port: MacAddress) {
            self.successes.lock().unwrap().push((supplicant, port));
        }
        fn auth_failure(&self, _supplicant: MacAddress, _port: MacAddress) {}
        fn auth_logoff(&self, _supplicant: MacAddress, _port: MacAddress) {}
    }

    fn mac(last: u8) -> MacAddress {
        MacAddress::new([0, 0, 0, 0, 0, last])
    }

    #[tokio::test]
    async fn flush_fires_success_hook_and_enqueues_frame() {
        let (eap_tx, mut eap_tx_rx) = mpsc::channel(8);
        let (radius_tx, _radius_tx_rx) = mpsc::channel(8);
        let (fired_tx, _fired_rx) = mpsc::unbounded_channel();
        let hooks = Arc::new(RecordingHooks {
            successes: std::sync::Mutex::new(Vec::new()),
        });
        let shared = Shared {
            supplicants: Arc::new(SupplicantTable::new()),
            timer: TimerScheduler::spawn(fired_tx),
            eap_tx,
            radius_tx,
            hooks: hooks.clone(),
        };

        let out = StepOutput {
            eap_frame: Some(EapMessage::Success {
                src_mac: mac(2),
                message_id: 2,
            }),
            radius_request: None,
            auth_success: true,
            auth_failure: false,
        };
        shared.flush(mac(1), mac(2), out).await;

        assert_eq!(hooks.successes.lock().unwrap().as_slice(), &[(mac(2), mac(1))]);
        let item = eap_tx_rx.try_recv().expect("expected queued EAP frame");
        assert_eq!(item.src_mac, mac(2));
    }
}
