//! The supplicant-facing link: raw L2 capture and injection of EAPOL
//! frames on a single switch-facing interface.
//!
//! Mirrors the capture-thread-plus-channel shape used elsewhere in this
//! codebase for bridging libpcap's blocking API into async code: a single
//! OS thread owns the `pcap::Capture` handle, decodes inbound frames and
//! forwards them over an mpsc channel, and drains an outbound channel for
//! frames to inject, all within one poll loop gated by the capture's read
//! timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dot1x_codec::{eapol, ethernet};
use dot1x_types::MacAddress;
use pcap::{Active, Capture, Device};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{NetError, NetResult};

/// Configuration for opening the EAPOL capture device.
#[derive(Debug, Clone)]
pub struct EapolLinkConfig {
    /// Interface name to capture on and inject into.
    pub device: String,
    /// Promiscuous mode (the PAE group address is multicast, so this is
    /// normally required).
    pub promiscuous: bool,
    /// Snapshot length.
    pub snaplen: i32,
    /// Read buffer size in bytes.
    pub buffer_size: i32,
    /// Read timeout; also the outbound-queue poll interval.
    pub timeout_ms: i32,
}

impl Default for EapolLinkConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            promiscuous: true,
            snaplen: 2048,
            buffer_size: 1024 * 1024,
            timeout_ms: 100,
        }
    }
}

/// An inbound frame decoded off the wire: the source MAC and the EAPOL
/// frame it sent.
#[derive(Debug, Clone)]
pub struct InboundEapol {
    /// Supplicant source MAC.
    pub src_mac: MacAddress,
    /// Decoded EAPOL frame.
    pub frame: eapol::EapolFrame,
}

/// A frame queued for injection onto the wire.
#[derive(Debug, Clone)]
pub struct OutboundEapol {
    /// Destination MAC (the supplicant, or the PAE group address).
    pub dst_mac: MacAddress,
    /// EAPOL type to emit.
    pub eapol_type: eapol::EapolType,
    /// EAP PDU bytes, empty for Start/Logoff.
    pub body: Vec<u8>,
}

/// Handle to a running capture/injection worker.
pub struct EapolLink {
    own_mac: MacAddress,
    outbound_tx: mpsc::UnboundedSender<OutboundEapol>,
    stop_flag: Arc<AtomicBool>,
}

impl EapolLink {
    /// Opens the configured device and spawns the capture/injection
    /// worker thread. `own_mac` is used as the source address for
    /// injected frames.
    pub fn open(config: EapolLinkConfig, own_mac: MacAddress) -> NetResult<(Self, mpsc::Receiver<InboundEapol>)> {
        let cap = Self::open_capture(&config)?;

        let (inbound_tx, inbound_rx) = mpsc::channel(1000);
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<OutboundEapol>();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let worker_stop = stop_flag.clone();

        std::thread::spawn(move || {
            let mut cap = cap;
            loop {
                if worker_stop.load(Ordering::SeqCst) {
                    debug!("EAPOL link stopped");
                    break;
                }

                while let Ok(out) = outbound_rx.try_recv() {
                    let body = ethernet::pack(
                        out.dst_mac,
                        own_mac,
                        ethernet::ETHERTYPE_EAPOL,
                        &eapol::pack(out.eapol_type, &out.body),
                    );
                    if let Err(e) = cap.sendpacket(body) {
                        warn!("EAPOL send failed: {}", e);
                    }
                }

                match cap.next_packet() {
                    Ok(packet) => match decode_inbound(packet.data) {
                        Ok(Some(inbound)) => {
                            if inbound_tx.blocking_send(inbound).is_err() {
                                debug!("EAPOL receiver dropped, stopping link");
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => warn!("dropping unparsable frame: {}", e),
                    },
                    Err(pcap::Error::TimeoutExpired) => continue,
                    Err(e) => {
                        warn!("capture error: {}", e);
                        break;
                    }
                }
            }
            info!("EAPOL link worker exited");
        });

        Ok((
            Self {
                own_mac,
                outbound_tx,
                stop_flag,
            },
            inbound_rx,
        ))
    }

    fn open_capture(config: &EapolLinkConfig) -> NetResult<Capture<Active>> {
        let device = if config.device.is_empty() {
            Device::lookup()
                .map_err(|e| NetError::Pcap(e.to_string()))?
                .ok_or(NetError::NoDeviceFound)?
        } else {
            Device::list()
                .map_err(|e| NetError::Pcap(e.to_string()))?
                .into_iter()
                .find(|d| d.name == config.device)
                .ok_or_else(|| NetError::DeviceNotFound(config.device.clone()))?
        };

        debug!("opening EAPOL capture on device: {}", device.name);

        let mut cap = Capture::from_device(device)
            .map_err(|e| classify(&e))?
            .promisc(config.promiscuous)
            .snaplen(config.snaplen)
            .buffer_size(config.buffer_size)
            .timeout(config.timeout_ms)
            .open()
            .map_err(|e| classify(&e))?;

        cap.filter("ether proto 0x888e", true)
            .map_err(|e| NetError::Pcap(e.to_string()))?;

        Ok(cap)
    }

    /// Queues a frame for injection. Never blocks.
    pub fn send(&self, outbound: OutboundEapol) -> NetResult<()> {
        self.outbound_tx.send(outbound).map_err(|_| NetError::Closed)
    }

    /// This link's own MAC address, used as the source for injected frames.
    #[must_use]
    pub fn own_mac(&self) -> MacAddress {
        self.own_mac
    }

    /// Signals the worker thread to stop. Does not block for it to exit.
    pub fn close(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

fn classify(err: &pcap::Error) -> NetError {
    if err.to_string().to_lowercase().contains("permission") {
        NetError::PermissionDenied
    } else {
        NetError::Pcap(err.to_string())
    }
}

fn decode_inbound(data: &[u8]) -> NetResult<Option<InboundEapol>> {
    let (header, payload) = match ethernet::parse(data) {
        Ok(v) => v,
        Err(_) => return Ok(None),
    };
    if header.ethertype != ethernet::ETHERTYPE_EAPOL {
        return Ok(None);
    }
    let frame = eapol::parse(payload)?;
    Ok(Some(InboundEapol {
        src_mac: header.src,
        frame,
    }))
}
