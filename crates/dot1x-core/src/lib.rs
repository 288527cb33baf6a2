//! # dot1x-core
//!
//! The authenticator's domain logic: the per-supplicant EAP pass-through
//! state machine (RFC 4137 section 7), the RADIUS packet-id allocator,
//! the retransmission timer, and the session table tying them together.
//! Nothing in this crate touches a socket or a capture device — see
//! `dot1x-net` for that.

#![warn(missing_docs)]

pub mod error;
pub mod event;
pub mod method;
pub mod packet_id;
pub mod policy;
pub mod state_machine;
pub mod supplicant;
pub mod timer;

pub use error::{CoreError, CoreResult};
pub use event::Event;
pub use method::{Method, MethodKind};
pub use packet_id::{PacketIdAllocator, PacketIdBinding};
pub use policy::{Decision, Policy};
pub use state_machine::{EapStateMachine, RadiusRequest, StepOutput};
pub use supplicant::{SupplicantSession, SupplicantTable};
pub use timer::{TimerKey, TimerScheduler};
