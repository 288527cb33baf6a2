//! Process-level wiring for the dot1x authenticator: configuration,
//! dispatcher task orchestration and the upstream notification hooks, on
//! top of the `dot1x-core` state machine and `dot1x-net`/`dot1x-codec`
//! transport and wire-format layers.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod hooks;

pub use config::DaemonConfig;
pub use dispatcher::Dispatcher;
pub use error::{DaemonError, Result};
pub use hooks::{Hooks, LoggingHooks};
