//! Session management for the SUVIDHA admin console
//!
//! Owns the admin session and everything that reacts to it: durable storage of
//! the session envelope, the guard in front of protected views, the navigator
//! those views live in, and the inactivity monitor that logs idle admins out.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod context;
pub mod guard;
pub mod idle;
pub mod monitor;
pub mod navigation;
pub mod storage;

pub use context::{SessionContext, read_envelope};
pub use guard::{GuardDecision, SessionGuard, authorize};
pub use idle::{Activity, DEFAULT_IDLE_THRESHOLD, IdleTimer, MonitorState};
pub use monitor::{InactivityMonitor, MonitorHandle};
pub use navigation::{Navigator, View};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
