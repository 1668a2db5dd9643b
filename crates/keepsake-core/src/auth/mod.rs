//! Master-passphrase authentication and session lifecycle.
//!
//! State machine per identity: `Unset → Configured ⇄ Locked`. A record is
//! never auto-transitioned out of `Locked` in storage; the check happens
//! live on each attempt by comparing `locked_until` against the clock.
//!
//! Sessions carry two independent deadlines: an absolute TTL fixed at
//! creation and a sliding idle timeout refreshed by every successful
//! validation. Either one expiring destroys the session.

pub mod gate;
pub mod types;

pub use gate::{AuthGate, DEFAULT_USER_ID};
pub use types::{AuthResponse, ClientInfo, PassphraseRecord, Session, SessionResponse};
