//! The keygate authenticator request protocol.
//!
//! A calling web page hands the host container a pre-processed message of
//! the form `{type, keyHandle, toSign}`. The [`Authenticator`] locates that
//! message among the host's input items, validates it into a [`Request`],
//! and then either
//!
//! - **registers**: ensures a key pair exists for the handle, issues a
//!   fresh self-signed attestation, and signs `toSign ‖ publicKey` with the
//!   attestation key, or
//! - **signs**: has the key store sign `toSign` with the handle's key,
//!   which may wait on biometric confirmation.
//!
//! Whatever happens, the host's [`Completion`] is consumed exactly once by
//! the [response finalizer](finalizer), carrying either one response item
//! with an [`Envelope`] or no items at all.
//!
//! ```text
//! AwaitingInput ─▶ Validating ─┬─▶ Registering ─┐
//!        │                     └─▶ Signing ─────┤
//!        └──────────────────────────────────────┴─▶ Finalizing ─▶ Done
//! ```

pub mod bytes;

mod config;
pub use config::*;

mod dispatcher;
pub use dispatcher::*;

mod envelope;
pub use envelope::*;

mod error;
pub use error::*;

pub mod finalizer;

pub mod host;
pub use host::{Completion, ExtensionItem, HostContext, PendingResponse, ResponseItem};

mod provisioning;
pub use provisioning::*;

mod request;
pub use request::*;

mod session;
pub use session::*;

mod signer;
pub use signer::*;
