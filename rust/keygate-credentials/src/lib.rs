//! Key storage and attestation types for keygate.
//!
//! This crate defines the seams between the authenticator protocol and the
//! hardware it ultimately talks to:
//!
//! - [`KeyStore`]: a hardware-backed asymmetric key store addressed by
//!   [`KeyHandle`]. Private key material never leaves the store.
//! - [`UserPresence`]: the biometric confirmation a key store consults before
//!   enrolling or using a key.
//! - [`AttestationIssuer`]: produces a short-lived self-signed certificate
//!   plus the ephemeral key that signs registration data.
//!
//! A software [`MemoryKeyStore`] (enabled by the `memory` feature, on by
//! default) backs tests and the command-line host.

mod error;
pub use error::*;

mod handle;
pub use handle::*;

mod key_store;
pub use key_store::*;

mod presence;
pub use presence::*;

pub mod attestation;
pub use attestation::{
    Attestation, AttestationConfig, AttestationError, AttestationIssuer, SelfSignedAttestation,
    SelfSignedIssuer,
};

#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "memory")]
pub use memory::*;
