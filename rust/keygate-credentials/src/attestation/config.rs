use serde::{Deserialize, Serialize};

/// Subject, serial and validity settings for issued attestation certificates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttestationConfig {
    /// Subject common name.
    pub common_name: String,
    /// Subject organization name.
    pub organization: String,
    /// Length in bytes of the random certificate serial number (1 to 20).
    pub serial_length: usize,
    /// How long an issued certificate stays valid, in seconds from issue.
    pub validity_seconds: u32,
}

impl AttestationConfig {
    /// Longest serial number RFC 5280 allows, in bytes.
    pub const MAX_SERIAL_LENGTH: usize = 20;

    pub(crate) fn clamped_serial_length(&self) -> usize {
        self.serial_length.clamp(1, Self::MAX_SERIAL_LENGTH)
    }

    pub(crate) fn validity(&self) -> time::Duration {
        time::Duration::seconds(i64::from(self.validity_seconds.max(1)))
    }
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self {
            common_name: "Keygate Attestation".into(),
            organization: "Keygate".into(),
            serial_length: 16,
            validity_seconds: 600,
        }
    }
}
