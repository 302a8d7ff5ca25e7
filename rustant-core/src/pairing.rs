//! # DM Pairing Protocol
//!
//! Implements a challenge-response device pairing protocol for authenticated
//! direct-message communication between the agent and trusted devices.
//!
//! The flow:
//! 1. Device requests pairing via [`PairingManager::create_challenge`].
//! 2. Agent presents a challenge (nonce) to the user.
//! 3. Device computes an HMAC response over the nonce using the shared secret.
//! 4. Agent verifies the response via [`PairingManager::verify_response`].
//! 5. On success the device is added to the paired-devices list.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Identity of a paired device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub device_id: Uuid,
    pub device_name: String,
    pub public_key: String,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// A challenge issued to a device during the pairing flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingChallenge {
    pub challenge_id: Uuid,
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
}

/// A device's response to a pairing challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingResponse {
    pub challenge_id: Uuid,
    pub device_id: Uuid,
    pub device_name: String,
    pub public_key: String,
    pub response_hmac: String,
}

/// Outcome of a pairing attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairingResult {
    Accepted,
    Rejected,
    Expired,
}

/// TOTP-style code generator and verifier (time-based one-time password).
#[derive(Debug, Clone)]
pub struct TotpVerifier {
    secret: Vec<u8>,
    /// Period in seconds for each TOTP code.
    period: u64,
    /// Number of digits in the TOTP code.
    digits: u32,
}

impl TotpVerifier {
    /// Create a new TOTP verifier with the given secret.
    pub fn new(secret: &[u8], period: u64, digits: u32) -> Self {
        Self {
            secret: secret.to_vec(),
            period,
            digits,
        }
    }

    /// Generate the current TOTP code.
    pub fn generate(&self) -> String {
        self.generate_at(Utc::now().timestamp() as u64)
    }

    /// Generate a TOTP code for a specific Unix timestamp.
    pub fn generate_at(&self, timestamp: u64) -> String {
        let counter = timestamp / self.period;
        let counter_bytes = counter.to_be_bytes();

        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(&counter_bytes);
        let result = mac.finalize().into_bytes();

        // Dynamic truncation (simplified)
        let offset = (result[result.len() - 1] & 0x0f) as usize;
        let truncated = u32::from_be_bytes([
            result[offset] & 0x7f,
            result[offset + 1],
            result[offset + 2],
            result[offset + 3],
        ]);

        let code = truncated % 10u32.pow(self.digits);
        format!("{:0>width$}", code, width = self.digits as usize)
    }

    /// Verify a TOTP code, allowing for +-1 period drift.
    pub fn verify(&self, code: &str) -> bool {
        let now = Utc::now().timestamp() as u64;
        // Check current, previous, and next period
        for offset in [0i64, -1, 1] {
            let ts = (now as i64 + offset * self.period as i64) as u64;
            if self.generate_at(ts) == code {
                return true;
            }
        }
        false
    }

    /// Verify a TOTP code at a specific timestamp.
    pub fn verify_at(&self, code: &str, timestamp: u64) -> bool {
        for offset in [0i64, -1, 1] {
            let ts = (timestamp as i64 + offset * self.period as i64) as u64;
            if self.generate_at(ts) == code {
                return true;
            }
        }
        false
    }
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Manages the device pairing lifecycle: challenge creation, verification,
/// device listing, and revocation.
#[derive(Debug, Clone, Default)]
pub struct PairingManager {
    shared_secret: Vec<u8>,
    paired_devices: Vec<DeviceIdentity>,
    pending_challenges: Vec<PairingChallenge>,
    /// Challenge validity duration in seconds.
    challenge_ttl_secs: i64,
}

impl PairingManager {
    /// Create a new pairing manager with the given shared secret.
    pub fn new(shared_secret: &[u8]) -> Self {
        Self {
            shared_secret: shared_secret.to_vec(),
            paired_devices: Vec::new(),
            pending_challenges: Vec::new(),
            challenge_ttl_secs: 300, // 5 minutes
        }
    }

    /// Create a new pairing challenge.
    pub fn create_challenge(&mut self) -> PairingChallenge {
        let mut rng = rand::thread_rng();
        let nonce_bytes: [u8; 32] = rng.gen();
        let nonce = hex::encode(nonce_bytes);

        let challenge = PairingChallenge {
            challenge_id: Uuid::new_v4(),
            nonce,
            expires_at: Utc::now() + Duration::seconds(self.challenge_ttl_secs),
        };

        self.pending_challenges.push(challenge.clone());
        challenge
    }

    /// Verify a pairing response against a pending challenge.
    pub fn verify_response(&mut self, response: &PairingResponse) -> PairingResult {
        // Find and remove the matching challenge
        let challenge_idx = self
            .pending_challenges
            .iter()
            .position(|c| c.challenge_id == response.challenge_id);

        let Some(idx) = challenge_idx else {
            return PairingResult::Rejected;
        };

        let challenge = self.pending_challenges.remove(idx);

        // Check expiry
        if Utc::now() > challenge.expires_at {
            return PairingResult::Expired;
        }

        // Verify HMAC: HMAC-SHA256(shared_secret, nonce)
        let expected = compute_hmac(&self.shared_secret, challenge.nonce.as_bytes());
        if expected != response.response_hmac {
            return PairingResult::Rejected;
        }

        // Add device
        let now = Utc::now();
        self.paired_devices.push(DeviceIdentity {
            device_id: response.device_id,
            device_name: response.device_name.clone(),
            public_key: response.public_key.clone(),
            created_at: now,
            last_seen: now,
        });

        PairingResult::Accepted
    }

    /// List all currently paired devices.
    pub fn paired_devices(&self) -> &[DeviceIdentity] {
        &self.paired_devices
    }

    /// Revoke a paired device by its ID.
    pub fn revoke_device(&mut self, device_id: &Uuid) -> bool {
        let before = self.paired_devices.len();
        self.paired_devices.retain(|d| d.device_id != *device_id);
        self.paired_devices.len() < before
    }

    /// Remove expired challenges.
    pub fn cleanup_expired(&mut self) {
        let now = Utc::now();
        self.pending_challenges.retain(|c| c.expires_at > now);
    }

    /// Number of pending (unexpired) challenges.
    pub fn pending_count(&self) -> usize {
        self.pending_challenges.len()
    }
}

/// Compute HMAC-SHA256 and return the hex-encoded result.
fn compute_hmac(key: &[u8], data: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    let result = mac.finalize().into_bytes();
    hex::encode(result)
}

// Tiny hex encoding helper (no external dep needed).
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes
            .as_ref()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
