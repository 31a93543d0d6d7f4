//! ECDH key agreement between two peers
//!
//! Each peer generates an ephemeral key pair, swaps public points over the
//! (untrusted) transport, and runs ECDH to arrive at the same shared secret.
//! The secret itself never touches the wire. Two things are derived from it:
//!
//! 1. A short pairing code both users can compare visually, defeating a
//!    network-level impersonator who cannot see the verification channel
//! 2. The session key, via HKDF (see the `session` module)

use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use super::keys::{KeyError, PublicKey, SecretKey};

/// Size of the shared secret in bytes: the curve's field width
pub const SHARED_SECRET_SIZE: usize = 32;

/// Pairing codes are the shared secret hash reduced to six decimal digits
const PAIRING_CODE_MODULUS: u32 = 1_000_000;

/// The raw output of the ECDH handshake
///
/// This is the big-endian, fixed-width x-coordinate of the shared curve
/// point, zero-padded to `SHARED_SECRET_SIZE` bytes. The padding matters:
/// a variable-width integer encoding that drops leading zero bytes would
/// disagree with the remote peer about 1 in 256 handshakes.
///
/// A `SharedSecret` exists only between handshake completion and session-key
/// derivation. It is wiped from memory on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret([u8; SHARED_SECRET_SIZE]);

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecret")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl From<[u8; SHARED_SECRET_SIZE]> for SharedSecret {
    fn from(bytes: [u8; SHARED_SECRET_SIZE]) -> Self {
        SharedSecret(bytes)
    }
}

impl SharedSecret {
    /// Run ECDH against a peer's raw public key bytes
    ///
    /// Decodes and validates the remote's uncompressed point before doing
    /// any curve arithmetic.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::InvalidPeerKey` if the remote bytes do not decode
    /// to a valid point on the curve. Do not retry with the same input.
    pub fn from_peer_bytes(local: &SecretKey, remote: &[u8]) -> Result<Self, KeyError> {
        let remote = PublicKey::try_from(remote)?;
        Ok(Self::agree(local, &remote))
    }

    /// Run ECDH against an already-decoded peer public key
    ///
    /// Symmetric by construction: `agree(a, B) == agree(b, A)`.
    pub fn agree(local: &SecretKey, remote: &PublicKey) -> Self {
        let shared = p256::ecdh::diffie_hellman(local.to_nonzero_scalar(), remote.as_affine());
        // raw_secret_bytes is the x-coordinate at the curve's full field
        // width, so the fixed-length guarantee holds here
        let mut buff = [0u8; SHARED_SECRET_SIZE];
        buff.copy_from_slice(shared.raw_secret_bytes());
        SharedSecret(buff)
    }

    /// Get a reference to the raw secret bytes
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Derive the human-verifiable pairing code for this handshake
    ///
    /// SHA-256 over the secret, first four bytes as a big-endian u32,
    /// reduced modulo one million, zero-padded to six digits. Both peers
    /// compute this independently and must display identical codes. The code
    /// is a user-facing check, not a MAC.
    pub fn pairing_code(&self) -> String {
        let digest = Sha256::digest(self.0);
        let word = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        format!("{:06}", word % PAIRING_CODE_MODULUS)
    }
}
