use std::ops::Deref;

use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey as P256PublicKey, SecretKey as P256SecretKey};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// Size of a P-256 private scalar in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Size of an uncompressed SEC1 public point in bytes: `0x04 || X || Y`
pub const PUBLIC_KEY_SIZE: usize = 65;
/// Name of the fixed curve all key material lives on
pub const CURVE_NAME: &str = "P-256";

/// Errors that can occur during key operations
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// Remote bytes did not decode to a valid point on the curve
    #[error("invalid peer key: {0}")]
    InvalidPeerKey(anyhow::Error),
    /// The platform CSPRNG could not produce bytes. Fatal, not retryable
    /// without reseeding the source.
    #[error("random source failure: {0}")]
    RandomSource(anyhow::Error),
    #[error("key error: {0}")]
    Default(#[from] anyhow::Error),
}

/// Public half of an ephemeral handshake key pair
///
/// A thin wrapper around a P-256 public key. This is the only key material
/// that ever crosses the wire: peers swap these at the start of a session and
/// feed them into ECDH to agree on a shared secret.
///
/// # Wire Format
///
/// The uncompressed SEC1 encoding `0x04 || X || Y` (65 bytes). Decoding
/// rejects anything that is not a valid point on the curve.
///
/// # Examples
///
/// ```ignore
/// let pair = KeyPair::generate()?;
/// let wire = pair.public().to_bytes();
///
/// // On the remote side
/// let remote = PublicKey::try_from(&wire[..])?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey(P256PublicKey);

impl Deref for PublicKey {
    type Target = P256PublicKey;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<P256PublicKey> for PublicKey {
    fn from(key: P256PublicKey) -> Self {
        PublicKey(key)
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = KeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(KeyError::InvalidPeerKey(anyhow::anyhow!(
                "invalid public key size, expected {}, got {}",
                PUBLIC_KEY_SIZE,
                bytes.len()
            )));
        }
        // Only the uncompressed form is part of the wire contract
        if bytes[0] != 0x04 {
            return Err(KeyError::InvalidPeerKey(anyhow::anyhow!(
                "public key is not an uncompressed SEC1 point"
            )));
        }
        let key = P256PublicKey::from_sec1_bytes(bytes)
            .map_err(|_| KeyError::InvalidPeerKey(anyhow::anyhow!("point is not on the curve")))?;
        Ok(PublicKey(key))
    }
}

impl PublicKey {
    /// Parse a public key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; PUBLIC_KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff)
            .map_err(|_| KeyError::InvalidPeerKey(anyhow::anyhow!("public key hex decode error")))?;
        Self::try_from(buff.as_slice())
    }

    /// Convert public key to its uncompressed SEC1 wire bytes
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        let point = self.0.to_encoded_point(false);
        let mut buff = [0; PUBLIC_KEY_SIZE];
        buff.copy_from_slice(point.as_bytes());
        buff
    }

    /// Convert public key to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

/// Private half of an ephemeral handshake key pair
///
/// A thin wrapper around a P-256 secret scalar. Generated fresh for every
/// session and held only in memory; there is intentionally no persistence
/// surface for it.
///
/// # Security Considerations
///
/// - Never leaves the local peer
/// - Dropped (and wiped) when the session ends
#[derive(Clone)]
pub struct SecretKey(P256SecretKey);

impl Deref for SecretKey {
    type Target = P256SecretKey;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("scalar", &"[REDACTED]")
            .finish()
    }
}

impl SecretKey {
    /// Generate a new random secret key using the platform CSPRNG
    ///
    /// A uniform 256-bit draw can land on zero or past the curve order;
    /// such draws are rejected and redrawn.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::RandomSource` if the CSPRNG is unavailable.
    pub fn generate() -> Result<Self, KeyError> {
        let mut buff = [0u8; PRIVATE_KEY_SIZE];
        loop {
            getrandom::getrandom(&mut buff).map_err(|e| {
                KeyError::RandomSource(anyhow::anyhow!("failed to generate random bytes: {}", e))
            })?;
            if let Ok(key) = P256SecretKey::from_bytes(&buff.into()) {
                buff.zeroize();
                return Ok(Self(key));
            }
        }
    }

    /// Create a secret key from a fixed-width big-endian scalar
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not exactly `PRIVATE_KEY_SIZE`
    /// bytes or encodes zero / a value past the curve order.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != PRIVATE_KEY_SIZE {
            return Err(anyhow::anyhow!(
                "invalid private key size, expected {}, got {}",
                PRIVATE_KEY_SIZE,
                bytes.len()
            )
            .into());
        }
        let mut buff = [0u8; PRIVATE_KEY_SIZE];
        buff.copy_from_slice(bytes);
        let key = P256SecretKey::from_bytes(&buff.into())
            .map_err(|_| anyhow::anyhow!("private scalar out of range"))?;
        buff.zeroize();
        Ok(Self(key))
    }

    /// Derive the public key from this secret key
    pub fn public(&self) -> PublicKey {
        PublicKey(self.0.public_key())
    }

    /// Convert secret key to its fixed-width big-endian scalar bytes
    ///
    /// The encoding is always `PRIVATE_KEY_SIZE` bytes, zero-padded at the
    /// front. Scalars must never round-trip through a variable-width integer
    /// encoding that drops leading zeroes.
    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_SIZE] {
        self.0.to_bytes().into()
    }
}

/// An ephemeral key pair for one handshake
///
/// Created once per session, destroyed at session end. The private half never
/// crosses the wire; the public half is what a peer advertises during the
/// handshake.
///
/// # Examples
///
/// ```ignore
/// let local = KeyPair::generate()?;
/// send_to_peer(local.public_bytes());
/// let shared = SharedSecret::from_peer_bytes(local.secret(), &remote_bytes)?;
/// ```
#[derive(Debug, Clone)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate an ephemeral key pair on the fixed curve
    ///
    /// # Errors
    ///
    /// Returns `KeyError::RandomSource` if the CSPRNG is unavailable.
    pub fn generate() -> Result<Self, KeyError> {
        let secret = SecretKey::generate()?;
        let public = secret.public();
        tracing::debug!("generated ephemeral {} key pair", CURVE_NAME);
        Ok(Self { secret, public })
    }

    /// The private half of the pair
    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    /// The public half of the pair
    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    /// The public half in wire encoding, ready to send to a peer
    pub fn public_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public.to_bytes()
    }
}
