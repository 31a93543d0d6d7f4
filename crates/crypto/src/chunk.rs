//! Per-chunk AES-256-GCM encryption/decryption
//!
//! Encrypted chunk wire format (binary):
//! ```text
//! [12 bytes: random nonce][N bytes: ciphertext][16 bytes: GCM tag]
//! ```
//!
//! Every chunk gets a fresh random nonce. Reusing a (key, nonce) pair under
//! GCM destroys both confidentiality and authenticity, so nonce freshness is
//! the central invariant of this module. The optional associated data is
//! authenticated but not encrypted; callers typically bind a chunk sequence
//! number or file id through it, which blocks reordering and cross-file
//! substitution.
//!
//! Both operations are stateless free functions taking the key explicitly.
//! There is no mutable cipher object to re-initialize per direction, so
//! concurrent workers can encrypt and decrypt chunks in parallel against the
//! same immutable session key.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce,
};
use serde::{Deserialize, Serialize};

use super::session::SessionKey;

/// Size of an AES-GCM nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of a GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Errors that can occur during chunk encryption/decryption
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// The wire buffer cannot even hold a nonce and tag. Drop the chunk;
    /// there is nothing to recover from it.
    #[error("encrypted chunk too short: {got} bytes, need at least {min}")]
    BufferTooShort { got: usize, min: usize },
    /// GCM tag verification failed: tampering, wrong key, wrong nonce, or
    /// mismatched associated data. The partial plaintext is undefined and
    /// is never returned.
    #[error("chunk authentication failed: tampered data, wrong key, or mismatched associated data")]
    AuthenticationFailure,
    /// The platform CSPRNG could not produce a nonce. Fatal.
    #[error("random source failure: {0}")]
    RandomSource(anyhow::Error),
    #[error("chunk encryption failed")]
    Encrypt,
}

/// One authenticated ciphertext frame
///
/// Self-describing: carries its own nonce and tag alongside the ciphertext,
/// so the receiver needs nothing beyond the session key and the same
/// associated data to open it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedChunk {
    nonce: [u8; NONCE_SIZE],
    ciphertext: Vec<u8>,
    tag: [u8; TAG_SIZE],
}

impl EncryptedChunk {
    /// The per-chunk nonce
    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    /// The ciphertext body (same length as the plaintext)
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// The GCM authentication tag
    pub fn tag(&self) -> &[u8; TAG_SIZE] {
        &self.tag
    }

    /// Serialize to the flat wire frame `nonce || ciphertext || tag`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_SIZE + self.ciphertext.len() + TAG_SIZE);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.tag);
        out
    }

    /// Deserialize from the flat wire frame
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::BufferTooShort` if the buffer cannot hold a
    /// nonce and tag. Length is checked before any slicing.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ChunkError> {
        let min = NONCE_SIZE + TAG_SIZE;
        if bytes.len() < min {
            return Err(ChunkError::BufferTooShort {
                got: bytes.len(),
                min,
            });
        }
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&bytes[..NONCE_SIZE]);
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&bytes[bytes.len() - TAG_SIZE..]);
        Ok(EncryptedChunk {
            nonce,
            ciphertext: bytes[NONCE_SIZE..bytes.len() - TAG_SIZE].to_vec(),
            tag,
        })
    }
}

impl Serialize for EncryptedChunk {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(&self.to_bytes())
    }
}

impl<'de> Deserialize<'de> for EncryptedChunk {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{Error, Visitor};
        use std::fmt;

        struct ChunkVisitor;

        impl<'de> Visitor<'de> for ChunkVisitor {
            type Value = EncryptedChunk;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an encrypted chunk wire frame")
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
            where
                E: Error,
            {
                EncryptedChunk::from_bytes(v).map_err(E::custom)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut bytes = Vec::new();
                while let Some(byte) = seq.next_element::<u8>()? {
                    bytes.push(byte);
                }
                EncryptedChunk::from_bytes(&bytes).map_err(A::Error::custom)
            }
        }

        // Try bytes first (for CBOR/bincode), fallback to seq (for JSON)
        deserializer.deserialize_byte_buf(ChunkVisitor)
    }
}

/// Encrypt a single file chunk under the session key
///
/// Generates a fresh random 12-byte nonce per call. The associated data,
/// when supplied, is authenticated but not encrypted and must be supplied
/// identically on decryption.
///
/// # Errors
///
/// Returns `ChunkError::RandomSource` if the CSPRNG cannot produce a nonce;
/// in that case no ciphertext is produced.
pub fn encrypt_chunk(
    key: &SessionKey,
    plaintext: &[u8],
    aad: Option<&[u8]>,
) -> Result<EncryptedChunk, ChunkError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.bytes()));

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    getrandom::getrandom(&mut nonce_bytes)
        .map_err(|e| ChunkError::RandomSource(anyhow::anyhow!("failed to generate nonce: {}", e)))?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let mut sealed = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad: aad.unwrap_or(&[]),
            },
        )
        .map_err(|_| ChunkError::Encrypt)?;

    // aes-gcm appends the tag to the ciphertext; split it back out so the
    // frame stays an explicit nonce/ciphertext/tag triple
    let tag_bytes = sealed.split_off(sealed.len() - TAG_SIZE);
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&tag_bytes);

    Ok(EncryptedChunk {
        nonce: nonce_bytes,
        ciphertext: sealed,
        tag,
    })
}

/// Decrypt a single file chunk under the session key
///
/// The same associated data passed at encryption time must be passed here,
/// or authentication fails.
///
/// # Errors
///
/// Returns `ChunkError::AuthenticationFailure` on any tag mismatch. This is
/// a hard, non-recoverable failure for the chunk: the caller decides whether
/// to abort the transfer or re-request the chunk, this function never
/// retries.
pub fn decrypt_chunk(
    key: &SessionKey,
    chunk: &EncryptedChunk,
    aad: Option<&[u8]>,
) -> Result<Vec<u8>, ChunkError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.bytes()));
    let nonce = Nonce::from_slice(&chunk.nonce);

    let mut sealed = Vec::with_capacity(chunk.ciphertext.len() + TAG_SIZE);
    sealed.extend_from_slice(&chunk.ciphertext);
    sealed.extend_from_slice(&chunk.tag);

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: &sealed,
                aad: aad.unwrap_or(&[]),
            },
        )
        .map_err(|_| {
            tracing::warn!(
                "chunk authentication failed ({} byte ciphertext)",
                chunk.ciphertext.len()
            );
            ChunkError::AuthenticationFailure
        })
}

#[cfg(test)]
mod test {
    use super::*;

    fn test_key() -> SessionKey {
        SessionKey::from([7u8; 32])
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = test_key();
        let plaintext = b"hello world, this is a test chunk for encryption";

        let chunk = encrypt_chunk(&key, plaintext, None).unwrap();
        let decrypted = decrypt_chunk(&key, &chunk, None).unwrap();

        assert_eq!(plaintext.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_roundtrip_with_associated_data() {
        let key = test_key();
        let aad = 42u64.to_be_bytes();

        let chunk = encrypt_chunk(&key, b"chunk payload", Some(&aad)).unwrap();
        let decrypted = decrypt_chunk(&key, &chunk, Some(&aad)).unwrap();
        assert_eq!(decrypted, b"chunk payload");
    }

    #[test]
    fn test_mismatched_associated_data_fails() {
        let key = test_key();

        let chunk = encrypt_chunk(&key, b"chunk payload", Some(&3u64.to_be_bytes())).unwrap();
        let result = decrypt_chunk(&key, &chunk, Some(&4u64.to_be_bytes()));
        assert!(matches!(result, Err(ChunkError::AuthenticationFailure)));

        // Dropping the associated data entirely also fails
        let result = decrypt_chunk(&key, &chunk, None);
        assert!(matches!(result, Err(ChunkError::AuthenticationFailure)));
    }

    #[test]
    fn test_decrypt_wrong_key_fails() {
        let chunk = encrypt_chunk(&test_key(), b"secret data", None).unwrap();
        let result = decrypt_chunk(&SessionKey::from([8u8; 32]), &chunk, None);
        assert!(matches!(result, Err(ChunkError::AuthenticationFailure)));
    }

    #[test]
    fn test_empty_plaintext() {
        let key = test_key();
        let chunk = encrypt_chunk(&key, b"", None).unwrap();
        assert!(chunk.ciphertext().is_empty());
        assert_eq!(decrypt_chunk(&key, &chunk, None).unwrap(), b"");
    }

    #[test]
    fn test_frame_size() {
        let chunk = encrypt_chunk(&test_key(), &[0u8; 1000], None).unwrap();
        // nonce (12) + plaintext (1000) + tag (16)
        assert_eq!(chunk.to_bytes().len(), NONCE_SIZE + 1000 + TAG_SIZE);
        assert_eq!(chunk.ciphertext().len(), 1000);
    }

    #[test]
    fn test_wire_roundtrip() {
        let chunk = encrypt_chunk(&test_key(), b"frame me", None).unwrap();
        let recovered = EncryptedChunk::from_bytes(&chunk.to_bytes()).unwrap();
        assert_eq!(chunk, recovered);
        assert_eq!(recovered.nonce(), chunk.nonce());
        assert_eq!(recovered.tag(), chunk.tag());
    }

    #[test]
    fn test_from_bytes_rejects_truncated_frame() {
        let result = EncryptedChunk::from_bytes(&[0u8; 10]);
        assert!(matches!(
            result,
            Err(ChunkError::BufferTooShort { got: 10, min: 28 })
        ));

        // One byte short of the minimum
        let result = EncryptedChunk::from_bytes(&[0u8; NONCE_SIZE + TAG_SIZE - 1]);
        assert!(matches!(result, Err(ChunkError::BufferTooShort { .. })));

        // Exactly nonce + tag is a valid empty-plaintext frame
        assert!(EncryptedChunk::from_bytes(&[0u8; NONCE_SIZE + TAG_SIZE]).is_ok());
    }

    #[test]
    fn test_tampered_frame_fails_authentication() {
        let key = test_key();
        let chunk = encrypt_chunk(&key, b"some chunk data worth protecting", None).unwrap();
        let wire = chunk.to_bytes();

        // Flip one bit in the nonce, the ciphertext, and the tag in turn
        for index in [0, NONCE_SIZE + 3, wire.len() - 1] {
            let mut corrupted = wire.clone();
            corrupted[index] ^= 0x01;
            let tampered = EncryptedChunk::from_bytes(&corrupted).unwrap();
            let result = decrypt_chunk(&key, &tampered, None);
            assert!(
                matches!(result, Err(ChunkError::AuthenticationFailure)),
                "bit flip at byte {} must fail authentication",
                index
            );
        }
    }

    #[test]
    fn test_serde_bincode_roundtrip() {
        let chunk = encrypt_chunk(&test_key(), b"serialize me", None).unwrap();
        let binary = bincode::serialize(&chunk).unwrap();
        let recovered: EncryptedChunk = bincode::deserialize(&binary).unwrap();
        assert_eq!(chunk, recovered);
    }

    #[test]
    fn test_serde_json_roundtrip() {
        let chunk = encrypt_chunk(&test_key(), b"serialize me", None).unwrap();
        let json = serde_json::to_string(&chunk).unwrap();
        let recovered: EncryptedChunk = serde_json::from_str(&json).unwrap();
        assert_eq!(chunk, recovered);
    }

    #[test]
    fn test_serde_rejects_truncated_frame() {
        let short = vec![0u8; 10];
        let serialized = bincode::serialize(&short).unwrap();
        let result: Result<EncryptedChunk, _> = bincode::deserialize(&serialized);
        assert!(result.is_err());
    }
}
