//! End-to-end encryption core for SwiftDrop
//!
//! This crate is the cryptographic foundation for SwiftDrop's peer-to-peer
//! file transfers:
//!
//! - **Key Exchange**: ephemeral P-256 key pairs and ECDH key agreement
//! - **Pairing Code**: a short human-verifiable code both users compare
//! - **Session Keys**: HKDF-SHA256 derivation of the AES-256 session key
//! - **Chunk Cipher**: AES-256-GCM authenticated encryption of file chunks
//!
//! # Session Protocol
//!
//! To establish an encrypted session between two devices:
//! 1. Each peer generates an ephemeral P-256 key pair
//! 2. Peers swap uncompressed public points over the (untrusted) transport
//! 3. Each side runs ECDH to compute the same shared secret
//! 4. Both display the pairing code derived from the secret; the users
//!    compare them visually to rule out an in-path impersonator
//! 5. Each side derives the AES-256 session key via HKDF with the fixed
//!    protocol-version salt and info constants
//! 6. File data flows as self-describing `nonce || ciphertext || tag`
//!    frames, one per chunk, each under a fresh random nonce
//!
//! The transport that moves public keys and chunk frames between devices,
//! device discovery, and any persistence are collaborators outside this
//! crate. Keys live only in memory for the lifetime of one session.

/**
 * Per-chunk AES-256-GCM encryption and the
 *  `nonce || ciphertext || tag` wire frame.
 */
pub mod chunk;
/**
 * ECDH key agreement and the human-verifiable
 *  pairing code derived from the shared secret.
 */
pub mod exchange;
/**
 * Ephemeral P-256 key pairs and the uncompressed
 *  public-point wire codec.
 */
pub mod keys;
/**
 * Protocol version constants and HKDF-SHA256
 *  session key derivation.
 */
pub mod session;

pub mod prelude {
    pub use crate::chunk::{decrypt_chunk, encrypt_chunk, ChunkError, EncryptedChunk};
    pub use crate::exchange::{SharedSecret, SHARED_SECRET_SIZE};
    pub use crate::keys::{KeyError, KeyPair, PublicKey, SecretKey};
    pub use crate::session::{ProtocolVersion, SessionError, SessionKey};
}
