/// Mesh VPN cryptographic primitives - ECDSA peer authentication.
///
/// This crate provides the key handling building blocks for the mesh daemon:
/// - secp521r1 (NIST P-521) ECDSA keys: generate, load, store
/// - Base64 public key text exchange between peers
/// - PEM key file reading and writing
/// - Signing into fixed-size wire buffers and signature verification

pub mod ecdsa;

mod error;
pub use error::CryptoError;
