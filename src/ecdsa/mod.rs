/// ECDSA peer authentication on secp521r1.
///
/// Provides key loading from base64 point encodings and PEM files,
/// digest signing into fixed-size buffers, and signature verification.

pub mod key;

pub use key::{EcdsaKey, SIGNATURE_SIZE};
