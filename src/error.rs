/// Unified error type for key handling operations.
///
/// Covers key decoding/encoding, key file I/O, and signing failures.
/// Signature verification never reports through this type: a mismatched
/// signature is an expected outcome and surfaces as a plain `false`.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid public key encoding: {0}")]
    InvalidKeyEncoding(String),

    #[error("unable to decode key: {0}")]
    KeyDecode(String),

    #[error("unable to encode key: {0}")]
    KeyEncode(String),

    #[error("no private key component loaded")]
    MissingPrivateKey,

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("signature buffer too small: need {need} bytes, got {got}")]
    SignatureBuffer { need: usize, got: usize },

    #[error("key file i/o: {0}")]
    Io(#[from] std::io::Error),
}
