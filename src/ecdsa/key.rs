//! secp521r1 ECDSA keys for peer authentication.
//!
//! Wraps p521 signing/verifying keys and adds the exchange formats the
//! mesh daemon uses: base64 point encodings for peer metadata, PEM key
//! files, and fixed-size signature buffers for the wire protocol.

use std::fmt;
use std::io::{Read, Write};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use p521::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p521::ecdsa::{Signature, SigningKey, VerifyingKey};
use p521::elliptic_curve::pkcs8::{
    DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding,
};
use p521::elliptic_curve::Generate;
use p521::SecretKey;
use tracing::{debug, error, warn};

use crate::CryptoError;

/// Size in bytes of a P-521 field element / scalar.
const FIELD_SIZE: usize = 66;

/// Maximum DER-encoded ECDSA signature length for P-521.
///
/// Two INTEGERs of at most 66 content bytes plus a 2-byte header each,
/// wrapped in a SEQUENCE whose length takes the long form (3 bytes).
/// Signatures travel on the wire in buffers of exactly this size, zero
/// padded after the DER structure.
pub const SIGNATURE_SIZE: usize = 3 + 2 * (2 + FIELD_SIZE);

/// A loaded secp521r1 key for peer authentication.
///
/// Always carries a verifying (public) component. The signing (private)
/// component is present only when the key was read from a private key
/// file or freshly generated; signing without it is an error, never a
/// panic. The curve is fixed at compile time and is not encoded in any
/// of the exchange formats, so both peers must agree on it out of band.
///
/// Keys are immutable after construction. All operations take `&self`
/// and the underlying library is thread safe for this call shape, so a
/// key may be shared across threads freely.
#[derive(Clone, Debug)]
pub struct EcdsaKey {
    /// The underlying p521 verifying key.
    verifying: VerifyingKey,
    /// The underlying p521 signing key, when loaded.
    signing: Option<SigningKey>,
}

impl EcdsaKey {
    /// Generate a new random keypair using the OS random number generator.
    ///
    /// # Returns
    /// A new `EcdsaKey` with both public and private components.
    pub fn generate() -> Self {
        let signing = SigningKey::generate();
        let verifying = *signing.verifying_key();
        EcdsaKey {
            verifying,
            signing: Some(signing),
        }
    }

    /// Create a public-only key from a base64 encoded curve point.
    ///
    /// This is the format peers exchange in metadata: standard base64 of
    /// a SEC1 point encoding (compressed or uncompressed), with no curve
    /// identifier attached.
    ///
    /// # Arguments
    /// * `encoded` - Base64 text of the SEC1 point.
    ///
    /// # Returns
    /// `Ok(EcdsaKey)` with only the public component set, or
    /// `CryptoError::InvalidKeyEncoding` if the text is not valid base64
    /// or the decoded bytes are not a point on the curve. Remote peers
    /// control this input, so a malformed value is reported, never fatal.
    pub fn from_base64_public(encoded: &str) -> Result<Self, CryptoError> {
        let point = BASE64.decode(encoded).map_err(|e| {
            debug!("base64 public key decode failed: {e}");
            CryptoError::InvalidKeyEncoding(e.to_string())
        })?;

        let verifying = VerifyingKey::from_sec1_bytes(&point).map_err(|e| {
            debug!("public key point decode failed: {e}");
            CryptoError::InvalidKeyEncoding(e.to_string())
        })?;

        Ok(EcdsaKey {
            verifying,
            signing: None,
        })
    }

    /// Serialize the public component as base64 of the compressed SEC1 point.
    ///
    /// # Returns
    /// A base64 string suitable for `from_base64_public`.
    pub fn to_base64_public(&self) -> String {
        BASE64.encode(self.verifying.to_sec1_point(true).as_bytes())
    }

    /// Read a public key from a PEM stream.
    ///
    /// Expects an SPKI `PUBLIC KEY` envelope, the format the key
    /// generation tooling writes.
    ///
    /// # Arguments
    /// * `reader` - Stream containing the PEM text.
    ///
    /// # Returns
    /// `Ok(EcdsaKey)` with only the public component set,
    /// `CryptoError::Io` if the stream cannot be read, or
    /// `CryptoError::KeyDecode` if the content does not parse.
    pub fn read_public_pem<R: Read>(mut reader: R) -> Result<Self, CryptoError> {
        let mut pem = String::new();
        reader.read_to_string(&mut pem).map_err(|e| {
            error!("unable to read ECDSA public key: {e}");
            CryptoError::Io(e)
        })?;

        let verifying = VerifyingKey::from_public_key_pem(&pem).map_err(|e| {
            error!("unable to read ECDSA public key: {e}");
            CryptoError::KeyDecode(e.to_string())
        })?;

        Ok(EcdsaKey {
            verifying,
            signing: None,
        })
    }

    /// Read a private key from a PEM stream.
    ///
    /// Accepts a SEC1 `EC PRIVATE KEY` envelope or a PKCS#8 `PRIVATE KEY`
    /// envelope. Encrypted envelopes are not supported; there is no
    /// passphrase handling anywhere in the daemon.
    ///
    /// # Arguments
    /// * `reader` - Stream containing the PEM text.
    ///
    /// # Returns
    /// `Ok(EcdsaKey)` with both components set (the public component is
    /// derived from the private scalar), `CryptoError::Io` if the stream
    /// cannot be read, or `CryptoError::KeyDecode` if the content does
    /// not parse.
    pub fn read_private_pem<R: Read>(mut reader: R) -> Result<Self, CryptoError> {
        let mut pem = String::new();
        reader.read_to_string(&mut pem).map_err(|e| {
            error!("unable to read ECDSA private key: {e}");
            CryptoError::Io(e)
        })?;

        let parsed = if pem.contains("BEGIN EC PRIVATE KEY") {
            SecretKey::from_sec1_pem(&pem)
                .map(SigningKey::from)
                .map_err(|e| e.to_string())
        } else {
            SigningKey::from_pkcs8_pem(&pem).map_err(|e| e.to_string())
        };

        let signing = parsed.map_err(|e| {
            error!("unable to read ECDSA private key: {e}");
            CryptoError::KeyDecode(e)
        })?;

        let verifying = *signing.verifying_key();
        Ok(EcdsaKey {
            verifying,
            signing: Some(signing),
        })
    }

    /// Write the public component to a stream as an SPKI PEM envelope.
    pub fn write_public_pem<W: Write>(&self, mut writer: W) -> Result<(), CryptoError> {
        let pem = self
            .verifying
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyEncode(e.to_string()))?;
        writer.write_all(pem.as_bytes())?;
        Ok(())
    }

    /// Write the private key to a stream as a SEC1 `EC PRIVATE KEY` PEM
    /// envelope.
    ///
    /// The intermediate PEM text is held in a zeroizing buffer and wiped
    /// once written.
    ///
    /// # Returns
    /// `Ok(())` on success, `CryptoError::MissingPrivateKey` when called
    /// on a public-only key.
    pub fn write_private_pem<W: Write>(&self, mut writer: W) -> Result<(), CryptoError> {
        let signing = self.signing.as_ref().ok_or(CryptoError::MissingPrivateKey)?;
        let pem = SecretKey::from(signing)
            .to_sec1_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyEncode(e.to_string()))?;
        writer.write_all(pem.as_bytes())?;
        Ok(())
    }

    /// Whether the private component is loaded.
    pub fn has_private(&self) -> bool {
        self.signing.is_some()
    }

    /// Maximum encoded signature length for this key.
    ///
    /// Constant for the curve; independent of message content or length.
    pub fn signature_size(&self) -> usize {
        SIGNATURE_SIZE
    }

    /// Sign a digest, returning an owned fixed-size signature buffer.
    ///
    /// No hashing is performed here: `message` is treated as a pre-hashed
    /// digest and peers must agree on the hash choice out of band. Input
    /// longer than 66 bytes keeps its leftmost 66 bytes; shorter input is
    /// left-padded with zeros.
    ///
    /// Signatures are deterministic (RFC 6979 nonces).
    ///
    /// # Arguments
    /// * `message` - The digest to sign.
    ///
    /// # Returns
    /// A buffer of exactly [`SIGNATURE_SIZE`] bytes: the DER signature
    /// followed by zero padding. `CryptoError::MissingPrivateKey` when
    /// called on a public-only key, `CryptoError::SigningFailed` if the
    /// underlying primitive fails.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut sig = vec![0u8; SIGNATURE_SIZE];
        self.sign_into(message, &mut sig)?;
        Ok(sig)
    }

    /// Sign a digest into a caller-supplied buffer.
    ///
    /// The buffer must hold at least [`SIGNATURE_SIZE`] bytes; that
    /// region is zeroed, the DER signature is written at the front, and
    /// any bytes past [`SIGNATURE_SIZE`] are left untouched.
    ///
    /// # Arguments
    /// * `message` - The digest to sign (see [`EcdsaKey::sign`]).
    /// * `sig` - Output buffer of at least [`SIGNATURE_SIZE`] bytes.
    ///
    /// # Returns
    /// The DER length actually written, or an error:
    /// `CryptoError::SignatureBuffer` if the buffer is too small
    /// (checked before any signing work), `CryptoError::MissingPrivateKey`,
    /// or `CryptoError::SigningFailed`.
    pub fn sign_into(&self, message: &[u8], sig: &mut [u8]) -> Result<usize, CryptoError> {
        let signing = self.signing.as_ref().ok_or(CryptoError::MissingPrivateKey)?;

        if sig.len() < SIGNATURE_SIZE {
            return Err(CryptoError::SignatureBuffer {
                need: SIGNATURE_SIZE,
                got: sig.len(),
            });
        }
        sig[..SIGNATURE_SIZE].fill(0);

        let digest = normalize_digest(message);
        let produced: Signature = signing.sign_prehash(&digest).map_err(|e| {
            debug!("ECDSA signing failed: {e}");
            CryptoError::SigningFailed(e.to_string())
        })?;

        let der = produced.to_der();
        let der_bytes = der.as_bytes();
        if der_bytes.len() != SIGNATURE_SIZE {
            // A component below 2^512 shortens the DER encoding; the
            // zero padding absorbs the difference.
            warn!(
                "signature length {} != {}",
                der_bytes.len(),
                SIGNATURE_SIZE
            );
        }
        sig[..der_bytes.len()].copy_from_slice(der_bytes);
        Ok(der_bytes.len())
    }

    /// Verify a signature over a digest.
    ///
    /// Accepts the fixed-size buffer produced by [`EcdsaKey::sign`] (DER
    /// plus zero padding) or a bare DER signature; any other length fails.
    /// `message` is normalized exactly as in [`EcdsaKey::sign`].
    ///
    /// # Arguments
    /// * `message` - The digest that was signed.
    /// * `signature` - The signature buffer to check.
    ///
    /// # Returns
    /// `true` if the signature is valid for this digest and key. A bad
    /// signature is an expected outcome under adversarial conditions, so
    /// every failure returns `false` and is logged at debug severity,
    /// never escalated to an error.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let der_len = match der_signature_len(signature) {
            Some(n) if n <= signature.len() => n,
            _ => {
                debug!("ECDSA signature verification failed: malformed DER header");
                return false;
            }
        };

        if signature.len() != SIGNATURE_SIZE && signature.len() != der_len {
            debug!(
                "ECDSA signature verification failed: bad signature length {}",
                signature.len()
            );
            return false;
        }

        if signature[der_len..].iter().any(|&b| b != 0) {
            debug!("ECDSA signature verification failed: trailing garbage after DER structure");
            return false;
        }

        let sig = match Signature::from_der(&signature[..der_len]) {
            Ok(sig) => sig,
            Err(e) => {
                debug!("ECDSA signature verification failed: {e}");
                return false;
            }
        };

        let digest = normalize_digest(message);
        match self.verifying.verify_prehash(&digest, &sig) {
            Ok(()) => true,
            Err(e) => {
                debug!("ECDSA signature verification failed: {e}");
                false
            }
        }
    }
}

impl PartialEq for EcdsaKey {
    /// Two keys compare equal when their public components match.
    fn eq(&self, other: &Self) -> bool {
        self.verifying.to_sec1_point(true) == other.verifying.to_sec1_point(true)
    }
}

impl Eq for EcdsaKey {}

impl fmt::Display for EcdsaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base64_public())
    }
}

/// Normalize a caller-supplied digest to the 66-byte P-521 scalar width.
///
/// Input longer than 66 bytes keeps its leftmost bytes, matching how
/// ECDSA consumes an oversized digest; shorter input is left-padded with
/// zeros, preserving its big-endian integer value.
fn normalize_digest(message: &[u8]) -> [u8; FIELD_SIZE] {
    let mut digest = [0u8; FIELD_SIZE];
    if message.len() >= FIELD_SIZE {
        digest.copy_from_slice(&message[..FIELD_SIZE]);
    } else {
        digest[FIELD_SIZE - message.len()..].copy_from_slice(message);
    }
    digest
}

/// Length of the DER SEQUENCE at the front of a signature buffer, if the
/// header is well-formed.
///
/// P-521 signatures never exceed 255 bytes, so only the short form and
/// the single-byte long form are accepted.
fn der_signature_len(sig: &[u8]) -> Option<usize> {
    if sig.len() < 2 || sig[0] != 0x30 {
        return None;
    }
    match sig[1] {
        len @ 0x00..=0x7f => Some(2 + len as usize),
        0x81 => sig.get(2).map(|&len| 3 + len as usize),
        _ => None,
    }
}
