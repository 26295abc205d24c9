use proptest::prelude::*;

use mesh_crypto::ecdsa::{EcdsaKey, SIGNATURE_SIZE};

// P-521 operations are slow, keep the case count low
proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn sign_verify_roundtrip(msg in prop::collection::vec(any::<u8>(), 0..256)) {
        let key = EcdsaKey::generate();
        let sig = key.sign(&msg).unwrap();
        prop_assert_eq!(sig.len(), SIGNATURE_SIZE);
        prop_assert!(key.verify(&msg, &sig));
    }

    #[test]
    fn tampered_bit_rejected(
        msg in prop::collection::vec(any::<u8>(), 1..128),
        idx in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let key = EcdsaKey::generate();
        let sig = key.sign(&msg).unwrap();

        let mut bad = sig.clone();
        let i = idx.index(bad.len());
        bad[i] ^= 1 << bit;
        prop_assert!(!key.verify(&msg, &bad));
    }

    #[test]
    fn cross_message_rejected(
        m1 in prop::collection::vec(any::<u8>(), 32),
        m2 in prop::collection::vec(any::<u8>(), 32),
    ) {
        prop_assume!(m1 != m2);
        let key = EcdsaKey::generate();
        let sig = key.sign(&m1).unwrap();
        prop_assert!(!key.verify(&m2, &sig));
    }

    #[test]
    fn base64_roundtrip_preserves_verification(msg in prop::collection::vec(any::<u8>(), 0..64)) {
        let key = EcdsaKey::generate();
        let decoded = EcdsaKey::from_base64_public(&key.to_base64_public()).unwrap();
        let sig = key.sign(&msg).unwrap();
        prop_assert!(decoded.verify(&msg, &sig));
    }
}
