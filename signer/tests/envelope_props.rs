use proptest::prelude::*;

use aegis_crypto::{keypair_from_seed, sign_message, verify_signature};
use aegis_signer::AuthenticatorEnvelope;
use aegis_types::{PublicKey, Signature};

proptest! {
    /// Any keypair and digest: encode then decode yields the same pair,
    /// and the decoded signature still verifies.
    #[test]
    fn envelope_roundtrip_for_real_signatures(
        seed in prop::array::uniform32(0u8..),
        digest in prop::array::uniform32(0u8..),
    ) {
        let keys = keypair_from_seed(&seed);
        let envelope = AuthenticatorEnvelope::new(keys.public, sign_message(&digest, &keys.private));

        let decoded = AuthenticatorEnvelope::from_bytes(&envelope.to_bytes()).unwrap();
        prop_assert_eq!(&decoded, &envelope);
        prop_assert!(verify_signature(&digest, &decoded.signature, &decoded.public_key));
    }

    /// Decoding never panics on arbitrary input.
    #[test]
    fn decode_arbitrary_bytes_does_not_panic(bytes in prop::collection::vec(any::<u8>(), 0..200)) {
        let _ = AuthenticatorEnvelope::from_bytes(&bytes);
    }

    /// Any single-byte truncation is rejected.
    #[test]
    fn truncation_is_always_rejected(cut in 0usize..98) {
        let envelope = AuthenticatorEnvelope::new(PublicKey([1u8; 32]), Signature([2u8; 64]));
        let bytes = envelope.to_bytes();
        prop_assert!(AuthenticatorEnvelope::from_bytes(&bytes[..cut]).is_err());
    }
}
