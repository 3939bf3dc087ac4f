use ocm_spec::{ComponentDescriptor, Digest};
use sha2::{Digest as _, Sha256};

/// Digests a component descriptor by hashing its canonical JSON
/// serialization. Used to pin `Reference` entries to the exact content of
/// the component version they point at, and — via [`descriptor_digest`] —
/// available to any caller needing a stable fingerprint of a built
/// descriptor.
pub const HASH_ALGORITHM: &str = "SHA-256";
pub const NORMALISATION_ALGORITHM: &str = "jsonNormalisation/v1";

pub fn descriptor_digest(descriptor: &ComponentDescriptor) -> Digest {
    let bytes = serde_json::to_vec(descriptor).expect("ComponentDescriptor always serializes");
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let value = hex::encode(hasher.finalize());
    Digest {
        hash_algorithm: HASH_ALGORITHM.to_string(),
        normalisation_algorithm: Some(NORMALISATION_ALGORITHM.to_string()),
        value,
    }
}
