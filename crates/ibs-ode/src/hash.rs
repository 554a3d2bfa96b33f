use ibs_core::errors::{ErrorInfo, IbsError};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hex encoded SHA-256 of the canonical JSON encoding of `value`.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, IbsError> {
    let bytes = serde_json::to_vec(value).map_err(|err| {
        IbsError::Serde(
            ErrorInfo::new("hash-serialize", "failed to encode value for hashing")
                .with_hint(err.to_string()),
        )
    })?;
    let digest = Sha256::digest(bytes);
    Ok(format!("{:x}", digest))
}
