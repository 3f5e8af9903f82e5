//! Serialization implementations for covault-types
//!
//! Signer ids serialize as their Bech32m string form so off-chain
//! consumers see the same representation operators do.

use crate::SignerId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

impl Serialize for SignerId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SignerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SignerId::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use crate::SignerId;

    #[test]
    fn test_signer_json_roundtrip() {
        let id = SignerId::from_bytes([5u8; 20]);
        let json = serde_json::to_string(&id).unwrap();
        assert!(json.contains("cov1"));

        let back: SignerId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn test_signer_json_rejects_garbage() {
        let result: Result<SignerId, _> = serde_json::from_str("\"not-a-signer\"");
        assert!(result.is_err());
    }
}
