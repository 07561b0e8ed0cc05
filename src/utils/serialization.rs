// bincode 2 with the standard configuration; every persisted type derives both
// the serde traits and bincode's Encode/Decode.
use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};

pub fn serialize<T: Serialize + bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    let config = bincode::config::standard();
    bincode::encode_to_vec(data, config)
        .map_err(|e| BlockchainError::Serialization(format!("Serialization failed: {e}")))
}

pub fn deserialize<T>(bytes: &[u8]) -> Result<T>
where
    T: for<'de> Deserialize<'de> + bincode::Decode<()>,
{
    let config = bincode::config::standard();
    let (data, _) = bincode::decode_from_slice(bytes, config)
        .map_err(|e| BlockchainError::Serialization(format!("Deserialization failed: {e}")))?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::Party;

    #[test]
    fn test_serialize_deserialize_party() {
        let party = Party::new("alice", "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2");

        let bytes = serialize(&party).expect("Serialization should work");
        let decoded: Party = deserialize(&bytes).expect("Deserialization should work");

        assert_eq!(party, decoded);
    }

    #[test]
    fn test_deserialize_invalid_data() {
        let invalid_bytes = vec![0xFF, 0xFF, 0xFF, 0xFF];
        let result: Result<Party> = deserialize(&invalid_bytes);
        assert!(result.is_err());
    }
}
