//! Abstract boundary to a pluggable serializer. The core only consumes this
//! trait; concrete codecs are feature-gated behind Cargo features.

use crate::value::StoreValue;

/// The on-disk pair every structured record holds: the original key
/// (recovering real keys on enumeration and enabling collision detection)
/// alongside the stored value.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StoredRecord {
    pub key: StoreValue,
    pub value: StoreValue,
}

/// Errors a codec implementation may report. Opaque to the core beyond
/// `Display`/`Error`.
pub type CodecError = anyhow::Error;

/// Encoder/decoder pair operating over byte streams. Implementations MUST
/// produce a self-delimiting byte sequence.
pub trait Codec: Send + Sync + 'static {
    /// Encode a structured record to bytes.
    fn encode(&self, record: &StoredRecord) -> Result<Vec<u8>, CodecError>;

    /// Decode bytes back into a structured record.
    fn decode(&self, bytes: &[u8]) -> Result<StoredRecord, CodecError>;

    /// Encode an arbitrary key for fingerprinting purposes. Uses the same
    /// serialization as `encode` so that keys equal in the data-model sense
    /// always fingerprint identically. Kept separate from `encode` (a
    /// `StoredRecord`-only method) so the trait stays object-safe.
    fn encode_key(&self, key: &StoreValue) -> Result<Vec<u8>, CodecError>;
}

#[cfg(feature = "json")]
mod json_codec {
    use super::*;

    /// Default codec: JSON via `serde_json`, enabled by the default
    /// `json` feature.
    #[derive(Default, Clone, Copy)]
    pub struct JsonCodec;

    impl Codec for JsonCodec {
        fn encode(&self, record: &StoredRecord) -> Result<Vec<u8>, CodecError> {
            Ok(serde_json::to_vec(record)?)
        }

        fn decode(&self, bytes: &[u8]) -> Result<StoredRecord, CodecError> {
            Ok(serde_json::from_slice(bytes)?)
        }

        fn encode_key(&self, key: &StoreValue) -> Result<Vec<u8>, CodecError> {
            Ok(serde_json::to_vec(key)?)
        }
    }
}

#[cfg(feature = "json")]
pub use json_codec::JsonCodec;

#[cfg(feature = "binc")]
mod bincode_codec {
    use super::*;

    /// Optional codec: `bincode`, gated behind the `binc` feature.
    #[derive(Default, Clone, Copy)]
    pub struct BincodeCodec;

    impl Codec for BincodeCodec {
        fn encode(&self, record: &StoredRecord) -> Result<Vec<u8>, CodecError> {
            Ok(bincode::serialize(record)?)
        }

        fn decode(&self, bytes: &[u8]) -> Result<StoredRecord, CodecError> {
            Ok(bincode::deserialize(bytes)?)
        }

        fn encode_key(&self, key: &StoreValue) -> Result<Vec<u8>, CodecError> {
            Ok(bincode::serialize(key)?)
        }
    }
}

#[cfg(feature = "binc")]
pub use bincode_codec::BincodeCodec;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::StoreValue;

    #[cfg(feature = "json")]
    #[test]
    fn json_codec_round_trips() {
        let codec = JsonCodec;
        let record = StoredRecord {
            key: StoreValue::Str("bar".into()),
            value: StoreValue::from(42),
        };
        let bytes = codec.encode(&record).unwrap();
        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!(decoded, record);
    }

    #[cfg(feature = "binc")]
    #[test]
    fn bincode_codec_round_trips() {
        let codec = BincodeCodec;
        let record = StoredRecord {
            key: StoreValue::Str("bar".into()),
            value: StoreValue::from(42),
        };
        let bytes = codec.encode(&record).unwrap();
        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!(decoded, record);
    }
}
