use serde::de::DeserializeOwned;
use serde::Serialize;

use tandem_wire::DataType;

use crate::error::RpcError;

mod private {
    pub trait Sealed {}
}

/// A payload encoding: a wire tag plus serde encode/decode.
///
/// The two implementations run through the same send and dispatch machinery,
/// so the protocol logic exists exactly once and the codecs stay thin.
pub trait Codec: private::Sealed + Send + Sync + 'static {
    /// Wire tag stamped on requests and responses using this codec.
    const DATA_TYPE: DataType;

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, RpcError>;

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, RpcError>;
}

/// Schemaless JSON text encoding.
pub struct JsonCodec;

/// Schema'd binary encoding.
pub struct BinCodec;

impl private::Sealed for JsonCodec {}
impl private::Sealed for BinCodec {}

impl Codec for JsonCodec {
    const DATA_TYPE: DataType = DataType::Json;

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, RpcError> {
        serde_json::to_vec(value).map_err(|err| RpcError::Encode {
            encoding: Self::DATA_TYPE,
            detail: err.to_string(),
        })
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, RpcError> {
        serde_json::from_slice(bytes).map_err(|err| RpcError::Decode {
            encoding: Self::DATA_TYPE,
            detail: err.to_string(),
        })
    }
}

impl Codec for BinCodec {
    const DATA_TYPE: DataType = DataType::Schema;

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, RpcError> {
        bincode::serialize(value).map_err(|err| RpcError::Encode {
            encoding: Self::DATA_TYPE,
            detail: err.to_string(),
        })
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, RpcError> {
        bincode::deserialize(bytes).map_err(|err| RpcError::Decode {
            encoding: Self::DATA_TYPE,
            detail: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: u32,
        name: String,
    }

    fn sample() -> Sample {
        Sample {
            id: 7,
            name: "seven".to_string(),
        }
    }

    #[test]
    fn json_roundtrip() {
        let bytes = JsonCodec::encode(&sample()).unwrap();
        let decoded: Sample = JsonCodec::decode(&bytes).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn bin_roundtrip() {
        let bytes = BinCodec::encode(&sample()).unwrap();
        let decoded: Sample = BinCodec::decode(&bytes).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn json_decode_failure_reports_encoding() {
        let result: Result<Sample, _> = JsonCodec::decode(b"not-json");
        assert!(matches!(
            result,
            Err(RpcError::Decode {
                encoding: DataType::Json,
                ..
            })
        ));
    }

    #[test]
    fn bin_decode_failure_reports_encoding() {
        let result: Result<Sample, _> = BinCodec::decode(&[0xFF]);
        assert!(matches!(
            result,
            Err(RpcError::Decode {
                encoding: DataType::Schema,
                ..
            })
        ));
    }

    #[test]
    fn encodings_are_distinct() {
        let json = JsonCodec::encode(&sample()).unwrap();
        let bin = BinCodec::encode(&sample()).unwrap();
        assert_ne!(json, bin);
    }
}
