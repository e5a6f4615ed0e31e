//! MessageBody: decoding raw delivery bytes into the type a handler expects.

use serde::de::DeserializeOwned;

use crate::domain::DecodeError;

/// A body type a handler can be bound to.
///
/// # Trait bounds
/// - `Send + 'static`: the decoded body moves into the handler's task.
pub trait MessageBody: Sized + Send + 'static {
    fn decode(raw: &[u8]) -> Result<Self, DecodeError>;
}

/// UTF-8 text, the charset producers use for string payloads.
impl MessageBody for String {
    fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        Ok(String::from_utf8(raw.to_vec())?)
    }
}

/// Raw bytes; never fails.
impl MessageBody for Vec<u8> {
    fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        Ok(raw.to_vec())
    }
}

/// JSON body decoded with serde.
///
/// ```
/// use courier_core::typed::{Json, MessageBody};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct OrderPlaced {
///     order_id: u64,
/// }
///
/// let Json(event) = Json::<OrderPlaced>::decode(br#"{"order_id": 7}"#).unwrap();
/// assert_eq!(event.order_id, 7);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> MessageBody for Json<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        Ok(Json(serde_json::from_slice(raw)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Ping {
        seq: u32,
    }

    #[test]
    fn string_decodes_utf8() {
        assert_eq!(String::decode("héllo".as_bytes()).unwrap(), "héllo");
    }

    #[test]
    fn string_rejects_invalid_utf8() {
        let err = String::decode(&[0xc3, 0x28]).unwrap_err();
        assert!(matches!(err, DecodeError::Utf8(_)));
    }

    #[test]
    fn bytes_pass_through() {
        assert_eq!(Vec::<u8>::decode(&[0, 1, 255]).unwrap(), vec![0, 1, 255]);
    }

    #[test]
    fn json_decodes_struct() {
        let Json(ping) = Json::<Ping>::decode(br#"{"seq":3}"#).unwrap();
        assert_eq!(ping, Ping { seq: 3 });
    }

    #[test]
    fn json_rejects_wrong_shape() {
        let err = Json::<Ping>::decode(br#"{"seq":"three"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }
}
