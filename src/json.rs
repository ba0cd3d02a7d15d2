//! JSON payload helpers.
//!
//! [`Json`] is a string-keyed map of JSON values used to build request
//! and response bodies. [`Payload`] is the small read interface shared by
//! anything that can render itself to bytes.

use std::io::Cursor;
use std::ops::{Deref, DerefMut};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Mapping-like JSON payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Json(pub Map<String, Value>);

impl Json {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    ///
    /// ```
    /// use tessera::Json;
    ///
    /// let payload = Json::new().with("name", "Ann Lee").with("age", 23);
    /// assert_eq!(payload["age"], 23);
    /// ```
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl Deref for Json {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Json {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Map<String, Value>> for Json {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Json {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Something that can be rendered to raw bytes and to a readable buffer.
pub trait Payload {
    fn bytes(&self) -> Result<Vec<u8>>;

    fn buffer(&self) -> Result<Cursor<Vec<u8>>> {
        rw_buffer(self)
    }
}

impl Payload for Json {
    fn bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.0)?)
    }
}

impl Payload for Value {
    fn bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Readable buffer pre-populated from the payload's bytes.
pub fn rw_buffer<P: Payload + ?Sized>(payload: &P) -> Result<Cursor<Vec<u8>>> {
    Ok(Cursor::new(payload.bytes()?))
}

/// Decode `bytes` into `T`, failing on malformed or incompatible input.
pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::error::Error;

    struct FixedPayload(&'static [u8]);

    impl Payload for FixedPayload {
        fn bytes(&self) -> Result<Vec<u8>> {
            Ok(self.0.to_vec())
        }

        fn buffer(&self) -> Result<Cursor<Vec<u8>>> {
            Err(Error::msg("buffer not implemented"))
        }
    }

    #[test]
    fn test_rw_buffer_uses_bytes() {
        let payload = FixedPayload(br#"{"message": "test"}"#);
        assert!(payload.buffer().is_err());
        let buffer = rw_buffer(&payload).unwrap();
        assert_eq!(buffer.get_ref().as_slice(), payload.bytes().unwrap().as_slice());
    }

    #[test]
    fn test_buffer_is_readable() {
        let payload = Json::new().with("username", "ann");
        let mut buffer = payload.buffer().unwrap();
        let mut read = String::new();
        buffer.read_to_string(&mut read).unwrap();
        assert_eq!(read, r#"{"username":"ann"}"#);
    }

    #[test]
    fn test_decode_round_trip() {
        #[derive(Deserialize)]
        struct User {
            username: String,
            age: u32,
        }

        let bytes = Json::new().with("username", "ann").with("age", 23).bytes().unwrap();
        let user: User = decode_json(&bytes).unwrap();
        assert_eq!(user.username, "ann");
        assert_eq!(user.age, 23);
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(matches!(decode_json::<Json>(b"{not json"), Err(Error::Json(_))));
        assert!(matches!(decode_json::<Json>(b"[1, 2]"), Err(Error::Json(_))));
    }

    #[test]
    fn test_from_iter() {
        let payload: Json = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(payload.len(), 2);
        assert_eq!(payload["b"], 2);
    }
}
