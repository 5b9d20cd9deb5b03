//! Request body serialization hook.
//!
//! The builders only see the [`RequestSerializer`] trait; concrete codecs
//! are supplied by the caller. Closures of the right shape are serializers.

use crate::error::BoxError;

/// Converts a value into the bytes sent as a request body.
pub trait RequestSerializer<T> {
    fn serialize(&self, value: &T) -> Result<Vec<u8>, BoxError>;

    /// Media type of the produced bytes, used when the caller did not add a
    /// `Content-Type` header themselves.
    fn content_type(&self) -> Option<&str> {
        None
    }
}

impl<T, F> RequestSerializer<T> for F
where
    F: Fn(&T) -> Result<Vec<u8>, BoxError>,
{
    fn serialize(&self, value: &T) -> Result<Vec<u8>, BoxError> {
        self(value)
    }
}

/// JSON body serializer backed by `serde_json`.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

#[cfg(feature = "json")]
impl<T: serde::Serialize> RequestSerializer<T> for JsonSerializer {
    fn serialize(&self, value: &T) -> Result<Vec<u8>, BoxError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn content_type(&self) -> Option<&str> {
        Some("application/json")
    }
}
