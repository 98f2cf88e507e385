use crate::error::{QrError, Result};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Read;

/// The content a message carries.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Bytes(Vec<u8>),
    /// Structured content, serialized as JSON when read as bytes.
    Structured(serde_json::Value),
}

/// A unit of data flowing through a pipeline: an opaque payload plus string metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    payload: Payload,
    metadata: BTreeMap<String, String>,
}

pub type MessageBatch = Vec<Message>;

impl Message {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: Payload::Bytes(bytes.into()),
            metadata: BTreeMap::new(),
        }
    }

    pub fn structured(value: serde_json::Value) -> Self {
        Self {
            payload: Payload::Structured(value),
            metadata: BTreeMap::new(),
        }
    }

    /// Reads a whole payload from `reader`. Any I/O failure is a message read error.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| QrError::MessageRead {
                reason: e.to_string(),
            })?;
        Ok(Self::new(bytes))
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn as_bytes(&self) -> Result<Cow<'_, [u8]>> {
        match &self.payload {
            Payload::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
            Payload::Structured(value) => serde_json::to_vec(value)
                .map(Cow::Owned)
                .map_err(|e| QrError::MessageRead {
                    reason: e.to_string(),
                }),
        }
    }

    /// Replaces the payload, leaving metadata untouched.
    pub fn set_bytes(&mut self, bytes: Vec<u8>) {
        self.payload = Payload::Bytes(bytes);
    }

    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self.payload {
            Payload::Bytes(bytes) => Ok(bytes),
            Payload::Structured(_) => self.as_bytes().map(Cow::into_owned),
        }
    }
}
