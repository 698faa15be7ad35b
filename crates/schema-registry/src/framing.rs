//! Wire framing of encoded records.
//!
//! A frame is laid out as:
//!
//! ```text
//! +--------+-------------+------------------+-------------------+
//! | 0x03   | compression | schema id (16 B) | Avro datum        |
//! +--------+-------------+------------------+-------------------+
//! ```
//!
//! The schema id is the UUID of the registered schema version, big-endian.

use crate::error::{RegistryError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// First byte of every frame.
pub const HEADER_VERSION_BYTE: u8 = 3;

/// Header version byte, compression byte and schema id.
pub const HEADER_LEN: usize = 2 + 16;

/// Payload compression marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    /// Recognised on the wire, not supported by this codec.
    Zlib,
}

impl Compression {
    pub fn as_byte(self) -> u8 {
        match self {
            Compression::None => 0,
            Compression::Zlib => 5,
        }
    }

    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(Compression::None),
            5 => Ok(Compression::Zlib),
            other => Err(RegistryError::InvalidFrame(format!(
                "unknown compression byte {other}"
            ))),
        }
    }

    fn ensure_supported(self) -> Result<()> {
        match self {
            Compression::None => Ok(()),
            Compression::Zlib => Err(RegistryError::UnsupportedCompression("zlib".to_string())),
        }
    }
}

/// A decoded frame borrowing its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub compression: Compression,
    pub schema_id: Uuid,
    pub payload: &'a [u8],
}

/// Frame `payload` written with schema `schema_id`.
pub fn encode_frame(schema_id: Uuid, compression: Compression, payload: &[u8]) -> Result<Bytes> {
    compression.ensure_supported()?;
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u8(HEADER_VERSION_BYTE);
    buf.put_u8(compression.as_byte());
    buf.put_slice(schema_id.as_bytes());
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Split a frame into its header fields and payload.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame<'_>> {
    if bytes.len() < HEADER_LEN {
        return Err(RegistryError::InvalidFrame(format!(
            "{} bytes is shorter than the {HEADER_LEN} byte header",
            bytes.len()
        )));
    }
    if bytes[0] != HEADER_VERSION_BYTE {
        return Err(RegistryError::UnsupportedHeaderVersion(bytes[0]));
    }
    let compression = Compression::from_byte(bytes[1])?;
    compression.ensure_supported()?;
    let schema_id = Uuid::from_slice(&bytes[2..HEADER_LEN])
        .map_err(|e| RegistryError::InvalidFrame(format!("bad schema id: {e}")))?;
    Ok(Frame {
        compression,
        schema_id,
        payload: &bytes[HEADER_LEN..],
    })
}
