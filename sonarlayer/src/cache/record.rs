//! Binary records stored in the persistent cache.
//!
//! Two record kinds share the cache:
//!
//! ```text
//! Tile record (key "{ns}.{param}.{col}.{row}.{zoom}")
//! ┌────────────┬────────────────┬─────────────────────┬──────────────────┐
//! │ magic: u32 │ generation: u32│ payload_size: u64   │ payload bytes... │
//! └────────────┴────────────────┴─────────────────────┴──────────────────┘
//!   0            4                8                     16
//!
//! Modification record (key "{ns}.mc.{param}.{col}.{row}.{zoom}")
//! ┌────────────┬─────────┬─────────────────────┐
//! │ magic: u32 │ pad: u32│ generation: u64     │
//! └────────────┴─────────┴─────────────────────┘
//!   0            4         8                    16
//! ```
//!
//! All integers are little-endian and laid out with natural alignment, so the
//! writer and reader agree on a fixed 16-byte header for both kinds.

use bytes::{Buf, BufMut};

/// Magic number identifying a tile record header.
pub const TILE_MAGIC: u32 = 0x534C_5449;

/// Magic number identifying a modification record.
pub const MOD_MAGIC: u32 = 0x534C_4D43;

/// Encoded size of a [`TileHeader`].
pub const TILE_HEADER_SIZE: usize = 16;

/// Encoded size of a [`ModRecord`].
pub const MOD_RECORD_SIZE: usize = 16;

/// Header stored in front of a tile's pixel payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileHeader {
    pub magic: u32,
    /// Generation counter observed when the pixels were produced.
    pub generation: u32,
    pub payload_size: u64,
}

impl TileHeader {
    /// Header for a freshly produced payload.
    pub fn new(generation: u32, payload_size: usize) -> Self {
        Self {
            magic: TILE_MAGIC,
            generation,
            payload_size: payload_size as u64,
        }
    }

    pub fn encode(&self) -> [u8; TILE_HEADER_SIZE] {
        let mut out = [0u8; TILE_HEADER_SIZE];
        let mut buf = &mut out[..];
        buf.put_u32_le(self.magic);
        buf.put_u32_le(self.generation);
        buf.put_u64_le(self.payload_size);
        out
    }

    /// Decode a header without validating it.
    ///
    /// Returns `None` only if `bytes` has the wrong length.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != TILE_HEADER_SIZE {
            return None;
        }
        let mut buf = bytes;
        Some(Self {
            magic: buf.get_u32_le(),
            generation: buf.get_u32_le(),
            payload_size: buf.get_u64_le(),
        })
    }

    /// A record is trusted only if the magic matches and the recorded size
    /// equals the payload actually read back.
    pub fn is_valid_for(&self, payload: &[u8]) -> bool {
        self.magic == TILE_MAGIC && self.payload_size == payload.len() as u64
    }
}

/// Latest generation known to have touched a spatial cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModRecord {
    pub magic: u32,
    pub generation: u64,
}

impl ModRecord {
    pub fn new(generation: u64) -> Self {
        Self {
            magic: MOD_MAGIC,
            generation,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MOD_RECORD_SIZE);
        buf.put_u32_le(self.magic);
        buf.put_u32_le(0);
        buf.put_u64_le(self.generation);
        buf
    }

    /// Decode and validate a modification record.
    ///
    /// Returns `None` for a wrong length or a foreign magic number.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != MOD_RECORD_SIZE {
            return None;
        }
        let mut buf = bytes;
        let magic = buf.get_u32_le();
        if magic != MOD_MAGIC {
            return None;
        }
        buf.advance(4);
        Some(Self {
            magic,
            generation: buf.get_u64_le(),
        })
    }
}
