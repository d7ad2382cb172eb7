//! Raw (physical) and semantic value representations.

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, TimeDelta};
use std::fmt;

/// A value as decoded from a column chunk, before any interpretation.
///
/// Leaves reached through lists or maps decode to nested [`RawValue::List`]s, one
/// nesting level per repeated ancestor.
#[derive(Clone, Debug, PartialEq)]
pub enum RawValue {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    /// Three little-endian 32-bit words.
    Int96([u32; 3]),
    Float(f32),
    Double(f64),
    Bytes(Bytes),
    List(Vec<RawValue>),
}

impl RawValue {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Opaque 128-bit identifier split into two little-endian halves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId {
    /// Bytes 0..8.
    pub low: u64,
    /// Bytes 8..16.
    pub high: u64,
}

impl RowId {
    #[must_use]
    pub const fn new(low: u64, high: u64) -> Self {
        Self { low, high }
    }

    #[must_use]
    pub fn to_le_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.low.to_le_bytes());
        out[8..].copy_from_slice(&self.high.to_le_bytes());
        out
    }

    #[must_use]
    pub fn from_le_bytes(bytes: [u8; 16]) -> Self {
        let mut low = [0u8; 8];
        let mut high = [0u8; 8];
        low.copy_from_slice(&bytes[..8]);
        high.copy_from_slice(&bytes[8..]);
        Self {
            low: u64::from_le_bytes(low),
            high: u64::from_le_bytes(high),
        }
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.high, self.low)
    }
}

/// A value handed out by a cursor accessor; its variant follows the column's
/// [`SemanticType`](crate::SemanticType).
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    Int64(i64),
    RowId(RowId),
    Bytes(Vec<u8>),
    Text(String),
    Float32(f32),
    Float64(f64),
    DateTimeOffset(DateTime<FixedOffset>),
    Duration(TimeDelta),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Any integer variant widened to `i64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int8(v) => Some(i64::from(v)),
            Self::UInt8(v) => Some(i64::from(v)),
            Self::Int16(v) => Some(i64::from(v)),
            Self::UInt16(v) => Some(i64::from(v)),
            Self::Int32(v) => Some(i64::from(v)),
            Self::Int64(v) => Some(v),
            _ => None,
        }
    }

    /// Either floating-point variant widened to `f64`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float32(v) => Some(f64::from(v)),
            Self::Float64(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_row_id(&self) -> Option<RowId> {
        match self {
            Self::RowId(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::DateTimeOffset(ts) => Some(*ts),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_duration(&self) -> Option<TimeDelta> {
        match self {
            Self::Duration(d) => Some(*d),
            _ => None,
        }
    }
}

/// Natural textual form, used when stringifying list elements.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int8(v) => write!(f, "{v}"),
            Self::UInt8(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::UInt16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::RowId(v) => write!(f, "{v}"),
            Self::Bytes(v) => f.write_str(&String::from_utf8_lossy(v)),
            Self::Text(v) => f.write_str(v),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::DateTimeOffset(v) => f.write_str(&v.to_rfc3339()),
            Self::Duration(v) => write!(f, "{v}"),
        }
    }
}
