//! Raw stored types, semantic value types, and the table that maps one onto the other.
//!
//! A [`RawType`] is derived once per leaf column from its Parquet physical type plus
//! its logical/converted annotation. The [`semantic_type`] table then fixes the type
//! of the values a cursor hands out for that column.

use parquet::basic::{ConvertedType, LogicalType, TimeUnit, Type as PhysicalType};
use parquet::schema::types::Type;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The stored type of a leaf column, after interpreting its annotations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RawType {
    Boolean,
    SignedByte,
    UnsignedByte,
    Int16,
    UnsignedInt16,
    Int32,
    UnsignedInt32,
    Int64,
    UnsignedInt64,
    Int96,
    ByteArray,
    String,
    Float,
    Double,
    Decimal,
    DateTimeOffset,
    TimeOfDay,
    Interval,
    /// Leaf reached through a list or map; values are read generically and stringified.
    #[default]
    Unspecified,
}

/// The type of values produced by a cursor accessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticType {
    Boolean,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    Int64,
    /// Opaque 128-bit row identifier.
    RowId,
    Bytes,
    Text,
    Float32,
    Float64,
    DateTimeOffset,
    Duration,
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "Boolean",
            Self::Int8 => "Int8",
            Self::UInt8 => "UInt8",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::RowId => "RowId",
            Self::Bytes => "Bytes",
            Self::Text => "Text",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::DateTimeOffset => "DateTimeOffset",
            Self::Duration => "Duration",
        };
        f.write_str(name)
    }
}

/// Type Mapping Table. Anything not listed maps to [`SemanticType::Text`].
#[must_use]
pub const fn semantic_type(raw: RawType) -> SemanticType {
    match raw {
        RawType::Boolean => SemanticType::Boolean,
        RawType::SignedByte => SemanticType::Int8,
        RawType::UnsignedByte => SemanticType::UInt8,
        RawType::Int16 => SemanticType::Int16,
        RawType::UnsignedInt16 => SemanticType::UInt16,
        RawType::Int32 => SemanticType::Int32,
        RawType::Int64 => SemanticType::Int64,
        RawType::Int96 => SemanticType::RowId,
        RawType::ByteArray => SemanticType::Bytes,
        RawType::String => SemanticType::Text,
        RawType::Float => SemanticType::Float32,
        RawType::Double | RawType::Decimal => SemanticType::Float64,
        RawType::DateTimeOffset => SemanticType::DateTimeOffset,
        RawType::Interval => SemanticType::Duration,
        RawType::UnsignedInt32
        | RawType::UnsignedInt64
        | RawType::TimeOfDay
        | RawType::Unspecified => SemanticType::Text,
    }
}

/// Unit of a stored temporal integer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoredTimeUnit {
    Days,
    #[default]
    Millis,
    Micros,
    Nanos,
}

/// Per-column parameters a conversion needs beyond the raw value itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ConversionContext {
    /// Decimal scale; zero for non-decimal columns.
    pub scale: i32,
    pub time_unit: StoredTimeUnit,
    /// For [`RawType::Unspecified`] columns, the type each list element would have
    /// outside the list. Drives how scalars are rendered when stringifying.
    pub element_type: RawType,
}

/// Derive the raw type of a primitive schema node.
///
/// `large_integers_as_timestamps` routes INT96 leaves to
/// [`RawType::DateTimeOffset`] instead of [`RawType::Int96`].
/// Group nodes yield [`RawType::Unspecified`].
#[must_use]
pub fn derive_raw_type(
    ty: &Type,
    large_integers_as_timestamps: bool,
) -> (RawType, ConversionContext) {
    let Type::PrimitiveType {
        basic_info,
        physical_type,
        type_length,
        scale,
        ..
    } = ty
    else {
        return (RawType::Unspecified, ConversionContext::default());
    };

    let logical: Option<LogicalType> = basic_info.logical_type_ref().cloned();
    let converted = basic_info.converted_type();
    let mut ctx = ConversionContext::default();

    if is_decimal(logical.as_ref(), converted) {
        ctx.scale = (*scale).max(0);
        return (RawType::Decimal, ctx);
    }

    let raw = match physical_type {
        PhysicalType::BOOLEAN => RawType::Boolean,
        PhysicalType::INT32 | PhysicalType::INT64 => {
            if let Some(unit) = timestamp_unit(logical.as_ref(), converted) {
                ctx.time_unit = unit;
                RawType::DateTimeOffset
            } else if is_date(logical.as_ref(), converted) {
                ctx.time_unit = StoredTimeUnit::Days;
                RawType::DateTimeOffset
            } else if let Some(unit) = time_of_day_unit(logical.as_ref(), converted) {
                ctx.time_unit = unit;
                RawType::TimeOfDay
            } else {
                integer_raw_type(*physical_type, logical.as_ref(), converted)
            }
        }
        PhysicalType::INT96 => {
            if large_integers_as_timestamps {
                RawType::DateTimeOffset
            } else {
                RawType::Int96
            }
        }
        PhysicalType::FLOAT => RawType::Float,
        PhysicalType::DOUBLE => RawType::Double,
        PhysicalType::BYTE_ARRAY => {
            if is_string(logical.as_ref(), converted) {
                RawType::String
            } else {
                RawType::ByteArray
            }
        }
        PhysicalType::FIXED_LEN_BYTE_ARRAY => {
            if converted == ConvertedType::INTERVAL && *type_length == 12 {
                RawType::Interval
            } else {
                RawType::ByteArray
            }
        }
    };
    (raw, ctx)
}

fn integer_raw_type(
    physical: PhysicalType,
    logical: Option<&LogicalType>,
    converted: ConvertedType,
) -> RawType {
    let annotation = match logical {
        Some(LogicalType::Integer {
            bit_width,
            is_signed,
        }) => Some((*bit_width, *is_signed)),
        _ => match converted {
            ConvertedType::INT_8 => Some((8, true)),
            ConvertedType::UINT_8 => Some((8, false)),
            ConvertedType::INT_16 => Some((16, true)),
            ConvertedType::UINT_16 => Some((16, false)),
            ConvertedType::INT_32 => Some((32, true)),
            ConvertedType::UINT_32 => Some((32, false)),
            ConvertedType::INT_64 => Some((64, true)),
            ConvertedType::UINT_64 => Some((64, false)),
            _ => None,
        },
    };
    match (physical, annotation) {
        (_, Some((8, true))) => RawType::SignedByte,
        (_, Some((8, false))) => RawType::UnsignedByte,
        (_, Some((16, true))) => RawType::Int16,
        (_, Some((16, false))) => RawType::UnsignedInt16,
        (PhysicalType::INT32, Some((32, false))) => RawType::UnsignedInt32,
        (PhysicalType::INT64, Some((64, false))) => RawType::UnsignedInt64,
        (PhysicalType::INT64, _) => RawType::Int64,
        _ => RawType::Int32,
    }
}

fn is_decimal(logical: Option<&LogicalType>, converted: ConvertedType) -> bool {
    matches!(logical, Some(LogicalType::Decimal { .. })) || converted == ConvertedType::DECIMAL
}

fn is_date(logical: Option<&LogicalType>, converted: ConvertedType) -> bool {
    matches!(logical, Some(LogicalType::Date)) || converted == ConvertedType::DATE
}

fn is_string(logical: Option<&LogicalType>, converted: ConvertedType) -> bool {
    matches!(
        logical,
        Some(LogicalType::String | LogicalType::Enum | LogicalType::Json)
    ) || matches!(
        converted,
        ConvertedType::UTF8 | ConvertedType::ENUM | ConvertedType::JSON
    )
}

const fn stored_unit(unit: &TimeUnit) -> StoredTimeUnit {
    match unit {
        TimeUnit::MILLIS { .. } => StoredTimeUnit::Millis,
        TimeUnit::MICROS { .. } => StoredTimeUnit::Micros,
        TimeUnit::NANOS { .. } => StoredTimeUnit::Nanos,
    }
}

fn timestamp_unit(
    logical: Option<&LogicalType>,
    converted: ConvertedType,
) -> Option<StoredTimeUnit> {
    match (logical, converted) {
        (Some(LogicalType::Timestamp { unit, .. }), _) => Some(stored_unit(unit)),
        (_, ConvertedType::TIMESTAMP_MILLIS) => Some(StoredTimeUnit::Millis),
        (_, ConvertedType::TIMESTAMP_MICROS) => Some(StoredTimeUnit::Micros),
        _ => None,
    }
}

fn time_of_day_unit(
    logical: Option<&LogicalType>,
    converted: ConvertedType,
) -> Option<StoredTimeUnit> {
    match (logical, converted) {
        (Some(LogicalType::Time { unit, .. }), _) => Some(stored_unit(unit)),
        (_, ConvertedType::TIME_MILLIS) => Some(StoredTimeUnit::Millis),
        (_, ConvertedType::TIME_MICROS) => Some(StoredTimeUnit::Micros),
        _ => None,
    }
}
