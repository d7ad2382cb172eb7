//! Value Conversion Dispatch.
//!
//! Every [`RawType`] owns exactly one pure conversion function from a
//! [`RawValue`] to a semantic [`Value`]; [`converter_for`] is the table. A cursor
//! looks the function up once per active column and calls it on every read.
//!
//! A conversion returns `None` only when a null reaches a strict integer column.
//! The cursor turns that into [`LoaderError::NullValue`](crate::LoaderError::NullValue).
//! Other nulls map to a sentinel: `NaN` for floating point and decimals, an empty
//! vector for byte arrays, empty text for strings, [`Value::Null`] otherwise.

use crate::types::{ConversionContext, RawType, StoredTimeUnit};
use crate::value::{RawValue, RowId, Value};
use chrono::{DateTime, NaiveTime, TimeDelta};
use std::fmt::Write as _;

/// Signature shared by all entries of the dispatch table.
pub type ConvertFn = fn(&RawValue, &ConversionContext) -> Option<Value>;

/// Julian day number of 1970-01-01.
const JULIAN_UNIX_EPOCH: i64 = 2_440_588;
const NANOS_PER_DAY: i128 = 86_400_000_000_000;
const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Look up the conversion bound to `raw`.
#[must_use]
pub const fn converter_for(raw: RawType) -> ConvertFn {
    match raw {
        RawType::Boolean => to_boolean,
        RawType::SignedByte => to_i8,
        RawType::UnsignedByte => to_u8,
        RawType::Int16 => to_i16,
        RawType::UnsignedInt16 => to_u16,
        RawType::Int32 => to_i32,
        RawType::UnsignedInt32 | RawType::UnsignedInt64 => to_unsigned_text,
        RawType::Int64 => to_i64,
        RawType::Int96 => to_row_id,
        RawType::ByteArray => to_bytes,
        RawType::String => to_text,
        RawType::Float => to_f32,
        RawType::Double => to_f64,
        RawType::Decimal => to_decimal,
        RawType::DateTimeOffset => to_timestamp,
        RawType::TimeOfDay => to_time_text,
        RawType::Interval => to_duration,
        RawType::Unspecified => to_list_text,
    }
}

fn to_boolean(raw: &RawValue, _: &ConversionContext) -> Option<Value> {
    Some(match raw {
        RawValue::Boolean(b) => Value::Boolean(*b),
        _ => Value::Null,
    })
}

#[allow(clippy::cast_possible_truncation)]
fn to_i8(raw: &RawValue, _: &ConversionContext) -> Option<Value> {
    match raw {
        RawValue::Int32(v) => Some(Value::Int8(*v as i8)),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(raw: &RawValue, _: &ConversionContext) -> Option<Value> {
    match raw {
        RawValue::Int32(v) => Some(Value::UInt8(*v as u8)),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_i16(raw: &RawValue, _: &ConversionContext) -> Option<Value> {
    match raw {
        RawValue::Int32(v) => Some(Value::Int16(*v as i16)),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u16(raw: &RawValue, _: &ConversionContext) -> Option<Value> {
    match raw {
        RawValue::Int32(v) => Some(Value::UInt16(*v as u16)),
        _ => None,
    }
}

fn to_i32(raw: &RawValue, _: &ConversionContext) -> Option<Value> {
    match raw {
        RawValue::Int32(v) => Some(Value::Int32(*v)),
        _ => None,
    }
}

fn to_i64(raw: &RawValue, _: &ConversionContext) -> Option<Value> {
    match raw {
        RawValue::Int64(v) => Some(Value::Int64(*v)),
        RawValue::Int32(v) => Some(Value::Int64(i64::from(*v))),
        _ => None,
    }
}

// Unsigned 32/64-bit columns are stored in the signed physical type of the same width.
#[allow(clippy::cast_sign_loss)]
fn to_unsigned_text(raw: &RawValue, _: &ConversionContext) -> Option<Value> {
    match raw {
        RawValue::Int32(v) => Some(Value::Text((*v as u32).to_string())),
        RawValue::Int64(v) => Some(Value::Text((*v as u64).to_string())),
        _ => None,
    }
}

fn to_row_id(raw: &RawValue, _: &ConversionContext) -> Option<Value> {
    let id = match raw {
        RawValue::Int96(words) => int96_to_row_id(*words),
        RawValue::Bytes(b) => row_id_or_zero(b),
        _ => RowId::default(),
    };
    Some(Value::RowId(id))
}

fn to_bytes(raw: &RawValue, _: &ConversionContext) -> Option<Value> {
    Some(match raw {
        RawValue::Bytes(b) => Value::Bytes(b.to_vec()),
        _ => Value::Bytes(Vec::new()),
    })
}

fn to_text(raw: &RawValue, _: &ConversionContext) -> Option<Value> {
    Some(match raw {
        RawValue::Bytes(b) => Value::Text(String::from_utf8_lossy(b).into_owned()),
        _ => Value::Text(String::new()),
    })
}

fn to_f32(raw: &RawValue, _: &ConversionContext) -> Option<Value> {
    Some(match raw {
        RawValue::Float(v) => Value::Float32(*v),
        _ => Value::Float32(f32::NAN),
    })
}

fn to_f64(raw: &RawValue, _: &ConversionContext) -> Option<Value> {
    Some(match raw {
        RawValue::Double(v) => Value::Float64(*v),
        RawValue::Float(v) => Value::Float64(f64::from(*v)),
        _ => Value::Float64(f64::NAN),
    })
}

#[allow(clippy::cast_precision_loss)]
fn to_decimal(raw: &RawValue, ctx: &ConversionContext) -> Option<Value> {
    let unscaled = match raw {
        RawValue::Int32(v) => f64::from(*v),
        RawValue::Int64(v) => *v as f64,
        RawValue::Bytes(b) => be_twos_complement_to_f64(b),
        _ => return Some(Value::Float64(f64::NAN)),
    };
    Some(Value::Float64(unscaled / 10f64.powi(ctx.scale)))
}

fn to_timestamp(raw: &RawValue, ctx: &ConversionContext) -> Option<Value> {
    let utc = match raw {
        RawValue::Int96(words) => {
            let nanos_of_day = u64::from(words[0]) | (u64::from(words[1]) << 32);
            let days = i64::from(words[2]) - JULIAN_UNIX_EPOCH;
            let total = i128::from(days) * NANOS_PER_DAY + i128::from(nanos_of_day);
            from_unix_nanos(total)
        }
        RawValue::Int32(v) if ctx.time_unit == StoredTimeUnit::Days => {
            DateTime::from_timestamp(i64::from(*v) * 86_400, 0)
        }
        RawValue::Int32(v) => scaled_timestamp(i64::from(*v), ctx.time_unit),
        RawValue::Int64(v) => scaled_timestamp(*v, ctx.time_unit),
        _ => None,
    };
    Some(match utc {
        Some(ts) => Value::DateTimeOffset(ts.fixed_offset()),
        None => Value::Null,
    })
}

fn scaled_timestamp(v: i64, unit: StoredTimeUnit) -> Option<DateTime<chrono::Utc>> {
    match unit {
        StoredTimeUnit::Days => DateTime::from_timestamp(v.checked_mul(86_400)?, 0),
        StoredTimeUnit::Millis => DateTime::from_timestamp_millis(v),
        StoredTimeUnit::Micros => DateTime::from_timestamp_micros(v),
        StoredTimeUnit::Nanos => Some(DateTime::from_timestamp_nanos(v)),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn from_unix_nanos(total: i128) -> Option<DateTime<chrono::Utc>> {
    let secs = i64::try_from(total.div_euclid(NANOS_PER_SECOND)).ok()?;
    let nsec = total.rem_euclid(NANOS_PER_SECOND) as u32;
    DateTime::from_timestamp(secs, nsec)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_time_text(raw: &RawValue, ctx: &ConversionContext) -> Option<Value> {
    let nanos: i64 = match (raw, ctx.time_unit) {
        (RawValue::Int32(v), _) => i64::from(*v) * 1_000_000,
        (RawValue::Int64(v), StoredTimeUnit::Micros) => v.saturating_mul(1_000),
        (RawValue::Int64(v), StoredTimeUnit::Nanos) => *v,
        (RawValue::Int64(v), _) => v.saturating_mul(1_000_000),
        _ => return Some(Value::Text(String::new())),
    };
    let text = NaiveTime::from_num_seconds_from_midnight_opt(
        (nanos / 1_000_000_000) as u32,
        (nanos % 1_000_000_000) as u32,
    )
    .map(|t| t.to_string())
    .unwrap_or_default();
    Some(Value::Text(text))
}

fn to_duration(raw: &RawValue, _: &ConversionContext) -> Option<Value> {
    Some(match raw {
        RawValue::Bytes(b) => match interval_bytes_to_duration(b) {
            Some(d) => Value::Duration(d),
            None => Value::Null,
        },
        _ => Value::Null,
    })
}

fn to_list_text(raw: &RawValue, ctx: &ConversionContext) -> Option<Value> {
    Some(Value::Text(stringify_list(raw, ctx)))
}

/// Convert an interval `(months, days, milliseconds)` to a duration.
///
/// Months count as 30 days, so the result is approximate.
#[must_use]
pub fn interval_to_duration(months: u32, days: u32, millis: u32) -> TimeDelta {
    let total_days = i64::from(months) * 30 + i64::from(days);
    TimeDelta::days(total_days) + TimeDelta::milliseconds(i64::from(millis))
}

fn interval_bytes_to_duration(b: &[u8]) -> Option<TimeDelta> {
    if b.len() != 12 {
        return None;
    }
    let word = |i: usize| u32::from_le_bytes([b[i], b[i + 1], b[i + 2], b[i + 3]]);
    Some(interval_to_duration(word(0), word(4), word(8)))
}

/// Error returned when an integer does not fit in 16 bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowIdOverflow {
    pub len: usize,
}

/// Repack a little-endian integer into a [`RowId`].
///
/// Shorter inputs are zero-extended to 16 bytes. Longer inputs are truncated only
/// when every dropped byte is zero.
///
/// # Errors
/// [`RowIdOverflow`] when significant bytes would be lost.
pub fn row_id_from_le_bytes(bytes: &[u8]) -> Result<RowId, RowIdOverflow> {
    if bytes.len() > 16 && bytes[16..].iter().any(|b| *b != 0) {
        return Err(RowIdOverflow { len: bytes.len() });
    }
    let mut buf = [0u8; 16];
    let n = bytes.len().min(16);
    buf[..n].copy_from_slice(&bytes[..n]);
    Ok(RowId::from_le_bytes(buf))
}

/// Repack a 96-bit integer (three little-endian words) into a [`RowId`].
#[must_use]
pub fn int96_to_row_id(words: [u32; 3]) -> RowId {
    let mut bytes = [0u8; 12];
    for (chunk, word) in bytes.chunks_exact_mut(4).zip(words) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    row_id_or_zero(&bytes)
}

fn row_id_or_zero(bytes: &[u8]) -> RowId {
    row_id_from_le_bytes(bytes).unwrap_or_else(|e| {
        tracing::warn!(len = e.len, "integer does not fit a 128-bit row id; using zero");
        RowId::default()
    })
}

#[allow(clippy::cast_precision_loss)]
fn be_twos_complement_to_f64(b: &[u8]) -> f64 {
    if b.is_empty() {
        return 0.0;
    }
    if b.len() <= 16 {
        let fill = if b[0] & 0x80 == 0 { 0x00 } else { 0xFF };
        let mut buf = [fill; 16];
        buf[16 - b.len()..].copy_from_slice(b);
        return i128::from_be_bytes(buf) as f64;
    }
    // Wider than i128: accumulate in floating point.
    let negative = b[0] & 0x80 != 0;
    let mut acc = 0f64;
    for byte in b {
        let byte = if negative { !*byte } else { *byte };
        acc = acc * 256.0 + f64::from(byte);
    }
    if negative { -(acc + 1.0) } else { acc }
}

/// Render a nested list value as text.
///
/// Top-level elements are comma-joined without surrounding brackets; nested lists
/// are wrapped in `[...]`. A null or empty list renders as the empty string.
#[must_use]
pub fn stringify_list(raw: &RawValue, ctx: &ConversionContext) -> String {
    let mut out = String::new();
    match raw {
        RawValue::List(items) => write_elements(items, ctx, &mut out),
        RawValue::Null => {}
        scalar => write_scalar(scalar, ctx, &mut out),
    }
    out
}

fn write_elements(items: &[RawValue], ctx: &ConversionContext, out: &mut String) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        match item {
            RawValue::List(inner) => {
                out.push('[');
                write_elements(inner, ctx, out);
                out.push(']');
            }
            scalar => write_scalar(scalar, ctx, out),
        }
    }
}

fn write_scalar(raw: &RawValue, ctx: &ConversionContext, out: &mut String) {
    if raw.is_null() {
        return;
    }
    if ctx.element_type == RawType::Unspecified {
        write_raw(raw, out);
        return;
    }
    if let Some(value) = converter_for(ctx.element_type)(raw, ctx) {
        let _ = write!(out, "{value}");
    }
}

fn write_raw(raw: &RawValue, out: &mut String) {
    let _ = match raw {
        RawValue::Null | RawValue::List(_) => Ok(()),
        RawValue::Boolean(v) => write!(out, "{v}"),
        RawValue::Int32(v) => write!(out, "{v}"),
        RawValue::Int64(v) => write!(out, "{v}"),
        RawValue::Int96(words) => write!(out, "{}", int96_to_row_id(*words)),
        RawValue::Float(v) => write!(out, "{v}"),
        RawValue::Double(v) => write!(out, "{v}"),
        RawValue::Bytes(b) => {
            out.push_str(&String::from_utf8_lossy(b));
            Ok(())
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn ctx(element_type: RawType) -> ConversionContext {
        ConversionContext {
            element_type,
            ..ConversionContext::default()
        }
    }

    fn convert(raw_type: RawType, raw: &RawValue) -> Option<Value> {
        converter_for(raw_type)(raw, &ConversionContext::default())
    }

    #[test]
    fn nested_list_renders_with_inner_brackets() {
        let raw = RawValue::List(vec![
            RawValue::List(vec![RawValue::Int32(1), RawValue::Int32(2)]),
            RawValue::Int32(3),
        ]);
        assert_eq!(stringify_list(&raw, &ctx(RawType::Int32)), "[1,2],3");
    }

    #[test]
    fn null_and_empty_lists_render_empty() {
        assert_eq!(stringify_list(&RawValue::Null, &ctx(RawType::Int32)), "");
        let empty = RawValue::List(vec![]);
        assert_eq!(stringify_list(&empty, &ctx(RawType::Int32)), "");
        let nested_empty = RawValue::List(vec![RawValue::List(vec![])]);
        assert_eq!(stringify_list(&nested_empty, &ctx(RawType::Int32)), "[]");
    }

    #[test]
    fn list_of_strings_uses_element_conversion() {
        let raw = RawValue::List(vec![
            RawValue::Bytes(Bytes::from_static(b"a")),
            RawValue::Null,
            RawValue::Bytes(Bytes::from_static(b"c")),
        ]);
        assert_eq!(stringify_list(&raw, &ctx(RawType::String)), "a,,c");
    }

    #[test]
    fn interval_uses_thirty_day_months() {
        let d = interval_to_duration(1, 2, 500);
        assert_eq!(d, TimeDelta::days(32) + TimeDelta::milliseconds(500));

        let mut raw = Vec::new();
        for w in [1u32, 2, 500] {
            raw.extend_from_slice(&w.to_le_bytes());
        }
        let v = convert(RawType::Interval, &RawValue::Bytes(Bytes::from(raw)));
        assert_eq!(v, Some(Value::Duration(d)));
    }

    #[test]
    fn int96_splits_at_byte_eight() {
        // 0x0102030405060708090A0B as three little-endian words.
        let words = [0x0809_0A0B, 0x0405_0607, 0x0001_0203];
        let id = int96_to_row_id(words);
        assert_eq!(id.low, 0x0405_0607_0809_0A0B);
        assert_eq!(id.high, 0x0001_0203);

        let bytes = id.to_le_bytes();
        assert_eq!(
            &bytes[..11],
            &[0x0B, 0x0A, 0x09, 0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]
        );
        assert!(bytes[11..].iter().all(|b| *b == 0));
        assert_eq!(RowId::from_le_bytes(bytes), id);
    }

    #[test]
    fn oversized_integer_degrades_to_zero() {
        let mut bytes = vec![0xFF; 16];
        bytes.push(1);
        assert_eq!(
            row_id_from_le_bytes(&bytes),
            Err(RowIdOverflow { len: 17 })
        );
        let v = convert(RawType::Int96, &RawValue::Bytes(Bytes::from(bytes)));
        assert_eq!(v, Some(Value::RowId(RowId::default())));
    }

    #[test]
    fn null_sentinels() {
        for raw_type in [RawType::Double, RawType::Decimal] {
            let v = convert(raw_type, &RawValue::Null).and_then(|v| v.as_f64());
            assert!(v.is_some_and(f64::is_nan), "{raw_type:?}");
        }
        assert_eq!(
            convert(RawType::ByteArray, &RawValue::Null),
            Some(Value::Bytes(vec![]))
        );
        assert_eq!(convert(RawType::Int32, &RawValue::Null), None);
        let b = convert(RawType::Boolean, &RawValue::Null);
        assert_eq!(b, Some(Value::Null));
    }

    #[test]
    fn decimals_widen_with_scale() {
        let c = ConversionContext {
            scale: 2,
            ..ConversionContext::default()
        };
        let v = converter_for(RawType::Decimal)(&RawValue::Int64(12_345), &c);
        assert_eq!(v, Some(Value::Float64(123.45)));
        // -2 as a two-byte big-endian two's complement.
        let raw = RawValue::Bytes(Bytes::from_static(&[0xFF, 0xFE]));
        let v = converter_for(RawType::Decimal)(&raw, &c);
        assert_eq!(v, Some(Value::Float64(-0.02)));
    }

    #[test]
    fn int96_timestamp_uses_julian_days() {
        // Julian day 2440589 is 1970-01-02; one second into that day.
        let nanos: u64 = 1_000_000_000;
        #[allow(clippy::cast_possible_truncation)]
        let words = [nanos as u32, (nanos >> 32) as u32, 2_440_589];
        let v = convert(RawType::DateTimeOffset, &RawValue::Int96(words));
        let ts = v.and_then(|v| v.as_timestamp()).map(|t| t.timestamp());
        assert_eq!(ts, Some(86_401));
    }

    #[test]
    fn narrow_integers() {
        assert_eq!(
            convert(RawType::SignedByte, &RawValue::Int32(-5)),
            Some(Value::Int8(-5))
        );
        assert_eq!(
            convert(RawType::UnsignedByte, &RawValue::Int32(200)),
            Some(Value::UInt8(200))
        );
        assert_eq!(
            convert(RawType::UnsignedInt32, &RawValue::Int32(-1)),
            Some(Value::Text("4294967295".into()))
        );
    }
}
