// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Record codec: length-prefixed text serialization of query events
///
/// # Format
///
/// A serialized record is the concatenation, in fixed field order, of an
/// 8-hex-digit ASCII header holding the field's byte length followed by
/// exactly that many bytes of the field's textual rendering:
///
/// ```text
/// 0000001a2025-06-01 12:34:56+00:000000001000000000001234.56...
/// ```
///
/// Numeric fields use fixed zero-padded renderings so their encoded length
/// is predictable. Field order is owned by `FIELD_LAYOUT`; adding a field is
/// a one-line change there plus its render/assign arms.
use crate::error::RecorderError;
use crate::event::QueryEvent;

/// Length of the ASCII hex header preceding every field.
pub const FIELD_HEADER_LEN: usize = 8;

/// One field slot of a serialized record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldSlot {
    Datetime,
    Duration,
    Username,
    Appname,
    Dbname,
    TempBlocksWritten,
    HitRatio,
    TupleCount,
    QueryText,
    PlanText,
}

/// Fixed on-wire field order. Drives serialization, parsing and the
/// structural check so the three can never disagree.
const FIELD_LAYOUT: [FieldSlot; 10] = [
    FieldSlot::Datetime,
    FieldSlot::Duration,
    FieldSlot::Username,
    FieldSlot::Appname,
    FieldSlot::Dbname,
    FieldSlot::TempBlocksWritten,
    FieldSlot::HitRatio,
    FieldSlot::TupleCount,
    FieldSlot::QueryText,
    FieldSlot::PlanText,
];

/// Serialize a query event. Total: never fails for any field values,
/// including empty strings.
pub fn serialize(event: &QueryEvent) -> Vec<u8> {
    let mut out = Vec::new();
    for slot in FIELD_LAYOUT {
        match slot {
            FieldSlot::Datetime => push_field(&mut out, event.datetime.as_bytes()),
            FieldSlot::Duration => {
                push_field(&mut out, format!("{:016.2}", event.duration_ms).as_bytes())
            }
            FieldSlot::Username => push_field(&mut out, event.username.as_bytes()),
            FieldSlot::Appname => push_field(&mut out, event.appname.as_bytes()),
            FieldSlot::Dbname => push_field(&mut out, event.dbname.as_bytes()),
            FieldSlot::TempBlocksWritten => {
                push_field(&mut out, format!("{:016}", event.temp_blocks_written).as_bytes())
            }
            FieldSlot::HitRatio => {
                push_field(&mut out, format!("{:010.6}", event.hit_ratio).as_bytes())
            }
            FieldSlot::TupleCount => {
                push_field(&mut out, format!("{:016}", event.tuple_count).as_bytes())
            }
            FieldSlot::QueryText => push_field(&mut out, event.query_text.as_bytes()),
            FieldSlot::PlanText => push_field(&mut out, event.plan_text.as_bytes()),
        }
    }
    out
}

/// Parse a serialized record back into an event.
///
/// Structural damage (bad header, field overrunning the buffer, trailing
/// bytes) rejects the whole record with `CorruptRecord`. A numeric field
/// whose text does not parse falls back to the type's zero value instead;
/// bad numbers are tolerated, bad structure is not.
pub fn parse(data: &[u8]) -> Result<QueryEvent, RecorderError> {
    let mut event = QueryEvent::default();
    let mut pos = 0usize;
    for slot in FIELD_LAYOUT {
        let raw = next_field(data, &mut pos)?;
        let text = String::from_utf8_lossy(raw);
        match slot {
            FieldSlot::Datetime => event.datetime = text.into_owned(),
            FieldSlot::Duration => event.duration_ms = text.parse().unwrap_or_default(),
            FieldSlot::Username => event.username = text.into_owned(),
            FieldSlot::Appname => event.appname = text.into_owned(),
            FieldSlot::Dbname => event.dbname = text.into_owned(),
            FieldSlot::TempBlocksWritten => {
                event.temp_blocks_written = text.parse().unwrap_or_default()
            }
            FieldSlot::HitRatio => event.hit_ratio = text.parse().unwrap_or_default(),
            FieldSlot::TupleCount => event.tuple_count = text.parse().unwrap_or_default(),
            FieldSlot::QueryText => event.query_text = text.into_owned(),
            FieldSlot::PlanText => event.plan_text = text.into_owned(),
        }
    }
    if pos != data.len() {
        return Err(RecorderError::CorruptRecord(format!(
            "{} trailing bytes after last field",
            data.len() - pos
        )));
    }
    Ok(event)
}

/// Cheap structural pre-validation: walk the length-header sequence without
/// materializing any field. Used by the relay to discard malformed
/// datagrams without allocating.
pub fn check_structure(data: &[u8]) -> bool {
    let mut pos = 0usize;
    for _ in FIELD_LAYOUT {
        let Some(header) = data.get(pos..pos + FIELD_HEADER_LEN) else {
            return false;
        };
        let Some(len) = decode_header(header) else {
            return false;
        };
        pos += FIELD_HEADER_LEN;
        if data.len() - pos < len {
            return false;
        }
        pos += len;
    }
    pos == data.len()
}

fn push_field(out: &mut Vec<u8>, value: &[u8]) {
    out.extend_from_slice(format!("{:08x}", value.len()).as_bytes());
    out.extend_from_slice(value);
}

/// Decode one 8-hex-digit length header. Stricter than a plain radix parse:
/// every byte must be an ASCII hex digit, no signs or whitespace.
fn decode_header(header: &[u8]) -> Option<usize> {
    if header.len() != FIELD_HEADER_LEN || !header.iter().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let text = std::str::from_utf8(header).ok()?;
    usize::from_str_radix(text, 16).ok()
}

fn next_field<'a>(data: &'a [u8], pos: &mut usize) -> Result<&'a [u8], RecorderError> {
    let offset = *pos;
    let header = data.get(offset..offset + FIELD_HEADER_LEN).ok_or_else(|| {
        RecorderError::CorruptRecord(format!("record ends inside a length header at offset {offset}"))
    })?;
    let len = decode_header(header).ok_or_else(|| {
        RecorderError::CorruptRecord(format!("invalid length header at offset {offset}"))
    })?;
    let start = offset + FIELD_HEADER_LEN;
    let value = data.get(start..start + len).ok_or_else(|| {
        RecorderError::CorruptRecord(format!(
            "field of {len} bytes at offset {start} runs past the record end"
        ))
    })?;
    *pos = start + len;
    Ok(value)
}
