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

// Optional zstd pass over serialized records

use tracing::debug;

use crate::error::RecorderError;

/// Level handed to zstd.
const ZSTD_LEVEL: i32 = 5;

/// Try to shrink a serialized record.
///
/// Returns `None` when compression yields no size reduction, or when the
/// encoder fails for any reason; the caller then stores the original bytes
/// raw with `compressed_size = 0`. Compression unavailability never fails a
/// store.
pub fn try_compress(data: &[u8]) -> Option<Vec<u8>> {
    match zstd::encode_all(data, ZSTD_LEVEL) {
        Ok(compressed) if compressed.len() < data.len() => Some(compressed),
        Ok(_) => None,
        Err(e) => {
            debug!("compression failed, storing raw: {}", e);
            None
        }
    }
}

/// Exact inverse of [`try_compress`]. The inflated length must equal the
/// original size recorded alongside the entry.
pub fn decompress(data: &[u8], original_size: u32) -> Result<Vec<u8>, RecorderError> {
    let out = zstd::decode_all(data)
        .map_err(|e| RecorderError::Decode(format!("corrupt compressed payload: {e}")))?;
    if out.len() != original_size as usize {
        return Err(RecorderError::Decode(format!(
            "decompressed length mismatch: expected {original_size}, got {}",
            out.len()
        )));
    }
    Ok(out)
}
