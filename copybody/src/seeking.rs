// SPDX-License-Identifier: Apache-2.0

use std::io::SeekFrom;
use crate::error::SeekError;

/// Seek relative to the start of the body.
pub const SEEK_START: i32 = 0;
/// Seek relative to the current cursor.
pub const SEEK_CURRENT: i32 = 1;
/// Seek relative to the end of the body.
pub const SEEK_END: i32 = 2;

/// Resolves a seek request to an absolute position given the current `pos` and
/// the body's `len`. The result is clamped to `len`.
pub fn resolve(offset: i64, whence: i32, pos: u64, len: u64) -> Result<u64, SeekError> {
	let computed = match whence {
		SEEK_START if offset < 0 => return Err(SeekError::NegativeStart { offset }),
		SEEK_START   => offset,
		SEEK_CURRENT => to_signed(pos).saturating_add(offset),
		SEEK_END     => to_signed(len).saturating_add(offset),
		whence       => return Err(SeekError::UnknownWhence { whence })
	};

	if computed < 0 {
		return Err(SeekError::NegativeComputed { offset: computed })
	}

	Ok((computed as u64).min(len))
}

/// Splits [`std::io`]'s [`SeekFrom`] enum into an offset and whence value. Start
/// offsets beyond `i64::MAX` saturate; they're clamped to the length anyway.
pub fn split_seek_from(value: SeekFrom) -> (i64, i32) {
	match value {
		SeekFrom::Start  (pos) => (pos.try_into().unwrap_or(i64::MAX), SEEK_START),
		SeekFrom::Current(off) => (off, SEEK_CURRENT),
		SeekFrom::End    (off) => (off, SEEK_END)
	}
}

fn to_signed(value: u64) -> i64 {
	value.try_into().unwrap_or(i64::MAX)
}
