// SPDX-License-Identifier: Apache-2.0

use crate::{Error, Result, seeking};
use crate::error::OperationKind::{Read, ReadAt};

/// A zero-length body, open but already at its end.
#[derive(Copy, Clone, Debug, Default)]
pub(super) struct EmptyBody {
	eos: bool,
}

impl EmptyBody {
	pub const fn new() -> Self { Self { eos: false } }

	pub fn is_eos(&self) -> bool { self.eos }

	/// Zero-byte reads succeed until an end-of-stream has been reported.
	pub fn read(&mut self, buf: &[u8]) -> Result<usize> {
		if buf.is_empty() && !self.eos {
			Ok(0)
		} else {
			self.eos = true;
			Err(Error::eos(Read))
		}
	}

	pub fn read_at(&self, buf: &[u8]) -> Result<usize> {
		if buf.is_empty() {
			Ok(0)
		} else {
			Err(Error::eos(ReadAt))
		}
	}

	pub fn seek(&mut self, offset: i64, whence: i32) -> Result<u64> {
		let pos = seeking::resolve(offset, whence, 0, 0).map_err(Error::seek)?;
		self.eos = false;
		Ok(pos)
	}
}
