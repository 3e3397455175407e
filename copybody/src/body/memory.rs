// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::io::Write;
use bytes::Bytes;
use crate::{Error, Result, seeking};
use crate::error::OperationKind::{Read, ReadAt, WriteTo};

/// A body serving shared, immutable bytes. Copies share the bytes and duplicate
/// only the cursor.
#[derive(Clone, Debug)]
pub(super) struct MemoryBody {
	data: Bytes,
	offset: usize,
	eos: bool,
}

impl MemoryBody {
	pub fn new(data: Bytes) -> Self {
		Self { data, offset: 0, eos: false }
	}

	fn remaining(&self) -> &[u8] { &self.data[self.offset..] }

	pub fn bytes_remaining(&self) -> u64 {
		if self.eos { 0 } else { self.remaining().len() as u64 }
	}

	pub fn is_eos(&self) -> bool { self.eos }

	pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
		if self.eos { return Err(Error::eos(Read)) }
		if buf.is_empty() { return Ok(0) }

		let avail = self.remaining();
		if avail.is_empty() {
			self.eos = true;
			return Err(Error::eos(Read))
		}

		let count = buf.len().min(avail.len());
		buf[..count].copy_from_slice(&avail[..count]);
		self.offset += count;
		// A request past the end yields what's left now, and EOS on the next read.
		self.eos = count < buf.len();
		Ok(count)
	}

	pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
		if buf.is_empty() { return Ok(0) }

		let len = self.data.len();
		let start = usize::try_from(offset).map_or(len, |off| off.min(len));
		let count = buf.len().min(len - start);
		if count == 0 { return Err(Error::eos(ReadAt)) }

		buf[..count].copy_from_slice(&self.data[start..][..count]);
		Ok(count)
	}

	pub fn seek(&mut self, offset: i64, whence: i32) -> Result<u64> {
		let pos = seeking::resolve(
			offset,
			whence,
			self.offset as u64,
			self.data.len() as u64
		).map_err(Error::seek)?;
		self.offset = pos as usize;
		self.eos = false;
		Ok(pos)
	}

	/// Writes the remaining bytes straight from shared memory.
	pub fn write_to(&mut self, sink: &mut (impl Write + ?Sized)) -> Result<u64> {
		if self.eos { return Ok(0) }

		let mut total = 0;
		while !self.remaining().is_empty() {
			match sink.write(self.remaining()) {
				Ok(0) => return Err(Error::io(WriteTo, io::ErrorKind::WriteZero.into())),
				Ok(count) => {
					self.offset += count;
					total += count as u64;
				}
				Err(error) if error.kind() == io::ErrorKind::Interrupted => { }
				Err(error) => return Err(Error::io(WriteTo, error))
			}
		}
		Ok(total)
	}
}
