// Copyright 2023 Strixpyrr
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

mod buffered;
mod empty;
mod memory;
mod random;
mod select;

use std::{io, mem};
use std::io::{SeekFrom, Write};
use std::ops::Range;
use std::sync::Arc;
use bytes::Bytes;
use log::debug;
use crate::{DEFAULT_BLOCK_SIZE, Error, Result, seeking, Source};
use crate::error::OperationKind;
use crate::error::OperationKind::{Close, Read, ReadAt, Seek, WriteTo};
use buffered::BufferedBody;
use empty::EmptyBody;
use memory::MemoryBody;
use random::{Access, RandomBody};

/// The end-of-stream or failure a cursor stopped at.
#[derive(Clone, Debug)]
enum Terminal {
	Eos,
	Failed(Arc<io::Error>),
}

impl Terminal {
	fn to_error(&self, op: OperationKind) -> Error {
		match self {
			Self::Eos => Error::eos(op),
			Self::Failed(error) => Error::shared_io(op, Arc::clone(error))
		}
	}
}

#[derive(Debug)]
enum Inner {
	Closed,
	Empty(EmptyBody),
	Memory(MemoryBody),
	Random(RandomBody),
	Buffered(BufferedBody),
}

/// A readable payload that can be copied into independent cursors over the same
/// bytes, whatever the source it reads from.
///
/// Bodies are built from in-memory bytes, or from a [`Source`] with
/// [`from_source`](Self::from_source). Sources supporting addressed reads or
/// seeking are read through directly by every copy. Sequential sources are read
/// once, with bytes retained in a window shared by all copies until the slowest
/// copy has read them.
///
/// Reads return [`Eos`](crate::ErrorKind::Eos) once no bytes are left. A read
/// running past the end returns the remaining bytes, then end-of-stream on the
/// next read. End-of-stream is sticky until the body is seeked. As an
/// [`io::Read`]er, end-of-stream is reported as a zero-length read instead.
///
/// The source is closed when the last body attached to it is closed. A body
/// dropped without being closed is closed on drop, with any error discarded.
#[derive(Debug)]
pub struct Body {
	inner: Inner,
}

impl Default for Body {
	fn default() -> Self { Self::empty() }
}

impl Body {
	/// Creates an already-closed body.
	pub const fn closed() -> Self {
		Self { inner: Inner::Closed }
	}

	/// Creates an empty body, open but already at its end.
	pub const fn empty() -> Self {
		Self { inner: Inner::Empty(EmptyBody::new()) }
	}

	/// Creates a body over in-memory bytes. Copies share the bytes. Empty bytes
	/// produce an [empty](Self::empty) body.
	pub fn from_bytes(data: impl Into<Bytes>) -> Self {
		let data = data.into();
		if data.is_empty() {
			Self::empty()
		} else {
			Self { inner: Inner::Memory(MemoryBody::new(data)) }
		}
	}

	fn random(source: Box<dyn Source>, access: Access, base: u64, len: u64) -> Self {
		Self { inner: Inner::Random(RandomBody::new(source, access, base, len)) }
	}

	fn buffered(source: Box<dyn Source>, length: Option<u64>, block_size: usize) -> Self {
		Self { inner: Inner::Buffered(BufferedBody::new(source, length, block_size)) }
	}

	/// Returns the number of bytes left to read from the cursor, or `None` if it
	/// isn't known yet. Returns `Some(0)` once closed, or once this cursor has
	/// hit its end or a failure. Never reads from the source.
	pub fn bytes_remaining(&self) -> Option<u64> {
		match &self.inner {
			Inner::Closed | Inner::Empty(_) => Some(0),
			Inner::Memory(body) => Some(body.bytes_remaining()),
			Inner::Random(body) => Some(body.bytes_remaining()),
			Inner::Buffered(body) => body.bytes_remaining()
		}
	}

	/// Reads bytes from the cursor into `buf`, returning the number of bytes
	/// read. Fewer bytes than requested may be read. Returns an end-of-stream
	/// error once there are no bytes left, or a source failure once the cursor
	/// reaches it. Both are sticky.
	pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
		match &mut self.inner {
			Inner::Closed => Err(Error::closed(Read)),
			Inner::Empty(body) => body.read(buf),
			Inner::Memory(body) => body.read(buf),
			Inner::Random(body) => body.read(buf),
			Inner::Buffered(body) => body.read(buf)
		}
	}

	/// Reads bytes at `offset` into `buf` without moving the cursor. Offsets
	/// past the end are treated as the end. Buffered bodies don't support this.
	pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
		match &self.inner {
			Inner::Closed => Err(Error::closed(ReadAt)),
			Inner::Empty(body) => body.read_at(buf),
			Inner::Memory(body) => body.read_at(buf, offset),
			Inner::Random(body) => body.read_at(buf, offset),
			Inner::Buffered(_) => Err(Error::unsupported(ReadAt))
		}
	}

	/// Moves the cursor by `offset` relative to the position selected by `whence`,
	/// one of [`SEEK_START`], [`SEEK_CURRENT`], or [`SEEK_END`]. The new position
	/// is clamped to the length, and returned. Seeking clears a sticky end-of-stream.
	/// Buffered bodies don't support this.
	///
	/// On an invalid request, the cursor is left unchanged.
	///
	/// [`SEEK_START`]: seeking::SEEK_START
	/// [`SEEK_CURRENT`]: seeking::SEEK_CURRENT
	/// [`SEEK_END`]: seeking::SEEK_END
	pub fn seek_whence(&mut self, offset: i64, whence: i32) -> Result<u64> {
		match &mut self.inner {
			Inner::Closed => Err(Error::closed(Seek)),
			Inner::Empty(body) => body.seek(offset, whence),
			Inner::Memory(body) => body.seek(offset, whence),
			Inner::Random(body) => body.seek(offset, whence),
			Inner::Buffered(_) => Err(Error::unsupported(Seek))
		}
	}

	/// Writes all remaining bytes to `sink`, returning the number written.
	/// Stops without error at the end of the stream.
	pub fn write_to(&mut self, sink: &mut (impl Write + ?Sized)) -> Result<u64> {
		match &mut self.inner {
			Inner::Closed => return Err(Error::closed(WriteTo)),
			Inner::Empty(_) => return Ok(0),
			Inner::Memory(body) => return body.write_to(sink),
			Inner::Random(_) | Inner::Buffered(_) => { }
		}
		self.pump(sink)
	}

	/// Copies through a scratch buffer of at most one block, so a buffered body
	/// grows by its own block size.
	fn pump(&mut self, sink: &mut (impl Write + ?Sized)) -> Result<u64> {
		let block_size = match &self.inner {
			Inner::Buffered(body) => body.block_size(),
			_ => DEFAULT_BLOCK_SIZE
		};
		let size = self.bytes_remaining()
					   .and_then(|len| usize::try_from(len).ok())
					   .map_or(block_size, |len| len.clamp(1, block_size));
		let mut buf = vec![0; size];
		let mut total = 0;
		loop {
			let count = match self.read(&mut buf) {
				Ok(count) => count,
				Err(error) if error.is_eos() => return Ok(total),
				Err(error) => return Err(error.with_operation(WriteTo))
			};
			sink.write_all(&buf[..count]).map_err(|error| Error::io(WriteTo, error))?;
			total += count as u64;
		}
	}

	/// Closes the body. The source is closed when the last copy attached to it
	/// is closed, returning any error it reports. Closing twice returns a
	/// "closed" error.
	pub fn close(&mut self) -> Result {
		match mem::replace(&mut self.inner, Inner::Closed) {
			Inner::Closed => Err(Error::closed(Close)),
			Inner::Empty(_) | Inner::Memory(_) => Ok(()),
			Inner::Random(body) => body.close(),
			Inner::Buffered(body) => body.close()
		}
	}

	/// Creates a copy of the body at the same cursor, reading independently.
	/// Copying a closed body returns another closed body.
	pub fn try_clone(&self) -> Result<Self> {
		let inner = match &self.inner {
			Inner::Closed => Inner::Closed,
			Inner::Empty(body) => Inner::Empty(*body),
			Inner::Memory(body) => Inner::Memory(body.clone()),
			Inner::Random(body) => Inner::Random(body.try_clone()),
			Inner::Buffered(body) => Inner::Buffered(body.try_clone()?)
		};
		Ok(Self { inner })
	}

	/// Calls `f` with the underlying source, returning its result, or `None` if
	/// the body has no source. In-memory, empty, and closed bodies have none;
	/// nor do bodies whose source has been closed.
	///
	/// The source is locked for the duration of `f`. Reading from it or moving
	/// its cursor may corrupt what other copies read.
	pub fn with_source<T>(&self, f: impl FnOnce(&mut dyn Source) -> T) -> Option<T> {
		match &self.inner {
			Inner::Random(body) => body.with_source(f),
			Inner::Buffered(body) => body.with_source(f),
			_ => None
		}
	}

	/// Returns `true` if the body is closed.
	pub fn is_closed(&self) -> bool { matches!(self.inner, Inner::Closed) }

	/// Returns `true` if this cursor has hit its end or a failure.
	pub fn is_eos(&self) -> bool {
		match &self.inner {
			Inner::Closed => false,
			Inner::Empty(body) => body.is_eos(),
			Inner::Memory(body) => body.is_eos(),
			Inner::Random(body) => body.is_eos(),
			Inner::Buffered(body) => body.is_eos()
		}
	}

	/// Returns `true` if the body supports [seeking](Self::seek_whence).
	pub fn can_seek(&self) -> bool {
		matches!(self.inner, Inner::Empty(_) | Inner::Memory(_) | Inner::Random(_))
	}

	/// Returns `true` if the body supports [addressed reads](Self::read_at).
	pub fn can_read_at(&self) -> bool { self.can_seek() }

	/// Returns the stream range retained in memory by a buffered body and its
	/// copies, or `None` for other bodies.
	pub fn buffered_range(&self) -> Option<Range<u64>> {
		if let Inner::Buffered(body) = &self.inner {
			body.buffered_range()
		} else {
			None
		}
	}
}

impl Drop for Body {
	fn drop(&mut self) {
		if self.is_closed() { return }

		if let Err(error) = self.close() {
			debug!("discarded error closing dropped body: {error}");
		}
	}
}

impl io::Read for Body {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		match Body::read(self, buf) {
			Ok(count) => Ok(count),
			Err(error) if error.is_eos() => Ok(0),
			Err(error) => Err(error.into())
		}
	}
}

impl io::Seek for Body {
	fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
		let (offset, whence) = seeking::split_seek_from(pos);
		Ok(self.seek_whence(offset, whence)?)
	}
}

impl From<Bytes> for Body {
	fn from(value: Bytes) -> Self { Self::from_bytes(value) }
}

impl From<Vec<u8>> for Body {
	fn from(value: Vec<u8>) -> Self { Self::from_bytes(value) }
}

impl From<String> for Body {
	fn from(value: String) -> Self { Self::from_bytes(value) }
}

impl From<&'static [u8]> for Body {
	fn from(value: &'static [u8]) -> Self { Self::from_bytes(value) }
}

impl From<&'static str> for Body {
	fn from(value: &'static str) -> Self { Self::from_bytes(value) }
}
