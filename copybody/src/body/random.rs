// SPDX-License-Identifier: Apache-2.0

use std::{fmt, io};
use std::fmt::{Debug, Formatter};
use std::io::{Read as _, Seek as _, SeekFrom};
use std::sync::{Arc, PoisonError, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use all_asserts::assert_le;
use log::debug;
use crate::{Error, ReadAt as _, Result, seeking, Source};
use crate::error::OperationKind;
use crate::error::OperationKind::{Close, Read, ReadAt};

/// How a random-access source is addressed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Access {
	/// Native addressed reads. Copies read concurrently under a shared lock.
	Positional,
	/// Seek-then-read pairs, serialized under an exclusive lock since the source
	/// has a single physical cursor.
	Seeking,
}

/// State shared by all copies of a random-access body.
struct Common {
	source: RwLock<Option<Box<dyn Source>>>,
	access: Access,
	/// The source position body offset `0` maps to.
	base: u64,
	len: u64,
	refs: AtomicUsize,
}

impl Debug for Common {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Common")
			.field("access", &self.access)
			.field("base", &self.base)
			.field("len", &self.len)
			.field("refs", &self.refs)
			.finish_non_exhaustive()
	}
}

impl Common {
	fn read_at(&self, buf: &mut [u8], offset: u64, op: OperationKind) -> Result<usize> {
		let pos = self.base.checked_add(offset).ok_or_else(|| Error::io(
			op,
			io::Error::new(io::ErrorKind::InvalidInput, "offset past the addressable end of the source")
		))?;
		loop {
			let result = match self.access {
				Access::Positional => {
					let guard = self.source.read().map_err(|_| Error::poisoned(op))?;
					let source = guard.as_ref().ok_or_else(|| Error::closed(op))?;
					let reader = source.positional().ok_or_else(|| Error::unsupported(op))?;
					reader.read_at(buf, pos)
				}
				Access::Seeking => {
					let mut guard = self.source.write().map_err(|_| Error::poisoned(op))?;
					let source = guard.as_mut().ok_or_else(|| Error::closed(op))?;
					let seeker = source.seeker().ok_or_else(|| Error::unsupported(op))?;
					seeker.seek(SeekFrom::Start(pos)).map_err(|error| Error::io(op, error))?;
					source.read(buf)
				}
			};

			match result {
				Ok(count) => {
					assert_le!(count, buf.len());
					return Ok(count)
				}
				Err(error) if error.kind() == io::ErrorKind::Interrupted => { }
				Err(error) => return Err(Error::io(op, error))
			}
		}
	}

	/// Drops one reference, closing the source if it was the last.
	fn detach(&self) -> Result {
		if self.refs.fetch_sub(1, Ordering::AcqRel) > 1 {
			return Ok(())
		}

		let source = self.source
						 .write()
						 .unwrap_or_else(PoisonError::into_inner)
						 .take();
		if let Some(mut source) = source {
			debug!("closing random-access source after its last body detached");
			source.close().map_err(|error| Error::io(Close, error))?;
		}
		Ok(())
	}
}

/// A pass-through body over a source supporting addressed reads or seeking.
/// Every read is translated into an addressed read at the cursor; nothing is
/// buffered.
#[derive(Debug)]
pub(super) struct RandomBody {
	common: Arc<Common>,
	offset: u64,
	eos: bool,
}

impl RandomBody {
	pub fn new(source: Box<dyn Source>, access: Access, base: u64, len: u64) -> Self {
		Self {
			common: Arc::new(Common {
				source: RwLock::new(Some(source)),
				access,
				base,
				len,
				refs: AtomicUsize::new(1),
			}),
			offset: 0,
			eos: false,
		}
	}

	pub fn is_eos(&self) -> bool { self.eos }

	pub fn bytes_remaining(&self) -> u64 {
		if self.eos {
			0
		} else {
			self.common.len.saturating_sub(self.offset)
		}
	}

	pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
		if self.eos { return Err(Error::eos(Read)) }
		if buf.is_empty() { return Ok(0) }

		let avail = self.common.len.saturating_sub(self.offset);
		if avail == 0 {
			self.eos = true;
			return Err(Error::eos(Read))
		}

		let want = buf.len().min(usize::try_from(avail).unwrap_or(usize::MAX));
		let count = self.common.read_at(&mut buf[..want], self.offset, Read)?;
		if count == 0 {
			// The source ended before its measured length.
			self.eos = true;
			return Err(Error::eos(Read))
		}

		self.offset += count as u64;
		self.eos = want < buf.len() && count == want;
		Ok(count)
	}

	pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
		if buf.is_empty() { return Ok(0) }

		let len = self.common.len;
		let offset = offset.min(len);
		let want = buf.len().min(usize::try_from(len - offset).unwrap_or(usize::MAX));
		if want == 0 { return Err(Error::eos(ReadAt)) }

		match self.common.read_at(&mut buf[..want], offset, ReadAt)? {
			0 => Err(Error::eos(ReadAt)),
			count => Ok(count)
		}
	}

	pub fn seek(&mut self, offset: i64, whence: i32) -> Result<u64> {
		let pos = seeking::resolve(offset, whence, self.offset, self.common.len)
			.map_err(Error::seek)?;
		self.offset = pos;
		self.eos = false;
		Ok(pos)
	}

	pub fn try_clone(&self) -> Self {
		self.common.refs.fetch_add(1, Ordering::Relaxed);
		Self {
			common: Arc::clone(&self.common),
			offset: self.offset,
			eos: self.eos,
		}
	}

	pub fn close(self) -> Result {
		self.common.detach()
	}

	pub fn with_source<T>(&self, f: impl FnOnce(&mut dyn Source) -> T) -> Option<T> {
		let mut guard = self.common.source.write().ok()?;
		let result = guard.as_deref_mut().map(|source| f(source));
		result
	}
}
