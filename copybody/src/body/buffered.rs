// SPDX-License-Identifier: Apache-2.0

mod window;

use std::{fmt, io};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt::{Debug, Formatter};
use std::io::Read as _;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use all_asserts::{assert_ge, assert_le};
use log::{debug, trace};
use crate::{Error, Result, Source};
use crate::error::OperationKind;
use crate::error::OperationKind::{Close, Read};
use super::Terminal;
use window::Window;

/// State shared by all copies of a buffered body.
struct Common {
	shared: Mutex<Shared>,
	/// The total stream length, set once declared or once the source ends. Kept
	/// outside the lock so length queries never wait on another copy's read.
	length: OnceLock<u64>,
	block_size: usize,
}

/// Lock-protected part of [`Common`].
struct Shared {
	source: Option<Box<dyn Source>>,
	window: Window,
	/// The sticky end-of-stream or failure last reported by the source.
	terminal: Option<Terminal>,
	/// A multiset of live cursor offsets: offset to the number of cursors at it.
	cursors: BTreeMap<u64, usize>,
	live: usize,
}

impl Debug for Common {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Common")
			.field("length", &self.length.get())
			.field("block_size", &self.block_size)
			.finish_non_exhaustive()
	}
}

impl Common {
	fn lock(&self, op: OperationKind) -> Result<MutexGuard<'_, Shared>> {
		self.shared.lock().map_err(|_| Error::poisoned(op))
	}
}

impl Shared {
	fn attach(&mut self, offset: u64) {
		*self.cursors.entry(offset).or_default() += 1;
	}

	fn release(&mut self, offset: u64) {
		if let Entry::Occupied(mut entry) = self.cursors.entry(offset) {
			*entry.get_mut() -= 1;
			if *entry.get() == 0 {
				entry.remove();
			}
		}
	}

	/// Moves a cursor, trimming the window if it was the last one at its start.
	fn advance(&mut self, from: u64, to: u64) {
		if from == to { return }

		assert_ge!(from, self.window.start());
		assert_le!(to, self.window.end());
		self.release(from);
		self.attach(to);
		if from == self.window.start() {
			self.trim();
		}
	}

	/// Drops buffered bytes below the slowest live cursor.
	fn trim(&mut self) {
		let Some((&min, _)) = self.cursors.first_key_value() else { return };

		assert_ge!(min, self.window.start());
		if min > self.window.start() {
			trace!("trimming buffer from {} to {min}", self.window.start());
			self.window.trim_to(min);
		}
	}

	/// Reads at least `shortfall` bytes past the window's end from the source, a
	/// whole number of blocks unless the known length cuts it short. Stops early
	/// on a short read. End-of-stream and failures are recorded as the sticky
	/// terminal state.
	fn fill(&mut self, shortfall: u64, block_size: usize, length: &OnceLock<u64>) {
		let Some(source) = self.source.as_mut() else { return };

		let block = block_size as u64;
		let mut count = shortfall.div_ceil(block).saturating_mul(block);
		let mut at_end = false;
		let known = length.get().copied();
		if let Some(len) = known {
			let remaining = len.saturating_sub(self.window.end());
			if count >= remaining {
				count = remaining;
				at_end = true;
			}
		}

		let count = usize::try_from(count).unwrap_or(usize::MAX);
		let spare = self.window.grow(count);
		let mut filled = 0;
		let mut terminal = None;
		while filled < count {
			match source.read(&mut spare[filled..]) {
				Ok(0) if known.is_some() => {
					terminal = Some(Terminal::Failed(Arc::new(io::Error::new(
						io::ErrorKind::UnexpectedEof,
						"source ended before its declared length"
					))));
					break
				}
				Ok(0) => {
					terminal = Some(Terminal::Eos);
					break
				}
				Ok(read) => {
					assert_le!(read, count - filled);
					filled += read;
					if filled < count {
						break
					}
				}
				Err(error) if error.kind() == io::ErrorKind::Interrupted => { }
				Err(error) => {
					terminal = Some(Terminal::Failed(Arc::new(error)));
					break
				}
			}
		}
		self.window.shrink_tail(count - filled);

		if terminal.is_none() && at_end && filled == count {
			terminal = Some(Terminal::Eos);
		}

		trace!("buffered {filled} bytes, window now {}..{}", self.window.start(), self.window.end());
		if let Some(ref terminal) = terminal {
			trace!("source reached terminal state {terminal:?} at {}", self.window.end());
			if let Terminal::Eos = terminal {
				let _ = length.set(self.window.end());
			}
		}
		self.terminal = terminal;
	}
}

/// A body over a sequential, single-pass source. Bytes read from the source are
/// retained in a window shared between all copies, until the slowest copy has
/// read past them.
#[derive(Debug)]
pub(super) struct BufferedBody {
	common: Arc<Common>,
	offset: u64,
	/// The end-of-stream or failure observed by this cursor.
	terminal: Option<Terminal>,
}

impl BufferedBody {
	pub fn new(source: Box<dyn Source>, length: Option<u64>, block_size: usize) -> Self {
		let mut cursors = BTreeMap::new();
		cursors.insert(0, 1);
		let common = Common {
			shared: Mutex::new(Shared {
				source: Some(source),
				window: Window::default(),
				terminal: None,
				cursors,
				live: 1,
			}),
			length: OnceLock::new(),
			block_size: block_size.max(1),
		};
		if let Some(length) = length {
			let _ = common.length.set(length);
		}

		Self {
			common: Arc::new(common),
			offset: 0,
			terminal: None,
		}
	}

	pub fn is_eos(&self) -> bool { self.terminal.is_some() }

	pub fn block_size(&self) -> usize { self.common.block_size }

	pub fn bytes_remaining(&self) -> Option<u64> {
		if self.terminal.is_some() {
			Some(0)
		} else {
			self.common.length.get().map(|len| len.saturating_sub(self.offset))
		}
	}

	pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
		if let Some(ref terminal) = self.terminal {
			return Err(terminal.to_error(Read))
		}

		let common = &*self.common;
		let mut shared = common.lock(Read)?;
		let begin = self.offset;
		let want = begin + buf.len() as u64;
		assert_ge!(begin, shared.window.start());

		if shared.terminal.is_none() && want > shared.window.end() {
			let shortfall = want - shared.window.end();
			shared.fill(shortfall, common.block_size, &common.length);
		}

		let end = want.min(shared.window.end());
		let count = (end - begin) as usize;
		buf[..count].copy_from_slice(shared.window.slice(begin, end));
		self.offset = end;
		shared.advance(begin, end);

		if want > end {
			self.terminal = shared.terminal.clone();
		}
		drop(shared);

		match self.terminal {
			Some(ref terminal) if count == 0 => Err(terminal.to_error(Read)),
			_ => Ok(count)
		}
	}

	pub fn try_clone(&self) -> Result<Self> {
		let mut shared = self.common.lock(OperationKind::Copy)?;
		shared.attach(self.offset);
		shared.live += 1;
		drop(shared);

		Ok(Self {
			common: Arc::clone(&self.common),
			offset: self.offset,
			terminal: self.terminal.clone(),
		})
	}

	/// Detaches from the shared state. The last copy to close releases the
	/// buffer and closes the source.
	pub fn close(self) -> Result {
		let Self { common, offset, .. } = self;
		let mut shared = common.shared.lock().unwrap_or_else(PoisonError::into_inner);
		shared.release(offset);
		shared.live -= 1;
		if shared.live > 0 {
			shared.trim();
			return Ok(())
		}

		let source = shared.source.take();
		shared.window.clear();
		shared.terminal = None;
		drop(shared);

		if let Some(mut source) = source {
			debug!("closing buffered source after its last body detached");
			source.close().map_err(|error| Error::io(Close, error))?;
		}
		Ok(())
	}

	pub fn with_source<T>(&self, f: impl FnOnce(&mut dyn Source) -> T) -> Option<T> {
		let mut shared = self.common.shared.lock().ok()?;
		let result = shared.source.as_deref_mut().map(|source| f(source));
		result
	}

	pub fn buffered_range(&self) -> Option<Range<u64>> {
		let shared = self.common.shared.lock().ok()?;
		Some(shared.window.start()..shared.window.end())
	}
}
