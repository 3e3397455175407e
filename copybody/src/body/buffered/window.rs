// SPDX-License-Identifier: Apache-2.0

use all_asserts::{assert_ge, assert_le};

/// Capacity below which a drained window keeps its memory for further fills.
const SHED_THRESHOLD: usize = 1 << 20;

/// A sliding window over a stream: the contiguous bytes `start..end` retained
/// from it. Bytes are appended at the end as the stream is read, and dropped
/// from the front as the slowest reader moves past them.
///
/// Trimming only advances a `head` index into the backing vector. The retained
/// bytes are moved to the front lazily, once the dead prefix is at least as
/// large as the live data, or when appending would otherwise reallocate. This
/// keeps the backing memory proportional to the retained span rather than the
/// whole stream.
#[derive(Debug, Default)]
pub(super) struct Window {
	data: Vec<u8>,
	/// The index of the first retained byte in `data`.
	head: usize,
	/// The stream offset of the first retained byte.
	start: u64,
}

impl Window {
	/// Returns the stream offset of the first retained byte.
	pub fn start(&self) -> u64 { self.start }

	/// Returns the stream offset just past the last retained byte.
	pub fn end(&self) -> u64 { self.start + self.len() as u64 }

	/// Returns the number of retained bytes.
	pub fn len(&self) -> usize { self.data.len() - self.head }

	/// Returns the retained bytes between stream offsets `from` and `to`.
	pub fn slice(&self, from: u64, to: u64) -> &[u8] {
		assert_ge!(from, self.start);
		assert_le!(from, to);
		assert_le!(to, self.end());
		let i = self.head + (from - self.start) as usize;
		let j = self.head + (to - self.start) as usize;
		&self.data[i..j]
	}

	/// Appends `count` zeroed bytes, returning them to be filled. Bytes left
	/// unfilled must be given back with [`shrink_tail`](Self::shrink_tail).
	pub fn grow(&mut self, count: usize) -> &mut [u8] {
		if self.head > 0 && self.data.len() + count > self.data.capacity() {
			self.compact();
		}

		let len = self.data.len();
		self.data.resize(len + count, 0);
		&mut self.data[len..]
	}

	/// Removes `count` bytes from the end.
	pub fn shrink_tail(&mut self, count: usize) {
		assert_le!(count, self.len());
		self.data.truncate(self.data.len() - count);
	}

	/// Drops all bytes before stream offset `offset`.
	pub fn trim_to(&mut self, offset: u64) {
		assert_ge!(offset, self.start);
		assert_le!(offset, self.end());
		self.head += (offset - self.start) as usize;
		self.start = offset;

		if self.head == self.data.len() {
			self.data.clear();
			self.head = 0;
			self.shed();
		} else if self.head >= self.len() {
			self.compact();
		}
	}

	/// Releases all memory. The start offset is kept.
	pub fn clear(&mut self) {
		self.start = self.end();
		self.data = Vec::new();
		self.head = 0;
	}

	/// Moves the retained bytes to the front of the backing vector.
	fn compact(&mut self) {
		let len = self.len();
		self.data.copy_within(self.head.., 0);
		self.data.truncate(len);
		self.head = 0;
		self.shed();
	}

	/// Frees backing memory left over from a larger span than is now retained.
	fn shed(&mut self) {
		let cap = self.data.capacity();
		if cap > SHED_THRESHOLD && self.data.len() < cap / 4 {
			self.data.shrink_to(self.data.len() * 2);
		}
	}
}
