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

#![allow(dead_code)]

use std::fmt::{Arguments, Debug};
use std::io;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use copybody::{Body, ReadAt, Source};

macro_rules! qc_assert_eq {
	($left:expr,$right:expr) => {{
		let left = $left;
		let right = $right;
		if left == right {
			TestResult::passed()
		} else {
			TestResult::error(
				common::format_qc_assert_error(&left, &right, None)
			)
		}
	}};
    ($left:expr,$right:expr,$($arg:tt)+) => {{
		let left = $left;
		let right = $right;
		if left == right {
			TestResult::passed()
		} else {
			TestResult::error(
				common::format_qc_assert_error(&left, &right, Some(format_args!($($arg)+)))
			)
		}
	}};
}

pub fn format_qc_assert_error<L: Debug, R: Debug>(left: &L, right: &R, msg: Option<Arguments>) -> String {
	if let Some(msg) = msg {
		format!(
			"assertion failed `(left == right)`: {msg}\n \
			left: `{left:?}`,\nright: `{right:?}`",
		)
	} else {
		format!(
			"assertion failed `(left == right)`:\n \
			left: `{left:?}`,\nright: `{right:?}`",
		)
	}
}

#[ctor::ctor]
fn init_logger() {
	let _ = env_logger::builder().is_test(true).try_init();
}

/// Reads from `body` in chunks of `chunk` bytes until end-of-stream, panicking
/// on any other error.
pub fn read_chunked(body: &mut Body, chunk: usize) -> Vec<u8> {
	let mut buf = vec![0; chunk.max(1)];
	let mut out = Vec::new();
	loop {
		match body.read(&mut buf) {
			Ok(count) => out.extend_from_slice(&buf[..count]),
			Err(error) if error.is_eos() => break out,
			Err(error) => panic!("unexpected read error: {error}")
		}
	}
}

/// Reads exactly `count` bytes or fewer if the body ends first.
pub fn read_n(body: &mut Body, count: usize) -> Vec<u8> {
	let mut buf = vec![0; count];
	let read = body.read(&mut buf).unwrap();
	buf.truncate(read);
	buf
}

/// Capabilities a [`MockSource`] advertises.
#[derive(Copy, Clone, Debug, Default)]
pub struct Caps {
	pub size: bool,
	pub seek: bool,
	pub read_at: bool,
}

impl Caps {
	pub const NONE: Self = Self { size: false, seek: false, read_at: false };
	pub const SIZE: Self = Self { size: true, seek: false, read_at: false };
	pub const SEEK: Self = Self { size: false, seek: true, read_at: false };
	pub const POSITIONAL: Self = Self { size: true, seek: false, read_at: true };
	pub const ALL: Self = Self { size: true, seek: true, read_at: true };
}

/// Counters shared between a [`MockSource`] and the test observing it.
#[derive(Debug, Default)]
pub struct Stats {
	reads: Mutex<Vec<Range<u64>>>,
	seeks: AtomicUsize,
	closes: AtomicUsize,
	interrupts: AtomicUsize,
}

impl Stats {
	/// Returns the ranges of all non-empty reads, in order.
	pub fn reads(&self) -> Vec<Range<u64>> { self.reads.lock().unwrap().clone() }

	pub fn seeks(&self) -> usize { self.seeks.load(Ordering::SeqCst) }

	pub fn closes(&self) -> usize { self.closes.load(Ordering::SeqCst) }

	pub fn interrupts(&self) -> usize { self.interrupts.load(Ordering::SeqCst) }

	fn record(&self, range: Range<u64>) {
		if !range.is_empty() {
			self.reads.lock().unwrap().push(range);
		}
	}
}

/// An instrumented in-memory source with selectable capabilities, short reads,
/// and injected failures.
#[derive(Debug)]
pub struct MockSource {
	data: Vec<u8>,
	pos: u64,
	caps: Caps,
	chunk: Option<usize>,
	fail_at: Option<u64>,
	interrupt_at: Option<u64>,
	interrupted: AtomicBool,
	fail_queries: bool,
	fail_close: bool,
	stats: Arc<Stats>,
}

impl MockSource {
	pub fn new(data: impl Into<Vec<u8>>, caps: Caps) -> Self {
		Self {
			data: data.into(),
			pos: 0,
			caps,
			chunk: None,
			fail_at: None,
			interrupt_at: None,
			interrupted: AtomicBool::new(false),
			fail_queries: false,
			fail_close: false,
			stats: Arc::default(),
		}
	}

	/// Limits every read to at most `chunk` bytes.
	pub fn chunked(mut self, chunk: usize) -> Self {
		self.chunk = Some(chunk.max(1));
		self
	}

	/// Fails any read at or past `offset`. Reads before it stop short of it.
	pub fn fail_at(mut self, offset: u64) -> Self {
		self.fail_at = Some(offset);
		self
	}

	/// Interrupts the first read at or past `offset`, once.
	pub fn interrupt_at(mut self, offset: u64) -> Self {
		self.interrupt_at = Some(offset);
		self
	}

	/// Fails size queries and seeks.
	pub fn fail_queries(mut self) -> Self {
		self.fail_queries = true;
		self
	}

	/// Fails when closed.
	pub fn fail_close(mut self) -> Self {
		self.fail_close = true;
		self
	}

	pub fn stats(&self) -> Arc<Stats> { Arc::clone(&self.stats) }

	fn read_range(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
		if self.interrupt_at.is_some_and(|at| offset >= at) &&
		   !self.interrupted.swap(true, Ordering::SeqCst) {
			self.stats.interrupts.fetch_add(1, Ordering::SeqCst);
			return Err(io::ErrorKind::Interrupted.into())
		}

		if self.fail_at.is_some_and(|at| offset >= at) {
			return Err(io::Error::new(io::ErrorKind::Other, "injected failure"))
		}

		let len = self.data.len() as u64;
		let mut end = len.min(offset + buf.len() as u64);
		if let Some(chunk) = self.chunk {
			end = end.min(offset + chunk as u64);
		}
		if let Some(at) = self.fail_at {
			end = end.min(at);
		}
		let start = offset.min(end);
		let count = (end - start) as usize;
		buf[..count].copy_from_slice(&self.data[start as usize..end as usize]);
		self.stats.record(start..end);
		Ok(count)
	}
}

impl Read for MockSource {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		let count = self.read_range(buf, self.pos)?;
		self.pos += count as u64;
		Ok(count)
	}
}

impl Seek for MockSource {
	fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
		self.stats.seeks.fetch_add(1, Ordering::SeqCst);
		if self.fail_queries {
			return Err(io::Error::new(io::ErrorKind::Other, "injected seek failure"))
		}

		let len = self.data.len() as i64;
		let target = match pos {
			SeekFrom::Start(pos) => pos as i64,
			SeekFrom::Current(off) => self.pos as i64 + off,
			SeekFrom::End(off) => len + off,
		};
		if target < 0 {
			return Err(io::ErrorKind::InvalidInput.into())
		}
		self.pos = target as u64;
		Ok(self.pos)
	}
}

impl ReadAt for MockSource {
	fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
		self.read_range(buf, offset)
	}
}

impl Source for MockSource {
	fn size(&self) -> io::Result<Option<u64>> {
		if !self.caps.size {
			Ok(None)
		} else if self.fail_queries {
			Err(io::Error::new(io::ErrorKind::Other, "injected size failure"))
		} else {
			Ok(Some(self.data.len() as u64))
		}
	}

	fn seeker(&mut self) -> Option<&mut dyn Seek> {
		if self.caps.seek { Some(self) } else { None }
	}

	fn positional(&self) -> Option<&dyn ReadAt> {
		if self.caps.read_at { Some(self) } else { None }
	}

	fn close(&mut self) -> io::Result<()> {
		self.stats.closes.fetch_add(1, Ordering::SeqCst);
		if self.fail_close {
			Err(io::Error::new(io::ErrorKind::Other, "injected close failure"))
		} else {
			Ok(())
		}
	}
}
