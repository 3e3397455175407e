// SPDX-License-Identifier: Apache-2.0

//! Building bodies from sources, picking the cheapest variant supporting
//! independent cursors.

use std::io::{Read, Seek, SeekFrom};
use log::debug;
use crate::{Body, BodyOptions, DEFAULT_BLOCK_SIZE, Error, ReaderSource, Result, Source};
use crate::error::OperationKind::{Close, ProbeSeek, ProbeSize};
use super::random::Access;

/// A seekable source's current position, and its length from there if it had
/// to be measured.
struct Measure {
	base: u64,
	len: Option<u64>,
}

/// Finds the position of `seeker`, and if `measure` is set, the distance from
/// it to the end. The seeker is returned to its position afterward.
fn locate_in_seeker(seeker: &mut dyn Seek, measure: bool) -> std::io::Result<Measure> {
	let base = seeker.stream_position()?;
	let len = if measure {
		let end = seeker.seek(SeekFrom::End(0))?;
		seeker.seek(SeekFrom::Start(base))?;
		Some(end.saturating_sub(base))
	} else {
		None
	};
	Ok(Measure { base, len })
}

impl Body {
	/// Creates a body from `source` with default options. See
	/// [`from_source_with`](Self::from_source_with).
	pub fn from_source(source: impl Source + 'static) -> Result<Self> {
		Self::from_source_with(source, BodyOptions::default())
	}

	/// Creates a body from `source`, starting at its current position.
	///
	/// The length is taken from the declared length in `options` if set, then
	/// from the size the source reports, then by seeking to its end and back. A
	/// failure to query the size or to seek aborts construction, unless a length
	/// was declared; a seekable source whose position can't be found is then read
	/// from offset `0`. A zero length closes the source immediately and produces
	/// an empty body.
	///
	/// With a known length, sources supporting addressed reads or seeking are
	/// read through directly. Anything else is buffered.
	pub fn from_source_with(source: impl Source + 'static, options: BodyOptions) -> Result<Self> {
		let mut source: Box<dyn Source> = Box::new(source);
		let declared = options.length();
		let reported = match declared {
			Some(_) => None,
			None => source.size().map_err(|error| Error::io(ProbeSize, error))?
		};

		let mut base = 0;
		let mut len = declared;
		if let Some(seeker) = source.seeker() {
			let measure = declared.is_none() && reported.is_none();
			match locate_in_seeker(seeker, measure) {
				Ok(found) => {
					base = found.base;
					if found.len.is_some() {
						debug!("measured seekable source by seeking from {base}");
						len = found.len;
					}
				}
				Err(error) if declared.is_some() => {
					debug!("couldn't find the source position, reading the declared length from 0: {error}");
				}
				Err(error) => return Err(Error::io(ProbeSeek, error))
			}
		}

		if len.is_none() {
			len = reported.map(|size| size.saturating_sub(base));
		}

		if len == Some(0) {
			debug!("source has zero length, closing it and using an empty body");
			source.close().map_err(|error| Error::io(Close, error))?;
			return Ok(Self::empty())
		}

		let positional = source.positional().is_some();
		let seekable = source.seeker().is_some();
		let block_size = options.block_size();
		Ok(match len {
			Some(len) if positional => {
				debug!("reading {len} bytes from {base} with addressed reads");
				Self::random(source, Access::Positional, base, len)
			}
			Some(len) if seekable => {
				debug!("reading {len} bytes from {base} by seeking");
				Self::random(source, Access::Seeking, base, len)
			}
			len => {
				debug!("buffering sequential source, length {len:?}");
				Self::buffered(source, len, block_size)
			}
		})
	}

	/// Creates a buffered body from a sequential reader of unknown length.
	pub fn from_reader(reader: impl Read + Send + Sync + 'static) -> Self {
		Self::buffered(Box::new(ReaderSource::new(reader)), None, DEFAULT_BLOCK_SIZE)
	}
}
