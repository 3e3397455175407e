// SPDX-License-Identifier: Apache-2.0

//! Sources wrapped by bodies, and the optional capabilities they advertise.

use std::fs::File;
use std::io;
use std::io::{Cursor, Read, Seek};
use cfg_if::cfg_if;

/// A reader supporting addressed reads at an arbitrary offset, without moving
/// any cursor. Reads take `&self`, so several copies may read concurrently.
pub trait ReadAt {
	/// Reads bytes starting at `offset` into `buf`, returning the number of bytes
	/// read. Returns `0` at or beyond the end of the data.
	fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;
}

/// A byte source a [`Body`](crate::Body) can be built from.
///
/// Every source can be read sequentially. A source may also advertise optional
/// capabilities, which decide how the body is built:
///
/// - [`size`](Self::size): the total size, such as from file metadata.
/// - [`seeker`](Self::seeker): rewindable seeking.
/// - [`positional`](Self::positional): addressed reads.
///
/// The source is closed with [`close`](Self::close) when the last body attached
/// to it is closed, then dropped.
pub trait Source: Read + Send + Sync {
	/// Returns the total size the source reports about itself, or `None` if it
	/// can't tell.
	fn size(&self) -> io::Result<Option<u64>> { Ok(None) }

	/// Returns the source as a seeker, if it supports seeking.
	fn seeker(&mut self) -> Option<&mut dyn Seek> { None }

	/// Returns the source as an addressed reader, if it supports addressed reads.
	fn positional(&self) -> Option<&dyn ReadAt> { None }

	/// Closes the source. Called at most once, when the last attached body is
	/// closed or dropped.
	fn close(&mut self) -> io::Result<()> { Ok(()) }
}

impl<S: Source + ?Sized> Source for Box<S> {
	fn size(&self) -> io::Result<Option<u64>> { (**self).size() }

	fn seeker(&mut self) -> Option<&mut dyn Seek> { (**self).seeker() }

	fn positional(&self) -> Option<&dyn ReadAt> { (**self).positional() }

	fn close(&mut self) -> io::Result<()> { (**self).close() }
}

cfg_if! {
	if #[cfg(unix)] {
		impl ReadAt for File {
			fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
				std::os::unix::fs::FileExt::read_at(self, buf, offset)
			}
		}

		fn file_read_at(file: &File) -> Option<&dyn ReadAt> { Some(file) }
	} else if #[cfg(windows)] {
		impl ReadAt for File {
			/// Windows moves the file cursor on positional reads. Bodies never use
			/// the cursor of a file they read positionally, so this is harmless.
			fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
				std::os::windows::fs::FileExt::seek_read(self, buf, offset)
			}
		}

		fn file_read_at(file: &File) -> Option<&dyn ReadAt> { Some(file) }
	} else {
		fn file_read_at(_: &File) -> Option<&dyn ReadAt> { None }
	}
}

/// Files report their size from metadata only if they're regular files; pipes
/// and devices report no size. Non-regular files that can't seek will fail to
/// be measured, wrap them in a [`ReaderSource`] instead.
impl Source for File {
	fn size(&self) -> io::Result<Option<u64>> {
		let meta = self.metadata()?;
		Ok(meta.is_file().then(|| meta.len()))
	}

	fn seeker(&mut self) -> Option<&mut dyn Seek> { Some(self) }

	fn positional(&self) -> Option<&dyn ReadAt> { file_read_at(self) }
}

impl<T: AsRef<[u8]>> ReadAt for Cursor<T> {
	fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
		let data = self.get_ref().as_ref();
		let start = usize::try_from(offset).map_or(data.len(), |off| off.min(data.len()));
		let count = buf.len().min(data.len() - start);
		buf[..count].copy_from_slice(&data[start..][..count]);
		Ok(count)
	}
}

impl<T: AsRef<[u8]> + Send + Sync> Source for Cursor<T> {
	fn size(&self) -> io::Result<Option<u64>> {
		Ok(Some(self.get_ref().as_ref().len() as u64))
	}

	fn seeker(&mut self) -> Option<&mut dyn Seek> { Some(self) }

	fn positional(&self) -> Option<&dyn ReadAt> { Some(self) }
}

/// A [`Source`] reading from a wrapped [`Read`]er, advertising no capabilities.
/// Bodies over it are always buffered.
#[derive(Debug)]
pub struct ReaderSource<R: Read> {
	reader: R,
}

impl<R: Read> ReaderSource<R> {
	pub fn new(reader: R) -> Self { Self { reader } }

	pub fn get_ref(&self) -> &R { &self.reader }

	pub fn get_mut(&mut self) -> &mut R { &mut self.reader }

	pub fn into_inner(self) -> R { self.reader }
}

impl<R: Read> From<R> for ReaderSource<R> {
	fn from(reader: R) -> Self { Self::new(reader) }
}

impl<R: Read> Read for ReaderSource<R> {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		self.reader.read(buf)
	}
}

impl<R: Read + Send + Sync> Source for ReaderSource<R> { }

/// A [`Source`] reading from a wrapped seekable [`Read`]er. Bodies over it are
/// measured by seeking, then read by seeking to each requested offset.
#[derive(Debug)]
pub struct SeekSource<R: Read + Seek> {
	reader: R,
}

impl<R: Read + Seek> SeekSource<R> {
	pub fn new(reader: R) -> Self { Self { reader } }

	pub fn get_ref(&self) -> &R { &self.reader }

	pub fn get_mut(&mut self) -> &mut R { &mut self.reader }

	pub fn into_inner(self) -> R { self.reader }
}

impl<R: Read + Seek> From<R> for SeekSource<R> {
	fn from(reader: R) -> Self { Self::new(reader) }
}

impl<R: Read + Seek> Read for SeekSource<R> {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		self.reader.read(buf)
	}
}

impl<R: Read + Seek + Send + Sync> Source for SeekSource<R> {
	fn seeker(&mut self) -> Option<&mut dyn Seek> { Some(&mut self.reader) }
}
