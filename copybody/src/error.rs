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

use std::{fmt, io, result};
use std::error::Error as StdError;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use amplify_derive::Display;

pub type ErrorBox = Box<dyn StdError + Send + Sync>;

pub type Result<T = ()> = result::Result<T, Error>;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Display)]
pub enum OperationKind {
	#[default]
	#[display("unknown operation")]
	Unknown,
	#[display("read")]
	Read,
	#[display("addressed read")]
	ReadAt,
	#[display("seek")]
	Seek,
	#[display("copy")]
	Copy,
	#[display("close")]
	Close,
	#[display("bulk write")]
	WriteTo,
	#[display("query source size")]
	ProbeSize,
	#[display("measure source by seeking")]
	ProbeSeek,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Display)]
pub enum ErrorKind {
	#[display("end-of-stream")]
	Eos,
	#[display("body already closed")]
	Closed,
	#[display("source IO error")]
	Io,
	#[display("{0}")]
	Seek(SeekError),
	#[display("operation not supported by this body")]
	Unsupported,
	#[display("shared body state poisoned")]
	Poisoned,
}

/// An invalid seek request. Each variant carries the offending input.
#[derive(Copy, Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SeekError {
	#[error("unknown whence value {whence}")]
	UnknownWhence { whence: i32 },
	#[error("whence is start but offset {offset} is negative")]
	NegativeStart { offset: i64 },
	#[error("computed offset {offset} is negative")]
	NegativeComputed { offset: i64 },
}

#[derive(Debug)]
pub struct Error {
	op: OperationKind,
	kind: ErrorKind,
	source: Option<ErrorBox>,
}

impl Display for Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let Self { op, kind, source } = self;
		if let Some(source) = source {
			write!(f, "{op} failed; {kind} ({source})")
		} else {
			write!(f, "{op} failed; {kind}")
		}
	}
}

impl StdError for Error {
	fn source(&self) -> Option<&(dyn StdError + 'static)> {
		if let Some(ref source) = self.source {
			Some(source.as_ref())
		} else {
			None
		}
	}
}

impl Error {
	pub(crate) fn new(
		op: OperationKind,
		kind: ErrorKind,
		source: Option<ErrorBox>
	) -> Self {
		Self { op, kind, source }
	}

	/// Creates a new "end-of-stream" error.
	pub fn eos(op: OperationKind) -> Self { Self::new(op, ErrorKind::Eos, None) }

	/// Creates a new "closed" error.
	pub fn closed(op: OperationKind) -> Self { Self::new(op, ErrorKind::Closed, None) }

	/// Creates a new IO error.
	pub fn io(op: OperationKind, error: io::Error) -> Self {
		Self::new(op, ErrorKind::Io, Some(error.into()))
	}

	/// Creates a new IO error from a failure shared between several cursors.
	pub(crate) fn shared_io(op: OperationKind, error: Arc<io::Error>) -> Self {
		Self::new(op, ErrorKind::Io, Some(Box::new(error)))
	}

	/// Creates a new seek error.
	pub fn seek(error: SeekError) -> Self {
		Self::new(OperationKind::Seek, ErrorKind::Seek(error), None)
	}

	/// Creates a new "unsupported" error.
	pub fn unsupported(op: OperationKind) -> Self {
		Self::new(op, ErrorKind::Unsupported, None)
	}

	pub(crate) fn poisoned(op: OperationKind) -> Self {
		Self::new(op, ErrorKind::Poisoned, None)
	}

	/// Returns the operation kind.
	pub fn operation(&self) -> OperationKind { self.op }

	/// Sets the operation kind.
	pub fn with_operation(mut self, op: OperationKind) -> Self {
		self.op = op;
		self
	}

	/// Returns the error kind.
	pub fn kind(&self) -> ErrorKind { self.kind }

	/// Returns `true` if this is an "end-of-stream" error.
	pub fn is_eos(&self) -> bool { matches!(self.kind, ErrorKind::Eos) }

	/// Returns `true` if this is a "closed" error.
	pub fn is_closed(&self) -> bool { matches!(self.kind, ErrorKind::Closed) }

	/// Returns the seek error, if this error was caused by an invalid seek.
	pub fn seek_error(&self) -> Option<SeekError> {
		if let ErrorKind::Seek(error) = self.kind {
			Some(error)
		} else {
			None
		}
	}

	/// Returns the source downcast into an IO Error, if possible.
	pub fn io_source(&self) -> Option<&io::Error> {
		let source = self.source.as_deref()?;
		source.downcast_ref::<io::Error>().or_else(||
			source.downcast_ref::<Arc<io::Error>>().map(|shared| &**shared)
		)
	}
}

impl From<io::Error> for Error {
	fn from(value: io::Error) -> Self {
		Self::io(OperationKind::Unknown, value)
	}
}

impl From<Error> for io::Error {
	fn from(value: Error) -> Self {
		let kind = match value.kind {
			ErrorKind::Eos         => io::ErrorKind::UnexpectedEof,
			ErrorKind::Seek(_)     => io::ErrorKind::InvalidInput,
			ErrorKind::Unsupported => io::ErrorKind::Unsupported,
			ErrorKind::Io          => value.io_source()
										   .map_or(io::ErrorKind::Other, io::Error::kind),
			ErrorKind::Closed   |
			ErrorKind::Poisoned    => io::ErrorKind::Other,
		};
		io::Error::new(kind, value)
	}
}
