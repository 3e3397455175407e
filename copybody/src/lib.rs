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

//! Payload bodies that can be copied into independent cursors over the same
//! bytes, even when the bytes come from a single-pass stream.
//!
//! ## How it works
//!
//! A [`Body`] is one of a few variants, picked when it's built. Bytes held in
//! memory are shared between copies, each copy keeping its own offset. Empty and
//! closed bodies hold nothing at all.
//!
//! Bodies built from a [`Source`] share a reference-counted record of the source
//! between copies. When the source reports a length and supports addressed reads,
//! every read is passed through to the source at the copy's offset; copies may
//! read concurrently. Sources that can seek but not read at an offset are read by
//! seeking then reading, one copy at a time. Sources that can seek but don't know
//! their size are measured by seeking to their end and back.
//!
//! ### Buffering
//!
//! Sequential sources can only be read once, so bytes read from them are kept in
//! a *window*, shared by all copies of the body, of the stream range between the
//! slowest and fastest copy. When a copy reads past the window, the source is read
//! in *blocks* of 64KiB by default, and the bytes appended to the window. As the
//! slowest copy moves forward, bytes behind it are trimmed from the window; memory
//! held stays proportional to how far apart the copies are, not to the length of
//! the stream. The trimmed prefix is compacted lazily, once it's at least as large
//! as the retained bytes.
//!
//! The end of the stream, or any error the source returns, is recorded once and
//! reported to each copy when it reaches that point. Copies behind it read the
//! bytes buffered before it as normal.
//!
//! ### Closing
//!
//! Closing a body detaches it from the shared record. The source is closed when
//! the last attached body is closed or dropped.

mod body;
mod error;
mod options;
pub mod seeking;
mod source;

pub use body::Body;
pub use error::*;
pub use options::*;
pub use source::*;
