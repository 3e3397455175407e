// SPDX-License-Identifier: Apache-2.0

/// The default growth granularity of a buffered body, 64KiB.
pub const DEFAULT_BLOCK_SIZE: usize = 65536;

/// Options for constructing a [`Body`](crate::Body) from a [`Source`](crate::Source).
///
/// # Length
///
/// The caller-declared length of the source, measured from its current
/// position. When set, it takes precedence over any size the source reports
/// about itself, and no size probing is done. A declared length of zero always
/// produces an empty body. If a sequential source ends before its declared
/// length, the body reports an unexpected end-of-file failure rather than
/// shrinking the length.
///
/// # Block size
///
/// The minimum amount a buffered body grows by when a read runs past the bytes
/// it has retained. Shortfalls are rounded up to a multiple of this size, then
/// clamped to the remaining length if it's known. Defaults to `64KiB`. Larger
/// blocks mean fewer reads on the source but more memory held between the
/// slowest and fastest copy. Values below `1` are raised to `1`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct BodyOptions {
	pub length: Option<u64>,
	pub block_size: usize,
}

impl Default for BodyOptions {
	fn default() -> Self { Self::new() }
}

impl BodyOptions {
	/// Creates a new set of body options.
	pub const fn new() -> Self {
		Self {
			length: None,
			block_size: DEFAULT_BLOCK_SIZE,
		}
	}

	/// Returns the declared length.
	#[inline]
	pub const fn length(&self) -> Option<u64> { self.length }

	/// Returns the block size, never less than `1`.
	#[inline]
	pub const fn block_size(&self) -> usize {
		if self.block_size == 0 { 1 } else { self.block_size }
	}

	/// Sets the declared length.
	#[inline]
	pub const fn with_length(mut self, value: u64) -> Self {
		self.length = Some(value);
		self
	}

	/// Sets the block size.
	#[inline]
	pub const fn with_block_size(mut self, value: usize) -> Self {
		self.block_size = value;
		self
	}
}
