// SPDX-License-Identifier: Apache-2.0

use std::io::{Read, Seek, SeekFrom};
use bytes::Bytes;
use pretty_assertions::{assert_eq, assert_str_eq};
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use copybody::{Body, SeekError};
use copybody::seeking::{SEEK_CURRENT, SEEK_END, SEEK_START};
use common::{read_chunked, read_n};

#[macro_use]
mod common;

#[quickcheck]
fn reassemble(data: Vec<u8>, chunk: u8) -> TestResult {
	let mut body = Body::from_bytes(data.clone());
	let len = data.len() as u64;
	if body.bytes_remaining() != Some(len) {
		return TestResult::error("length mismatch")
	}
	qc_assert_eq!(read_chunked(&mut body, chunk as usize), data)
}

#[quickcheck]
fn copies_are_independent(data: Vec<u8>, split: usize) -> TestResult {
	if data.is_empty() { return TestResult::discard() }

	let split = split % data.len();
	let mut body = Body::from(data.clone());
	let mut head = vec![0; split];
	if split > 0 {
		body.read(&mut head).unwrap();
	}
	let mut copy = body.try_clone().unwrap();
	let rest = read_chunked(&mut body, 7);
	qc_assert_eq!(read_chunked(&mut copy, 3), rest)
}

#[test]
fn copy_reads_from_its_own_cursor() {
	let mut body = Body::from("abcd");
	assert_eq!(read_n(&mut body, 1), b"a");
	let mut copy = body.try_clone().unwrap();
	assert_eq!(read_n(&mut body, 2), b"bc");
	assert_eq!(read_n(&mut copy, 3), b"bcd");
	assert_eq!(read_n(&mut body, 1), b"d");
	copy.close().unwrap();
	body.close().unwrap();
}

#[test]
fn seek_from_end() {
	let mut body = Body::from("abcd");
	assert_eq!(body.seek_whence(-2, SEEK_END).unwrap(), 2);
	let mut buf = [0; 4];
	assert_eq!(body.read(&mut buf).unwrap(), 2);
	assert_eq!(&buf[..2], b"cd");
	assert!(body.read(&mut buf).unwrap_err().is_eos());
	assert_eq!(body.bytes_remaining(), Some(0));
}

#[test]
fn seek_unknown_whence_keeps_cursor() {
	let mut body = Body::from("abcd");
	assert_eq!(read_n(&mut body, 1), b"a");
	let error = body.seek_whence(1, 7).unwrap_err();
	assert_eq!(error.seek_error(), Some(SeekError::UnknownWhence { whence: 7 }));
	assert_eq!(read_n(&mut body, 1), b"b");
}

#[test]
fn seek_negative() {
	let mut body = Body::from("abcd");
	assert_eq!(
		body.seek_whence(-1, SEEK_START).unwrap_err().seek_error(),
		Some(SeekError::NegativeStart { offset: -1 })
	);
	assert_eq!(
		body.seek_whence(-3, SEEK_CURRENT).unwrap_err().seek_error(),
		Some(SeekError::NegativeComputed { offset: -3 })
	);
	assert_eq!(body.seek_whence(10, SEEK_START).unwrap(), 4);
}

#[test]
fn seek_clears_eos() {
	let mut body = Body::from("ab");
	assert_eq!(read_chunked(&mut body, 8), b"ab");
	assert!(body.is_eos());
	assert_eq!(body.seek_whence(0, SEEK_START).unwrap(), 0);
	assert!(!body.is_eos());
	assert_eq!(read_chunked(&mut body, 1), b"ab");
}

#[test]
fn read_at_leaves_cursor() {
	let body = Body::from_bytes(Bytes::from_static(b"abcdef"));
	let mut buf = [0; 3];
	assert_eq!(body.read_at(&mut buf, 4).unwrap(), 2);
	assert_eq!(&buf[..2], b"ef");
	assert!(body.read_at(&mut buf, 6).unwrap_err().is_eos());
	assert!(body.read_at(&mut buf, 60).unwrap_err().is_eos());
	assert_eq!(body.read_at(&mut [], 60).unwrap(), 0);

	let mut body = body;
	assert_eq!(read_n(&mut body, 2), b"ab");
}

#[test]
fn write_to() {
	let mut body = Body::from(String::from("abcdef"));
	assert_eq!(read_n(&mut body, 2), b"ab");
	let mut sink = Vec::new();
	assert_eq!(body.write_to(&mut sink).unwrap(), 4);
	assert_eq!(sink, b"cdef");
	assert!(body.read(&mut [0; 1]).unwrap_err().is_eos());
}

#[test]
fn std_io() {
	let mut body = Body::from(&b"hello world"[..]);
	assert_eq!(body.seek(SeekFrom::Start(6)).unwrap(), 6);
	let mut text = String::new();
	body.read_to_string(&mut text).unwrap();
	assert_str_eq!(text, "world");
	assert_eq!(body.seek(SeekFrom::End(-5)).unwrap(), 6);
	assert_eq!(body.stream_position().unwrap(), 6);
	assert!(body.seek(SeekFrom::Current(-7)).is_err());
}

#[test]
fn introspection() {
	let body = Body::from("abc");
	assert!(body.can_seek());
	assert!(body.can_read_at());
	assert!(!body.is_closed());
	assert_eq!(body.buffered_range(), None);
	assert!(body.with_source(|_| ()).is_none());
}
