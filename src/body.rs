//! One-shot views over the buffered request body.
//!
//! The body can be read once, either as raw bytes through [`BodyStream`] or as decoded
//! text through [`BodyReader`]. [`BodyState`] records which view was handed out so a
//! second request for either view can be refused.

use std::{
  fmt,
  io::{self, BufRead, Cursor, Read},
};

use bytes::{Buf, Bytes, buf::Reader};

use crate::{charset::Charset, error::RequestError};

/// The accessor that consumed the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyAccess {
  InputStream,
  Reader,
}

impl fmt::Display for BodyAccess {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BodyAccess::InputStream => f.write_str("input_stream()"),
      BodyAccess::Reader => f.write_str("reader()"),
    }
  }
}

/// Consumption state of the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyState {
  #[default]
  Unread,
  Consumed(BodyAccess),
}

impl BodyState {
  /// Moves from `Unread` to `Consumed(access)`.
  ///
  /// # Errors
  ///
  /// [`RequestError::BodyConsumed`] naming the first accessor if the body was already
  /// handed out; the state is left unchanged.
  pub fn consume(&mut self, access: BodyAccess) -> Result<(), RequestError> {
    match *self {
      BodyState::Unread => {
        *self = BodyState::Consumed(access);
        Ok(())
      }
      BodyState::Consumed(first) => {
        tracing::warn!(%first, attempted = %access, "request body reopened");
        Err(RequestError::BodyConsumed { first })
      }
    }
  }

  pub fn is_consumed(&self) -> bool {
    matches!(self, BodyState::Consumed(_))
  }
}

/// Raw byte view of the request body.
pub struct BodyStream {
  inner: Reader<Bytes>,
}

impl BodyStream {
  pub(crate) fn new(body: Bytes) -> Self {
    Self {
      inner: body.reader(),
    }
  }

  /// Bytes not read yet.
  pub fn remaining(&self) -> usize {
    self.inner.get_ref().remaining()
  }

  /// The unread part of the body.
  pub fn into_bytes(self) -> Bytes {
    self.inner.into_inner()
  }
}

impl Read for BodyStream {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    self.inner.read(buf)
  }
}

impl BufRead for BodyStream {
  fn fill_buf(&mut self) -> io::Result<&[u8]> {
    self.inner.fill_buf()
  }

  fn consume(&mut self, amt: usize) {
    self.inner.consume(amt)
  }
}

impl fmt::Debug for BodyStream {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BodyStream")
      .field("remaining", &self.remaining())
      .finish()
  }
}

/// Decoded text view of the request body.
///
/// Malformed sequences are replaced with U+FFFD.
#[derive(Debug)]
pub struct BodyReader {
  inner: Cursor<String>,
  charset: Charset,
}

impl BodyReader {
  pub(crate) fn new(body: &[u8], charset: Charset) -> Self {
    Self {
      inner: Cursor::new(charset.decode(body).into_owned()),
      charset,
    }
  }

  /// Encoding the body was decoded with.
  pub fn charset(&self) -> Charset {
    self.charset
  }

  /// The unread part of the text.
  ///
  /// A character only partly read through [`Read`] is dropped along with the bytes
  /// already handed out.
  pub fn into_string(self) -> String {
    let pos = usize::try_from(self.inner.position()).unwrap_or(usize::MAX);
    let mut text = self.inner.into_inner();
    let mut start = pos.min(text.len());
    while !text.is_char_boundary(start) {
      start += 1;
    }
    text.drain(..start);
    text
  }
}

impl Read for BodyReader {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    self.inner.read(buf)
  }
}

impl BufRead for BodyReader {
  fn fill_buf(&mut self) -> io::Result<&[u8]> {
    self.inner.fill_buf()
  }

  fn consume(&mut self, amt: usize) {
    self.inner.consume(amt)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn state_transitions_once() {
    let mut state = BodyState::default();
    assert!(!state.is_consumed());

    state.consume(BodyAccess::Reader).unwrap();
    assert_eq!(state, BodyState::Consumed(BodyAccess::Reader));

    for access in [BodyAccess::Reader, BodyAccess::InputStream] {
      let err = state.consume(access).unwrap_err();
      assert!(matches!(
        err,
        RequestError::BodyConsumed {
          first: BodyAccess::Reader
        }
      ));
    }
    assert_eq!(state, BodyState::Consumed(BodyAccess::Reader));
  }

  #[test]
  fn stream_reads_bytes() {
    let mut stream = BodyStream::new(Bytes::from_static(b"hello world"));
    let mut head = [0u8; 5];
    stream.read_exact(&mut head).unwrap();
    assert_eq!(&head, b"hello");
    assert_eq!(stream.remaining(), 6);
    assert_eq!(stream.into_bytes(), Bytes::from_static(b" world"));
  }

  #[test]
  fn reader_decodes_lines() {
    let reader = BodyReader::new(b"caf\xe9\nna\xefve", Charset::Latin1);
    assert_eq!(reader.charset(), Charset::Latin1);
    let lines: Vec<String> = reader.lines().map(Result::unwrap).collect();
    assert_eq!(lines, ["café", "naïve"]);
  }

  #[test]
  fn reader_into_string_skips_consumed_text() {
    let mut reader = BodyReader::new("first\nsecond".as_bytes(), Charset::Utf8);
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    assert_eq!(line, "first\n");
    assert_eq!(reader.into_string(), "second");
  }

  #[test]
  fn reader_into_string_after_partial_character() {
    let mut reader = BodyReader::new("éa".as_bytes(), Charset::Utf8);
    let mut first = [0u8; 1];
    reader.read_exact(&mut first).unwrap();
    assert_eq!(first, [0xC3]);
    assert_eq!(reader.into_string(), "a");

    let mut reader = BodyReader::new("日本".as_bytes(), Charset::Utf8);
    let mut head = [0u8; 2];
    reader.read_exact(&mut head).unwrap();
    assert_eq!(reader.into_string(), "本");
  }
}
