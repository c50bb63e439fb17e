//! Fixed-capacity text accumulator backed by an inline byte buffer.
//!
//! ## Architecture
//!
//! ```text
//!   TextBuilder<8>
//!   ┌───┬───┬───┬───┬───┬───┬───┬───┐
//!   │ a │ b │ c │ d │ ? │ ? │ ? │ ? │     len = 4, remaining = 4
//!   └───┴───┴───┴───┴───┴───┴───┴───┘
//!     committed prefix  │ scratch
//! ```
//!
//! Writes land after the committed prefix and only advance `len` once the
//! whole write fits. A failed write may scribble on the scratch region but
//! never on the committed prefix, so the builder stays valid and reusable.
//!
//! ## Example Usage
//!
//! ```
//! use derivekit::ds::TextBuilder;
//!
//! let mut text = TextBuilder::<5>::new();
//! text.append_str("abc").unwrap();
//! text.append_str("de").unwrap();
//! assert_eq!(text.as_str(), "abcde");
//! assert_eq!(text.remaining_capacity(), 0);
//! assert!(text.append_str("f").is_err());
//! assert_eq!(text.as_str(), "abcde");
//! ```
//!
//! ## Thread Safety
//!
//! Plain value type; no shared state.

use std::fmt;

use crate::error::BufferExhausted;

/// Default capacity in bytes for [`StackText`].
pub const DEFAULT_TEXT_CAPACITY: usize = 360;

/// Text builder with the default capacity.
pub type StackText = TextBuilder<DEFAULT_TEXT_CAPACITY>;

/// Bounded UTF-8 text accumulator with no growth path.
///
/// Capacity is measured in bytes. Exhaustion is a caller error reported as
/// [`BufferExhausted`]; there is no reallocation.
#[derive(Clone)]
pub struct TextBuilder<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> TextBuilder<N> {
    /// Creates an empty builder.
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            len: 0,
        }
    }

    /// Total capacity in bytes.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of committed bytes.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if nothing has been written.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Free bytes left in the buffer.
    #[inline]
    pub const fn remaining_capacity(&self) -> usize {
        N - self.len
    }

    /// Appends a string slice.
    pub fn append_str(&mut self, value: &str) -> Result<(), BufferExhausted> {
        let bytes = value.as_bytes();
        if bytes.len() > self.remaining_capacity() {
            return Err(self.exhausted());
        }
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }

    /// Appends a single character (1 to 4 bytes).
    pub fn append_char(&mut self, value: char) -> Result<(), BufferExhausted> {
        let mut encoded = [0u8; 4];
        self.append_str(value.encode_utf8(&mut encoded))
    }

    /// Appends the `Display` rendering of `value` without allocating.
    ///
    /// Either the full rendering is committed or nothing is.
    pub fn append_fmt<T: fmt::Display + ?Sized>(&mut self, value: &T) -> Result<(), BufferExhausted> {
        let mut cursor = Cursor {
            buf: &mut self.buf[self.len..],
            written: 0,
        };
        if fmt::write(&mut cursor, format_args!("{value}")).is_err() {
            return Err(self.exhausted());
        }
        self.len += cursor.written;
        Ok(())
    }

    /// Returns the committed prefix.
    pub fn as_str(&self) -> &str {
        // SAFETY: only whole `&str` slices are ever committed, so
        // `buf[..len]` is always valid UTF-8.
        unsafe { std::str::from_utf8_unchecked(&self.buf[..self.len]) }
    }

    /// Discards all committed text.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    fn exhausted(&self) -> BufferExhausted {
        BufferExhausted {
            remaining: self.remaining_capacity(),
        }
    }
}

/// Writer over the uncommitted tail of a builder.
struct Cursor<'a> {
    buf: &'a mut [u8],
    written: usize,
}

impl fmt::Write for Cursor<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let end = self.written + bytes.len();
        if end > self.buf.len() {
            return Err(fmt::Error);
        }
        self.buf[self.written..end].copy_from_slice(bytes);
        self.written = end;
        Ok(())
    }
}

impl<const N: usize> fmt::Write for TextBuilder<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append_str(s).map_err(|_| fmt::Error)
    }

    fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        self.append_fmt(&args).map_err(|_| fmt::Error)
    }
}

impl<const N: usize> Default for TextBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> AsRef<str> for TextBuilder<N> {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl<const N: usize> fmt::Display for TextBuilder<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<const N: usize> fmt::Debug for TextBuilder<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextBuilder")
            .field("text", &self.as_str())
            .field("capacity", &N)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Write;

    use super::*;

    #[test]
    fn fills_exactly_then_rejects() {
        let mut text = TextBuilder::<5>::new();
        text.append_str("abc").unwrap();
        text.append_str("de").unwrap();
        assert_eq!(text.as_str(), "abcde");
        assert_eq!(text.remaining_capacity(), 0);

        assert_eq!(
            text.append_str("f"),
            Err(BufferExhausted { remaining: 0 })
        );
        assert_eq!(text.to_string(), "abcde");
    }

    #[test]
    fn exhausted_builder_accepts_empty_append() {
        let mut text = TextBuilder::<3>::new();
        text.append_str("xyz").unwrap();
        assert!(text.append_str("").is_ok());
        assert!(text.append_fmt("").is_ok());
        assert_eq!(text.as_str(), "xyz");
    }

    #[test]
    fn exhausted_builder_rejects_every_kind_of_append() {
        let mut text = TextBuilder::<4>::new();
        text.append_str("full").unwrap();
        assert!(text.append_str("foo").is_err());
        assert!(text.append_char('p').is_err());
        assert!(text.append_fmt(&90).is_err());
        assert_eq!(text.as_str(), "full");
    }

    #[test]
    fn mixed_appends_track_remaining_capacity() {
        let mut text = StackText::new();
        let mut remaining = text.remaining_capacity();

        text.append_fmt(&90).unwrap();
        remaining -= 2;
        assert_eq!(text.remaining_capacity(), remaining);

        text.append_str("foo").unwrap();
        remaining -= 3;
        assert_eq!(text.remaining_capacity(), remaining);

        text.append_char('#').unwrap();
        remaining -= 1;
        assert_eq!(text.remaining_capacity(), remaining);

        text.append_fmt(&format_args!("{:04}-{:02}-{:02}", 1970, 1, 1))
            .unwrap();
        remaining -= "1970-01-01".len();
        assert_eq!(text.remaining_capacity(), remaining);

        assert_eq!(text.as_str(), "90foo#1970-01-01");
    }

    #[test]
    fn partial_format_leaves_prefix_intact() {
        let mut text = TextBuilder::<6>::new();
        text.append_str("ab").unwrap();
        // "12345" fits only partially.
        assert_eq!(
            text.append_fmt(&12345),
            Err(BufferExhausted { remaining: 4 })
        );
        assert_eq!(text.as_str(), "ab");
        text.append_fmt(&1234).unwrap();
        assert_eq!(text.as_str(), "ab1234");
    }

    #[test]
    fn multibyte_char_needs_room_for_all_bytes() {
        let mut text = TextBuilder::<2>::new();
        assert!(text.append_char('€').is_err());
        assert!(text.is_empty());
        text.append_char('é').unwrap();
        assert_eq!(text.len(), 2);
    }

    #[test]
    fn fmt_write_and_clear() {
        let mut text = TextBuilder::<16>::default();
        write!(text, "{}-{}", "a", 1).unwrap();
        assert_eq!(text.as_ref(), "a-1");
        assert!(write!(text, "{:>20}", "x").is_err());
        assert_eq!(text.as_str(), "a-1");
        text.clear();
        assert!(text.is_empty());
        assert_eq!(text.remaining_capacity(), text.capacity());
    }
}
