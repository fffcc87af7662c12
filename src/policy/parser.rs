// Copyright 2023 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fmt::Debug;
use std::io::{Cursor, Seek as _, SeekFrom};
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

/// Trait for a cursor that can emit a slice of "remaining" data, and advance forward.
trait ParseCursor: Sized {
    /// The error returned when seeking forward fails on this cursor.
    type Error;

    /// Returns a slice of remaining data.
    fn remaining_slice(&self) -> &[u8];

    /// Returns the number of bytes remaining to be parsed by this [`ParseCursor`].
    fn len(&self) -> usize;

    /// Seeks forward by `num_bytes`, returning a `Self::Error` if seeking fails.
    fn seek_forward(&mut self, num_bytes: usize) -> Result<(), Self::Error>;
}

impl<T: AsRef<[u8]>> ParseCursor for Cursor<T> {
    type Error = std::io::Error;

    fn remaining_slice(&self) -> &[u8] {
        let s: &[u8] = self.get_ref().as_ref();
        let p = (self.position() as usize).min(s.len());
        &s[p..]
    }

    fn len(&self) -> usize {
        self.remaining_slice().len()
    }

    fn seek_forward(&mut self, num_bytes: usize) -> Result<(), Self::Error> {
        self.seek(SeekFrom::Current(num_bytes as i64)).map(|_| ())
    }
}

/// Parses fixed-layout values out of a compiled policy image by copying them out of the
/// underlying data.
///
/// Each parse consumes `self` and, on success, returns the parsed value together with a parser
/// positioned after it, so a sequence of fields reads as:
///
/// ```rust,ignore
/// let (magic, tail) = ByValue::new(bytes).parse::<Magic>()?;
/// let (version, tail) = tail.parse::<PolicyVersion>()?;
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ByValue<T: AsRef<[u8]>>(Cursor<T>);

impl<T: AsRef<[u8]>> ByValue<T> {
    /// Returns a new [`ByValue`] that wraps `data` in a [`Cursor`] for parsing.
    pub fn new(data: T) -> Self {
        Self(Cursor::new(data))
    }

    /// Returns a `P` parsed from the next bytes of the underlying data, or `None` if too few
    /// bytes remain.
    pub fn parse<P: Clone + Debug + FromBytes + KnownLayout + Immutable + Unaligned>(
        mut self,
    ) -> Option<(P, Self)> {
        let (output, _) = P::read_from_prefix(self.0.remaining_slice()).ok()?;
        if self.0.seek_forward(std::mem::size_of_val(&output)).is_err() {
            return None;
        }
        Some((output, self))
    }

    /// Returns a `Vec<PS>` of `count` items parsed from the next bytes of the underlying data,
    /// or `None` if too few bytes remain.
    pub fn parse_slice<PS: Clone + Debug + FromBytes + Immutable + Unaligned>(
        mut self,
        count: usize,
    ) -> Option<(Vec<PS>, Self)> {
        let (slice, _) =
            <[PS]>::ref_from_prefix_with_elems(self.0.remaining_slice(), count).ok()?;
        let size = std::mem::size_of_val(slice);
        let slice = slice.to_vec();
        if self.0.seek_forward(size).is_err() {
            return None;
        }
        Some((slice, self))
    }

    /// Returns the number of bytes remaining to be parsed.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::little_endian as le;

    #[derive(Clone, Debug, KnownLayout, FromBytes, Immutable, PartialEq, Unaligned)]
    #[repr(C, packed)]
    struct SomeNumbers {
        a: u8,
        b: le::U32,
        c: le::U16,
        d: u8,
    }

    #[test]
    fn by_value_parses_struct_and_advances() {
        let bytes: Vec<u8> = (0..8).collect();
        let (some_numbers, parser) =
            ByValue::new(bytes.as_slice()).parse::<SomeNumbers>().expect("some numbers");
        assert_eq!(0, some_numbers.a);
        assert_eq!(7, some_numbers.d);
        assert!(parser.is_empty());
    }

    #[test]
    fn by_value_parse_slice() {
        let bytes: Vec<u8> = (0..24).collect();
        let (some_numbers, parser) = ByValue::new(bytes.as_slice())
            .parse_slice::<SomeNumbers>(3)
            .expect("some numbers");
        assert_eq!(3, some_numbers.len());
        assert_eq!(8, some_numbers[1].a);
        assert_eq!(23, some_numbers[2].d);
        assert_eq!(0, parser.len());
    }

    #[test]
    fn by_value_short_input() {
        let bytes: Vec<u8> = (0..7).collect();
        assert!(ByValue::new(bytes.as_slice()).parse::<SomeNumbers>().is_none());
        assert!(ByValue::new(bytes.as_slice()).parse_slice::<u8>(8).is_none());
    }
}
