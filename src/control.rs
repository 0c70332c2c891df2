#![forbid(unsafe_code)]
//! Control stream: `(add, copy, seek)` triples of signed 32-bit integers.
//!
//! The stream is held in native order while computing and crosses the
//! caller boundary in canonical (big-endian) order.

use crate::error::ErrorCode;
use byteorder::{ByteOrder, NativeEndian};
use bytes::Bytes;
use std::ops::Range;

/// Integers per control instruction.
pub const TRIPLE: usize = 3;

/// Bytes per control integer.
pub const INT_SIZE: usize = 4;

/// Single bsdiff control instruction.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Control {
    pub add: u64,
    pub copy: u64,
    pub seek: i64,
}

impl Control {
    /// Narrows to a 32-bit triple.
    pub fn to_triple(self) -> Result<[i32; TRIPLE], ErrorCode> {
        let add = i32::try_from(self.add).map_err(|_| ErrorCode::Internal)?;
        let copy = i32::try_from(self.copy).map_err(|_| ErrorCode::Internal)?;
        let seek = i32::try_from(self.seek).map_err(|_| ErrorCode::Internal)?;
        Ok([add, copy, seek])
    }

    /// Reads a 32-bit triple; negative lengths are corrupt.
    pub fn from_triple(triple: &[i32]) -> Result<Self, ErrorCode> {
        match *triple {
            [add, copy, seek] if add >= 0 && copy >= 0 => Ok(Control {
                add: add as u64,
                copy: copy as u64,
                seek: seek as i64,
            }),
            _ => Err(ErrorCode::CorruptData),
        }
    }
}

/// Converts native-order integers to canonical order in place.
///
/// Identity on big-endian hosts, a byte swap of every element otherwise.
#[inline]
pub fn to_canonical(control: &mut [i32]) {
    for x in control.iter_mut() {
        *x = x.to_be();
    }
}

/// Converts canonical-order integers back to native order in place.
#[inline]
pub fn from_canonical(control: &mut [i32]) {
    for x in control.iter_mut() {
        *x = i32::from_be(*x);
    }
}

/// Serializes a native-order control stream into canonical bytes.
pub fn encode(mut control: Vec<i32>) -> Bytes {
    to_canonical(&mut control[..]);
    let mut buf = vec![0; control.len() * INT_SIZE];
    NativeEndian::write_i32_into(&control[..], &mut buf[..]);
    Bytes::from(buf)
}

/// Deserializes canonical bytes into a native-order control stream.
///
/// The byte length must be a multiple of 4.
pub fn decode(bytes: &[u8]) -> Result<Vec<i32>, ErrorCode> {
    if bytes.len() % INT_SIZE != 0 {
        return Err(ErrorCode::CorruptData);
    }
    let mut control = vec![0; bytes.len() / INT_SIZE];
    NativeEndian::read_i32_into(bytes, &mut control[..]);
    from_canonical(&mut control[..]);
    Ok(control)
}

/// Converts Range<usize> to extent (i, n).
#[inline]
pub fn range_to_extent(range: Range<usize>) -> (usize, usize) {
    let Range { start, end } = range;
    (start, end.saturating_sub(start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::BE;
    use quickcheck_macros::quickcheck;

    #[test]
    fn canonical_empty_and_single() {
        let mut empty: Vec<i32> = Vec::new();
        to_canonical(&mut empty[..]);
        from_canonical(&mut empty[..]);
        assert!(empty.is_empty());

        let mut one = vec![0x0102_0304];
        to_canonical(&mut one[..]);
        assert_eq!(one[0].to_ne_bytes(), [1, 2, 3, 4]);
        from_canonical(&mut one[..]);
        assert_eq!(one, vec![0x0102_0304]);
    }

    #[test]
    fn encode_is_big_endian() {
        let bytes = encode(vec![1, -1, 0x7f00_0010]);
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[..4], &[0, 0, 0, 1]);
        assert_eq!(&bytes[4..8], &[0xff, 0xff, 0xff, 0xff]);
        assert_eq!(BE::read_i32(&bytes[8..]), 0x7f00_0010);
        assert_eq!(decode(&bytes[..]).unwrap(), vec![1, -1, 0x7f00_0010]);
    }

    #[test]
    fn decode_rejects_partial_integer() {
        assert_eq!(decode(&[0, 0, 0]), Err(ErrorCode::CorruptData));
        assert_eq!(decode(&[]), Ok(Vec::new()));
    }

    #[test]
    fn triples() {
        let ctl = Control::from_triple(&[3, 4, -5]).unwrap();
        assert_eq!(ctl, Control { add: 3, copy: 4, seek: -5 });
        assert_eq!(ctl.to_triple(), Ok([3, 4, -5]));
        assert_eq!(Control::from_triple(&[-1, 0, 0]), Err(ErrorCode::CorruptData));
        assert_eq!(Control::from_triple(&[0, -1, 0]), Err(ErrorCode::CorruptData));

        let wide = Control { add: 1 << 31, copy: 0, seek: 0 };
        assert_eq!(wide.to_triple(), Err(ErrorCode::Internal));
    }

    #[quickcheck]
    fn canonical_idempotent(xs: Vec<i32>) -> bool {
        let mut ys = xs.clone();
        to_canonical(&mut ys[..]);
        from_canonical(&mut ys[..]);
        xs == ys
    }

    #[quickcheck]
    fn encode_decode(xs: Vec<i32>) -> bool {
        let bytes = encode(xs.clone());
        let mut expected = vec![0; xs.len() * 4];
        BE::write_i32_into(&xs[..], &mut expected[..]);
        bytes[..] == expected[..] && decode(&bytes[..]) == Ok(xs)
    }
}
