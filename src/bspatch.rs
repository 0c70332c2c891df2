#![forbid(unsafe_code)]
use super::control::*;
use crate::error::ErrorCode;

/// Rebuilds the current data from `reference` and a native-order control
/// stream with its delta and extra streams.
///
/// Every segment must lie within its stream and the result must be exactly
/// `output_length` bytes long, otherwise `ErrorCode::CorruptData` is returned.
pub fn apply_patch(
    reference: &[u8],
    control: &[i32],
    diff: &[u8],
    extra: &[u8],
    output_length: usize,
) -> Result<Vec<u8>, ErrorCode> {
    if control.len() % TRIPLE != 0 {
        return Err(ErrorCode::CorruptData);
    }
    // Each output byte consumes one byte of either the delta or extra stream.
    if output_length > diff.len().saturating_add(extra.len()) {
        return Err(ErrorCode::CorruptData);
    }

    let mut ctx = Context::new(reference, diff, extra, output_length)?;
    for triple in control.chunks_exact(TRIPLE) {
        let Control { add, copy, seek } = Control::from_triple(triple)?;
        ctx.add(add)?;
        ctx.copy(copy)?;
        ctx.seek(seek)?;
    }
    ctx.finish()
}

/// Bspatch context.
struct Context<'s, 'p> {
    source: &'s [u8],
    spos: i64,

    delta: &'p [u8],
    extra: &'p [u8],

    target: Vec<u8>,
    limit: usize,
}

impl<'s, 'p> Context<'s, 'p> {
    /// Create context, with the target allocated up front.
    pub fn new(
        source: &'s [u8],
        delta: &'p [u8],
        extra: &'p [u8],
        limit: usize,
    ) -> Result<Self, ErrorCode> {
        let mut target = Vec::new();
        target
            .try_reserve_exact(limit)
            .map_err(|_| ErrorCode::Internal)?;
        Ok(Context {
            source,
            spos: 0,
            delta,
            extra,
            target,
            limit,
        })
    }

    /// Add delta to source and write the result to target.
    fn add(&mut self, count: u64) -> Result<(), ErrorCode> {
        let n = self.reserve(count)?;
        if n == 0 {
            return Ok(());
        }

        let start = usize::try_from(self.spos).map_err(|_| ErrorCode::CorruptData)?;
        let xs = self
            .source
            .get(start..start.saturating_add(n))
            .ok_or(ErrorCode::CorruptData)?;
        let ds = take(&mut self.delta, n)?;

        self.target
            .extend(Iterator::zip(xs.iter(), ds.iter()).map(|(x, d)| x.wrapping_add(*d)));
        self.spos += n as i64;
        Ok(())
    }

    /// Copy extra data to target.
    fn copy(&mut self, count: u64) -> Result<(), ErrorCode> {
        let n = self.reserve(count)?;
        let zs = take(&mut self.extra, n)?;
        self.target.extend_from_slice(zs);
        Ok(())
    }

    /// Move the cursor on source.
    fn seek(&mut self, offset: i64) -> Result<(), ErrorCode> {
        self.spos = self.spos.checked_add(offset).ok_or(ErrorCode::CorruptData)?;
        Ok(())
    }

    /// Checks that `count` more bytes still fit into the declared output.
    fn reserve(&self, count: u64) -> Result<usize, ErrorCode> {
        let n = usize::try_from(count).map_err(|_| ErrorCode::CorruptData)?;
        if n > self.limit - self.target.len() {
            return Err(ErrorCode::CorruptData);
        }
        Ok(n)
    }

    /// Check the output was filled exactly.
    fn finish(self) -> Result<Vec<u8>, ErrorCode> {
        if self.target.len() != self.limit {
            return Err(ErrorCode::CorruptData);
        }
        Ok(self.target)
    }
}

/// Split `n` bytes off the front of a stream.
#[inline]
fn take<'p>(stream: &mut &'p [u8], n: usize) -> Result<&'p [u8], ErrorCode> {
    if n > stream.len() {
        return Err(ErrorCode::CorruptData);
    }
    let (head, tail) = stream.split_at(n);
    *stream = tail;
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_patch() {
        assert_eq!(apply_patch(b"", &[], b"", b"", 0), Ok(Vec::new()));
        assert_eq!(apply_patch(b"anything", &[], b"", b"", 0), Ok(Vec::new()));
    }

    #[test]
    fn add_copy_seek() {
        // "abcdef" -> "abXYef": add 2, copy 2 ("XY"), seek 2, add 2.
        let control = [2, 2, 2, 2, 0, 0];
        let diff = [0, 0, 0, 0];
        let out = apply_patch(b"abcdef", &control, &diff, b"XY", 6).unwrap();
        assert_eq!(&out[..], b"abXYef");
    }

    #[test]
    fn delta_is_added_with_wrapping() {
        let out = apply_patch(&[250, 1], &[2, 0, 0], &[10, 255], b"", 2).unwrap();
        assert_eq!(out, vec![4, 0]);
    }

    #[test]
    fn segment_beyond_streams_is_corrupt() {
        // diff stream too short
        assert_eq!(
            apply_patch(b"abcd", &[4, 0, 0], &[0, 0], b"", 4),
            Err(ErrorCode::CorruptData)
        );
        // extra stream too short
        assert_eq!(
            apply_patch(b"", &[0, 3, 0], b"", b"ab", 3),
            Err(ErrorCode::CorruptData)
        );
        // reference too short
        assert_eq!(
            apply_patch(b"ab", &[3, 0, 0], &[0, 0, 0], b"", 3),
            Err(ErrorCode::CorruptData)
        );
        // negative reference position
        assert_eq!(
            apply_patch(b"ab", &[0, 0, -1, 1, 0, 0], &[0], b"", 1),
            Err(ErrorCode::CorruptData)
        );
    }

    #[test]
    fn output_length_is_enforced() {
        assert_eq!(
            apply_patch(b"", &[0, 3, 0], b"", b"abc", 2),
            Err(ErrorCode::CorruptData)
        );
        assert_eq!(
            apply_patch(b"", &[0, 3, 0], b"", b"abc", 4),
            Err(ErrorCode::CorruptData)
        );
    }

    #[test]
    fn output_length_beyond_streams_is_corrupt() {
        assert_eq!(
            apply_patch(b"", &[0, 0, 0], b"", b"", u32::MAX as usize),
            Err(ErrorCode::CorruptData)
        );
        assert_eq!(
            apply_patch(b"abc", &[2, 1, 0], &[0, 0], b"x", 4),
            Err(ErrorCode::CorruptData)
        );
        assert_eq!(
            apply_patch(b"abc", &[2, 1, 0], &[0, 0], b"x", 3),
            Ok(b"abx".to_vec())
        );
    }

    #[test]
    fn malformed_controls_are_corrupt() {
        assert_eq!(apply_patch(b"", &[0, 0], b"", b"", 0), Err(ErrorCode::CorruptData));
        assert_eq!(
            apply_patch(b"", &[-1, 0, 0], b"", b"", 0),
            Err(ErrorCode::CorruptData)
        );
    }
}
