#![forbid(unsafe_code)]
use super::control::*;
use crate::error::ErrorCode;
use suffix_array::SuffixArray;

/// Max length of the reference data.
pub use suffix_array::MAX_LENGTH;

/// Default threshold to determine small exact match.
pub const SMALL_MATCH: usize = 12;

/// Default threshold to determine dismatch.
const DISMATCH_COUNT: usize = 8;

/// Default threshold to enable binary search on suffixing similar bytes.
const LONG_SUFFIX: usize = 256;

/// Raw bsdiff output: native-order control triples plus the delta and extra
/// streams.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Delta {
    pub control: Vec<i32>,
    pub diff: Vec<u8>,
    pub extra: Vec<u8>,
}

/// Computes the delta that rebuilds `current` from `reference`.
///
/// Both inputs must fit the 32-bit control stream, otherwise
/// `ErrorCode::Internal` is returned.
///
/// ```
/// use qbsdiff_async::bsdiff::{compute_diff, SMALL_MATCH};
/// use qbsdiff_async::bspatch::apply_patch;
///
/// let reference = b"hello, world";
/// let current = b"hello, brave new world";
/// let delta = compute_diff(current, reference, SMALL_MATCH).unwrap();
/// let rebuilt = apply_patch(reference, &delta.control, &delta.diff, &delta.extra, current.len());
/// assert_eq!(rebuilt.unwrap(), &current[..]);
/// ```
pub fn compute_diff(current: &[u8], reference: &[u8], small: usize) -> Result<Delta, ErrorCode> {
    let limit = Ord::min(MAX_LENGTH, i32::MAX as usize);
    if reference.len() > limit || current.len() > i32::MAX as usize {
        return Err(ErrorCode::Internal);
    }

    let sa = SuffixArray::new(reference);
    let diff = SaDiff::new(reference, current, &sa, small, DISMATCH_COUNT, LONG_SUFFIX);
    pack(reference, current, diff)
}

/// Lays out controls, delta and extra data from the search results.
fn pack<D>(s: &[u8], t: &[u8], diff: D) -> Result<Delta, ErrorCode>
where
    D: Iterator<Item = Control>,
{
    let mut delta = Delta::default();
    let mut spos = 0usize;
    let mut tpos = 0usize;

    for ctl in diff {
        delta.control.extend_from_slice(&ctl.to_triple()?[..]);

        let add = ctl.add as usize;
        if add > 0 {
            let xs = s.get(spos..spos + add).ok_or(ErrorCode::Internal)?;
            let ys = t.get(tpos..tpos + add).ok_or(ErrorCode::Internal)?;
            delta
                .diff
                .extend(Iterator::zip(xs.iter(), ys.iter()).map(|(x, y)| y.wrapping_sub(*x)));
            spos += add;
            tpos += add;
        }

        let copy = ctl.copy as usize;
        if copy > 0 {
            let zs = t.get(tpos..tpos + copy).ok_or(ErrorCode::Internal)?;
            delta.extra.extend_from_slice(zs);
            tpos += copy;
        }

        let next = spos as i64 + ctl.seek;
        spos = usize::try_from(next).map_err(|_| ErrorCode::Internal)?;
    }

    if tpos != t.len() {
        return Err(ErrorCode::Internal);
    }
    delta.diff.shrink_to_fit();
    delta.extra.shrink_to_fit();
    Ok(delta)
}

/// The delta compression algorithm based on suffix array (a variant of bsdiff 4.x).
struct SaDiff<'s, 't> {
    s: &'s [u8],
    t: &'t [u8],
    sa: &'s SuffixArray<'s>,

    small: usize,
    dismat: usize,
    longsuf: usize,

    i0: usize,
    j0: usize,
    n0: usize,
    b0: usize,
}

impl<'s, 't> SaDiff<'s, 't> {
    /// Creates new search context.
    pub fn new(
        s: &'s [u8],
        t: &'t [u8],
        sa: &'s SuffixArray<'s>,
        small: usize,
        dismat: usize,
        longsuf: usize,
    ) -> Self {
        SaDiff {
            s,
            t,
            sa,
            small,
            dismat: Ord::max(dismat, 1),
            longsuf: Ord::max(longsuf, 64),
            i0: 0,
            j0: 0,
            n0: 0,
            b0: 0,
        }
    }

    #[inline]
    fn previous_state(&self) -> (usize, usize, usize, usize) {
        (self.i0, self.j0, self.n0, self.b0)
    }

    #[inline]
    fn update_state(&mut self, i0: usize, j0: usize, n0: usize, b0: usize) {
        self.i0 = i0;
        self.j0 = j0;
        self.n0 = n0;
        self.b0 = b0;
    }

    /// Searches for the next exact match (i, j, n).
    #[inline]
    fn search_next(&mut self) -> Option<(usize, usize, usize)> {
        // EOF is already scanned.
        if self.j0 == self.t.len() && self.b0 == 0 {
            return None;
        }

        let mut j = self.j0 + self.n0;
        let mut k = j;
        let mut m = 0;
        while j < self.t.len().saturating_sub(self.small) {
            let (i, n) = range_to_extent(self.sa.search_lcp(&self.t[j..]));

            // Count bytes of the candidate that the previous match already
            // covers when extended.
            while k < j + n {
                let i = self.i0.saturating_add(k - self.j0);
                if i < self.s.len() && self.s[i] == self.t[k] {
                    m += 1;
                }
                k += 1;
            }

            if n == 0 {
                j += 1;
                m = 0;
            } else if m == n || n <= self.small {
                j += n;
                m = 0;
            } else if n <= m + self.dismat {
                // Too few dismatches: treat as suffixing similar bytes of the
                // previous match and skip ahead.
                let next = if n <= self.longsuf {
                    j + 1
                } else {
                    let mut x = 0;
                    let mut y = n;
                    while x < y {
                        let z = x + (y - x) / 2;
                        let (iz, nz) = range_to_extent(self.sa.search_lcp(&self.t[j + z..]));
                        if i + n == iz + nz && j + n == j + z + nz {
                            x = z + 1;
                        } else {
                            y = z;
                        }
                    }
                    j + Ord::max(x, 1)
                };
                let mut i = self.i0.saturating_add(j - self.j0);
                while j < next {
                    if i < self.s.len() && self.s[i] == self.t[j] {
                        m -= 1;
                    }
                    i += 1;
                    j += 1;
                }
            } else {
                return Some((i, j, n));
            }
        }

        // EOF should be treated as the last exact match.
        Some((self.s.len(), self.t.len(), 0))
    }

    /// Shrinks the gap region between the previous and current exact match by
    /// determining similar bytes. Returns the lengths (a0, b) of similar bytes.
    #[inline]
    fn shrink_gap(&self, i: usize, j: usize) -> (usize, usize) {
        let gap = &self.t[self.j0 + self.n0..j];
        let suffix = &self.s[Ord::min(self.i0 + self.n0, self.s.len())..];
        let prefix = &self.s[..i];

        let mut a0 = scan_similar(gap.iter(), suffix.iter());
        let mut b = scan_similar(gap.iter().rev(), prefix.iter().rev());

        // Overlapped.
        if a0 + b > gap.len() {
            let n = a0 + b - gap.len();
            let xs = gap[gap.len() - b..a0].iter();
            let ys = suffix[gap.len() - b..a0].iter();
            let zs = prefix[prefix.len() - b..prefix.len() - b + n].iter();

            let i = scan_divide(xs, ys, zs);
            a0 -= n - i;
            b -= i;
        }

        (a0, b)
    }
}

impl<'s, 't> Iterator for SaDiff<'s, 't> {
    type Item = Control;

    fn next(&mut self) -> Option<Self::Item> {
        let (i, j, n) = self.search_next()?;
        let (i0, j0, n0, b0) = self.previous_state();
        let (a0, b) = self.shrink_gap(i, j);

        // reference:
        //     ...(   b0   ,   n0   ,   a0   )...(   b   ,...
        //        ^ spos   ^ i0                ^         ^ i
        //                                     | distance can be negative
        // current:
        //     ...(   b0   ,   n0   ,   a0   ;   copy   )(   b   ,...
        //        ^ tpos   ^ j0              ^ tpos+add          ^ j
        let add = (b0 + n0 + a0) as u64;
        let copy = ((j - b) - (j0 + n0 + a0)) as u64;
        let seek = (i - b).wrapping_sub(i0 + n0 + a0) as isize as i64;

        self.update_state(i, j, n, b);
        Some(Control { add, copy, seek })
    }
}

/// Scans for the data length of the max simailarity.
#[inline]
fn scan_similar<T: Eq, I: Iterator<Item = T>>(xs: I, ys: I) -> usize {
    let mut i = 0;
    let mut matched = 0;
    let mut max_score = 0;

    for (n, eq) in (1..).zip(xs.zip(ys).map(|(x, y)| x == y)) {
        matched += usize::from(eq);
        let dismatched = n - matched;
        let score = matched.wrapping_sub(dismatched) as isize;
        if score > max_score {
            i = n;
            max_score = score;
        }
    }

    i
}

/// Scans for the dividing point of the overlapping.
#[inline]
fn scan_divide<T: Eq, I: Iterator<Item = T>>(xs: I, ys: I, zs: I) -> usize {
    let mut i = 0;
    let mut y_matched = 0;
    let mut z_matched = 0;
    let mut max_score = 0;

    let eqs = xs.zip(ys).zip(zs).map(|((x, y), z)| (x == y, x == z));
    for (n, (y_eq, z_eq)) in (1..).zip(eqs) {
        y_matched += usize::from(y_eq);
        z_matched += usize::from(z_eq);
        let score = y_matched.wrapping_sub(z_matched) as isize;
        if score > max_score {
            i = n;
            max_score = score;
        }
    }

    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs() {
        let delta = compute_diff(b"", b"", SMALL_MATCH).unwrap();
        assert!(delta.control.is_empty());
        assert!(delta.diff.is_empty());
        assert!(delta.extra.is_empty());
    }

    #[test]
    fn empty_reference_is_all_extra() {
        let delta = compute_diff(b"brand new", b"", SMALL_MATCH).unwrap();
        assert_eq!(delta.control, vec![0, 9, 0]);
        assert!(delta.diff.is_empty());
        assert_eq!(&delta.extra[..], b"brand new");
    }

    #[test]
    fn identical_inputs_need_no_extra() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i * 7 % 251) as u8).collect();
        let delta = compute_diff(&data[..], &data[..], SMALL_MATCH).unwrap();
        assert!(delta.extra.is_empty());
        assert_eq!(delta.diff.len(), data.len());
        assert!(delta.diff.iter().all(|&d| d == 0));
        assert_eq!(delta.control.len() % TRIPLE, 0);
    }

    #[test]
    fn scan_similar_prefers_matches() {
        let xs = b"abcdxf";
        let ys = b"abcdef";
        assert_eq!(scan_similar(xs.iter(), ys.iter()), 4);
        assert_eq!(scan_similar(b"xyz".iter(), b"abc".iter()), 0);
    }
}
