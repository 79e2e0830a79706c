#![warn(missing_docs)]
//! Bracketing search over the sorted radii of a nested mirror assembly.
//!
//! The channel walls of an assembly are sorted by radius. Locating the gap a particle travels in reduces the number of
//! mirrors which have to be checked for an intersection from all mirrors to the two walls of that gap.
//!
//! ```rust
//! use nmo_tracer::collision::{bracket, Bracket};
//!
//! let boundaries = [0.1, 0.2, 0.3];
//! assert_eq!(bracket(&boundaries, 0.15), Bracket::Channel(0));
//! assert_eq!(bracket(&boundaries, 0.2), Bracket::Channel(1));
//! assert_eq!(bracket(&boundaries, 0.3), Bracket::Channel(2));
//! assert_eq!(bracket(&boundaries, 0.35), Bracket::Miss);
//! ```

/// Result of a [`bracket`] search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bracket {
    /// The value lies in the gap `i`, i.e. `b[i] <= r < b[i+1]` (or `r == b[n-1]` for the topmost index).
    Channel(usize),
    /// The value lies outside the table (or is `NaN`, or the table is empty).
    Miss,
}

/// Locate `r` in the ascending boundary table using `O(log n)` comparisons.
///
/// Returns [`Bracket::Channel`] `i` with `boundaries[i] <= r < boundaries[i+1]`. A value exactly on the topmost boundary
/// belongs to the last index (closed top). All other values outside the table are a [`Bracket::Miss`].
#[must_use]
pub fn bracket(boundaries: &[f64], r: f64) -> Bracket {
    bracket_by(boundaries.len(), r, |i| boundaries[i])
}

/// Same as [`bracket`] but with lazily evaluated boundaries `boundary(i)` for `i < n`.
///
/// The boundaries must be ascending in `i`.
#[must_use]
pub fn bracket_by<F: Fn(usize) -> f64>(n: usize, r: f64, boundary: F) -> Bracket {
    if n == 0 || r.is_nan() {
        return Bracket::Miss;
    }
    let last = boundary(n - 1);
    #[allow(clippy::float_cmp)]
    if r == last {
        return Bracket::Channel(n - 1);
    }
    if r < boundary(0) || r > last {
        return Bracket::Miss;
    }
    // number of boundaries <= r; at least one since r >= b[0]
    let below = partition_point(n, |i| boundary(i) <= r);
    if below >= n {
        Bracket::Miss
    } else {
        Bracket::Channel(below - 1)
    }
}

/// Reference implementation of [`bracket`] by a linear scan.
#[must_use]
pub fn bracket_linear(boundaries: &[f64], r: f64) -> Bracket {
    let n = boundaries.len();
    if n == 0 || r.is_nan() {
        return Bracket::Miss;
    }
    #[allow(clippy::float_cmp)]
    if r == boundaries[n - 1] {
        return Bracket::Channel(n - 1);
    }
    boundaries
        .windows(2)
        .position(|w| w[0] <= r && r < w[1])
        .map_or(Bracket::Miss, Bracket::Channel)
}

/// Index of the first `i < n` for which `pred(i)` is false, assuming `pred` is monotonically true-then-false.
fn partition_point<P: Fn(usize) -> bool>(n: usize, pred: P) -> usize {
    let (mut lo, mut hi) = (0, n);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty() {
        assert_eq!(bracket(&[], 1.0), Bracket::Miss);
        assert_eq!(bracket_linear(&[], 1.0), Bracket::Miss);
    }
    #[test]
    fn single() {
        let b = [0.5];
        assert_eq!(bracket(&b, 0.5), Bracket::Channel(0));
        assert_eq!(bracket(&b, 0.4), Bracket::Miss);
        assert_eq!(bracket(&b, 0.6), Bracket::Miss);
    }
    #[test]
    fn boundaries() {
        let b = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(bracket(&b, 1.0), Bracket::Channel(0));
        assert_eq!(bracket(&b, 1.5), Bracket::Channel(0));
        assert_eq!(bracket(&b, 2.0), Bracket::Channel(1));
        assert_eq!(bracket(&b, 3.999), Bracket::Channel(2));
        assert_eq!(bracket(&b, 4.0), Bracket::Channel(3));
        assert_eq!(bracket(&b, 0.999), Bracket::Miss);
        assert_eq!(bracket(&b, 4.001), Bracket::Miss);
        assert_eq!(bracket(&b, f64::NAN), Bracket::Miss);
        assert_eq!(bracket(&b, f64::NEG_INFINITY), Bracket::Miss);
        assert_eq!(bracket(&b, f64::INFINITY), Bracket::Miss);
    }
    #[test]
    fn lazy() {
        let b = [0.1, 0.2, 0.4, 0.8];
        for r in [0.05, 0.1, 0.15, 0.2, 0.3, 0.4, 0.5, 0.8, 0.9] {
            assert_eq!(bracket_by(b.len(), r, |i| b[i]), bracket(&b, r));
        }
    }
    #[test]
    fn matches_linear() {
        let b: Vec<f64> = (0..37).map(|i| f64::from(i).mul_add(0.25, 0.1)).collect();
        for k in -10..160 {
            let r = f64::from(k) * 0.0625;
            assert_eq!(bracket(&b, r), bracket_linear(&b, r), "r={r}");
        }
    }
    #[test]
    fn partition() {
        assert_eq!(partition_point(0, |_| true), 0);
        assert_eq!(partition_point(5, |i| i < 3), 3);
        assert_eq!(partition_point(5, |_| true), 5);
    }
}
