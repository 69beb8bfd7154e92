//! Core geometry and scalar types shared across the pipeline.
//!
//! Structured data is addressed by [`Extent`]s: inclusive index ranges
//! `[x_min, x_max, y_min, y_max, z_min, z_max]`. An extent with any
//! `min > max` on an axis is empty and covers no points.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive index range over a 3D structured grid.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent(pub [i64; 6]);

impl Extent {
    /// Canonical empty extent.
    pub const EMPTY: Extent = Extent([0, -1, 0, -1, 0, -1]);

    pub const fn new(x0: i64, x1: i64, y0: i64, y1: i64, z0: i64, z1: i64) -> Self {
        Self([x0, x1, y0, y1, z0, z1])
    }

    /// Inclusive `(min, max)` of one axis (0 = x, 1 = y, 2 = z).
    #[inline]
    pub fn axis(&self, axis: usize) -> (i64, i64) {
        (self.0[2 * axis], self.0[2 * axis + 1])
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|a| {
            let (lo, hi) = self.axis(a);
            lo > hi
        })
    }

    /// Number of points along each axis.
    pub fn dimensions(&self) -> [usize; 3] {
        if self.is_empty() {
            return [0; 3];
        }
        let mut dims = [0usize; 3];
        for (a, dim) in dims.iter_mut().enumerate() {
            let (lo, hi) = self.axis(a);
            *dim = (hi - lo + 1) as usize;
        }
        dims
    }

    pub fn num_points(&self) -> usize {
        self.dimensions().iter().product()
    }

    /// Whether `other` lies entirely inside `self`. The empty extent is
    /// contained in everything.
    pub fn contains(&self, other: &Extent) -> bool {
        if other.is_empty() {
            return true;
        }
        if self.is_empty() {
            return false;
        }
        (0..3).all(|a| {
            let (lo, hi) = self.axis(a);
            let (olo, ohi) = other.axis(a);
            olo >= lo && ohi <= hi
        })
    }

    /// Overlap of two extents, [`Extent::EMPTY`] when they are disjoint.
    pub fn intersect(&self, other: &Extent) -> Extent {
        let mut out = [0i64; 6];
        for a in 0..3 {
            let (lo, hi) = self.axis(a);
            let (olo, ohi) = other.axis(a);
            out[2 * a] = lo.max(olo);
            out[2 * a + 1] = hi.min(ohi);
        }
        let result = Extent(out);
        if result.is_empty() {
            Extent::EMPTY
        } else {
            result
        }
    }

    /// Smallest extent covering both. Empty operands are ignored.
    pub fn union(&self, other: &Extent) -> Extent {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let mut out = [0i64; 6];
        for a in 0..3 {
            let (lo, hi) = self.axis(a);
            let (olo, ohi) = other.axis(a);
            out[2 * a] = lo.min(olo);
            out[2 * a + 1] = hi.max(ohi);
        }
        Extent(out)
    }

    /// Grow every axis by `margin` points on both sides.
    pub fn grow(&self, margin: i64) -> Extent {
        if self.is_empty() {
            return *self;
        }
        let mut out = self.0;
        for a in 0..3 {
            out[2 * a] -= margin;
            out[2 * a + 1] += margin;
        }
        Extent(out)
    }

    /// Axis with the most points; ties resolve to the lowest axis.
    pub fn longest_axis(&self) -> usize {
        let dims = self.dimensions();
        let mut best = 0;
        for a in 1..3 {
            if dims[a] > dims[best] {
                best = a;
            }
        }
        best
    }

    /// Piece `piece` of `pieces` when the extent is cut into contiguous
    /// slabs along its longest axis.
    ///
    /// Slab `p` spans `min + p*size/n ..= min + (p+1)*size/n - 1`, so the
    /// pieces are disjoint and their union is the whole extent. Pieces that
    /// receive no points (more pieces than points) are empty.
    pub fn split(&self, piece: usize, pieces: usize) -> Extent {
        if pieces == 0 || piece >= pieces || self.is_empty() {
            return Extent::EMPTY;
        }
        let axis = self.longest_axis();
        let (lo, hi) = self.axis(axis);
        let size = hi - lo + 1;
        let (p, n) = (piece as i64, pieces as i64);
        let start = lo + p * size / n;
        let end = lo + (p + 1) * size / n - 1;
        if start > end {
            return Extent::EMPTY;
        }
        let mut out = self.0;
        out[2 * axis] = start;
        out[2 * axis + 1] = end;
        Extent(out)
    }

    /// Flat x-fastest offset of `(i, j, k)` inside this extent.
    pub fn index_of(&self, i: i64, j: i64, k: i64) -> Option<usize> {
        let [x0, x1, y0, y1, z0, z1] = self.0;
        if i < x0 || i > x1 || j < y0 || j > y1 || k < z0 || k > z1 {
            return None;
        }
        let nx = x1 - x0 + 1;
        let ny = y1 - y0 + 1;
        Some(((k - z0) * nx * ny + (j - y0) * nx + (i - x0)) as usize)
    }

    /// Iterate every `(i, j, k)` in x-fastest order.
    pub fn points(&self) -> impl Iterator<Item = (i64, i64, i64)> {
        let [x0, x1, y0, y1, z0, z1] = if self.is_empty() {
            Extent::EMPTY.0
        } else {
            self.0
        };
        (z0..=z1).flat_map(move |k| (y0..=y1).flat_map(move |j| (x0..=x1).map(move |i| (i, j, k))))
    }
}

impl Default for Extent {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x0, x1, y0, y1, z0, z1] = self.0;
        write!(f, "({},{},{},{},{},{})", x0, x1, y0, y1, z0, z1)
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Spatial bounds `[x_min, x_max, y_min, y_max, z_min, z_max]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds(pub [f64; 6]);

impl Bounds {
    /// Bounds of `extent` placed on a grid with the given origin and spacing.
    pub fn from_extent(extent: &Extent, origin: [f64; 3], spacing: [f64; 3]) -> Self {
        let mut out = [0.0; 6];
        for a in 0..3 {
            let (lo, hi) = extent.axis(a);
            out[2 * a] = origin[a] + lo as f64 * spacing[a];
            out[2 * a + 1] = origin[a] + hi as f64 * spacing[a];
        }
        Bounds(out)
    }
}

/// Element type of the scalars a source produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScalarType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    #[default]
    Float64,
}

impl ScalarType {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Int8 => "int8",
            ScalarType::UInt8 => "uint8",
            ScalarType::Int16 => "int16",
            ScalarType::UInt16 => "uint16",
            ScalarType::Int32 => "int32",
            ScalarType::UInt32 => "uint32",
            ScalarType::Int64 => "int64",
            ScalarType::UInt64 => "uint64",
            ScalarType::Float32 => "float32",
            ScalarType::Float64 => "float64",
        }
    }

    pub fn size_bytes(&self) -> usize {
        match self {
            ScalarType::Int8 | ScalarType::UInt8 => 1,
            ScalarType::Int16 | ScalarType::UInt16 => 2,
            ScalarType::Int32 | ScalarType::UInt32 | ScalarType::Float32 => 4,
            ScalarType::Int64 | ScalarType::UInt64 | ScalarType::Float64 => 8,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_extent() {
        assert!(Extent::EMPTY.is_empty());
        assert_eq!(Extent::EMPTY.num_points(), 0);
        assert!(!Extent::new(0, 0, 0, 0, 0, 0).is_empty());
        assert_eq!(Extent::new(0, 9, 0, 0, 0, 0).num_points(), 10);
    }

    #[test]
    fn test_split_matches_even_slabs() {
        let whole = Extent::new(0, 9, 0, 0, 0, 0);
        for i in 0..5 {
            let piece = whole.split(i, 5);
            assert_eq!(piece, Extent::new(2 * i as i64, 2 * i as i64 + 1, 0, 0, 0, 0));
        }
    }

    #[test]
    fn test_split_more_pieces_than_points() {
        let whole = Extent::new(0, 1, 0, 0, 0, 0);
        let non_empty = (0..4).filter(|&p| !whole.split(p, 4).is_empty()).count();
        assert_eq!(non_empty, 2);
    }

    #[test]
    fn test_split_uses_longest_axis() {
        let whole = Extent::new(0, 1, 0, 7, 0, 2);
        assert_eq!(whole.split(1, 2), Extent::new(0, 1, 4, 7, 0, 2));
    }

    #[test]
    fn test_intersect_and_contains() {
        let a = Extent::new(0, 9, 0, 9, 0, 0);
        let b = Extent::new(5, 14, -3, 2, 0, 0);
        assert_eq!(a.intersect(&b), Extent::new(5, 9, 0, 2, 0, 0));
        assert!(a.contains(&Extent::new(1, 2, 3, 4, 0, 0)));
        assert!(!a.contains(&b));
        assert!(a.contains(&Extent::EMPTY));
        assert!(a.intersect(&Extent::new(20, 30, 0, 0, 0, 0)).is_empty());
    }

    #[test]
    fn test_grow_and_index() {
        let e = Extent::new(2, 3, 0, 0, 0, 0).grow(1);
        assert_eq!(e, Extent::new(1, 4, -1, 1, -1, 1));
        let grid = Extent::new(0, 2, 0, 1, 0, 0);
        assert_eq!(grid.index_of(0, 0, 0), Some(0));
        assert_eq!(grid.index_of(2, 1, 0), Some(5));
        assert_eq!(grid.index_of(3, 0, 0), None);
        assert_eq!(grid.points().count(), 6);
    }

    #[test]
    fn test_bounds_from_extent() {
        let b = Bounds::from_extent(&Extent::new(0, 4, 0, 2, 0, 0), [1.0, 0.0, 0.0], [0.5, 1.0, 1.0]);
        assert_eq!(b.0, [1.0, 3.0, 0.0, 2.0, 0.0, 0.0]);
    }

    proptest! {
        #[test]
        fn split_pieces_partition_the_extent(
            lo in -50i64..50,
            len in 1i64..200,
            pieces in 1usize..40,
        ) {
            let whole = Extent::new(lo, lo + len - 1, 0, 0, 0, 0);
            let mut covered = 0usize;
            let mut next = lo;
            for p in 0..pieces {
                let piece = whole.split(p, pieces);
                if piece.is_empty() {
                    continue;
                }
                prop_assert!(whole.contains(&piece));
                prop_assert_eq!(piece.axis(0).0, next);
                next = piece.axis(0).1 + 1;
                covered += piece.num_points();
            }
            prop_assert_eq!(covered, whole.num_points());
        }
    }
}
