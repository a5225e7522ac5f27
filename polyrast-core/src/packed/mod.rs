//! Packed array containers
//!
//! Point tuples are stored contiguously in interleaved component order rather
//! than as individually boxed elements. This keeps very large clouds compact
//! and cache friendly. Two storage strategies are provided: a single growing
//! linear buffer ([`PackedVec`]) and a block-allocated buffer
//! ([`PackedBlockVec`]) whose growth cost is bounded for clouds with millions
//! of points.

mod block;
mod linear;
mod tuple;

pub use block::{BlockGrowth, PackedBlockVec, DEFAULT_BLOCK_SIZE};
pub use linear::PackedVec;
pub use tuple::PackedTupleVec;

use nalgebra::{Point2, Point3, Point4, Scalar};
use std::ops::Range;

/// A fixed degree-of-freedom tuple that can be flattened into a scalar slice.
pub trait PackedElement: Copy {
    /// Component type stored in the backing buffer
    type Scalar: Copy + Default + PartialEq + std::fmt::Debug + 'static;

    /// Number of components per element
    const DOF: usize;

    /// Reads an element from the first `DOF` scalars of `data`
    fn from_slice(data: &[Self::Scalar]) -> Self;

    /// Writes the element into the first `DOF` scalars of `data`
    fn write_to(&self, data: &mut [Self::Scalar]);
}

impl<T: Scalar + Copy + Default> PackedElement for Point2<T> {
    type Scalar = T;
    const DOF: usize = 2;

    fn from_slice(data: &[T]) -> Self {
        Point2::new(data[0], data[1])
    }

    fn write_to(&self, data: &mut [T]) {
        data[0] = self.x;
        data[1] = self.y;
    }
}

impl<T: Scalar + Copy + Default> PackedElement for Point3<T> {
    type Scalar = T;
    const DOF: usize = 3;

    fn from_slice(data: &[T]) -> Self {
        Point3::new(data[0], data[1], data[2])
    }

    fn write_to(&self, data: &mut [T]) {
        data[0] = self.x;
        data[1] = self.y;
        data[2] = self.z;
    }
}

impl<T: Scalar + Copy + Default> PackedElement for Point4<T> {
    type Scalar = T;
    const DOF: usize = 4;

    fn from_slice(data: &[T]) -> Self {
        Point4::new(data[0], data[1], data[2], data[3])
    }

    fn write_to(&self, data: &mut [T]) {
        data[0] = self.x;
        data[1] = self.y;
        data[2] = self.z;
        data[3] = self.w;
    }
}

/// Common contract for packed tuple containers.
///
/// Elements are returned by value; the interleaved backing store is an
/// implementation detail. Indexes are not validated beyond the panics of
/// slice indexing.
pub trait PackedArray<T: PackedElement> {
    /// Drops all elements
    fn reset(&mut self);

    /// Pre-allocates capacity for `count` elements. Performance hint only.
    fn reserve(&mut self, count: usize);

    /// Appends a copy of the element. Amortized O(1).
    fn append(&mut self, element: T);

    /// Overwrites the element at `index` in place
    fn set(&mut self, index: usize, element: T);

    /// Returns a copy of the element at `index`
    fn get(&self, index: usize) -> T;

    /// Writes a copy of the element at `index` into caller-owned storage
    fn get_copy(&self, index: usize, dst: &mut T) {
        *dst = self.get(index);
    }

    /// Number of elements stored
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends every element in the slice
    fn append_all(&mut self, elements: &[T]) {
        self.reserve(elements.len());
        for &e in elements {
            self.append(e);
        }
    }

    /// Visits elements in the half-open range in ascending index order.
    /// Mutations made through the reference are written back to the backing
    /// store before the traversal advances, which supports in-place
    /// transforms. Not safe for concurrent mutation.
    fn for_idx<F: FnMut(usize, &mut T)>(&mut self, range: Range<usize>, op: F);
}
