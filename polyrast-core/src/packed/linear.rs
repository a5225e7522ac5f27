//! Linear packed storage

use super::{PackedArray, PackedElement};
use std::marker::PhantomData;
use std::ops::Range;

/// Packed array backed by a single growing interleaved buffer.
///
/// Simpler addressing than [`super::PackedBlockVec`] at the cost of an O(n)
/// copy when the buffer reallocates. Intended for moderate element counts.
#[derive(Debug, Clone)]
pub struct PackedVec<T: PackedElement> {
    data: Vec<T::Scalar>,
    _element: PhantomData<T>,
}

impl<T: PackedElement> PackedVec<T> {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            _element: PhantomData,
        }
    }

    pub fn with_capacity(count: usize) -> Self {
        Self {
            data: Vec::with_capacity(count * T::DOF),
            _element: PhantomData,
        }
    }

    /// Makes this array identical in value to `src`
    pub fn set_to(&mut self, src: &Self) {
        self.data.clear();
        self.data.extend_from_slice(&src.data);
    }

    /// The raw interleaved components
    pub fn as_scalars(&self) -> &[T::Scalar] {
        &self.data
    }
}

impl<T: PackedElement> Default for PackedVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PackedElement> PackedArray<T> for PackedVec<T> {
    fn reset(&mut self) {
        self.data.clear();
    }

    fn reserve(&mut self, count: usize) {
        self.data.reserve(count * T::DOF);
    }

    fn append(&mut self, element: T) {
        let n = self.data.len();
        self.data.resize(n + T::DOF, T::Scalar::default());
        element.write_to(&mut self.data[n..]);
    }

    fn set(&mut self, index: usize, element: T) {
        let i = index * T::DOF;
        element.write_to(&mut self.data[i..i + T::DOF]);
    }

    fn get(&self, index: usize) -> T {
        let i = index * T::DOF;
        T::from_slice(&self.data[i..i + T::DOF])
    }

    fn len(&self) -> usize {
        self.data.len() / T::DOF
    }

    fn for_idx<F: FnMut(usize, &mut T)>(&mut self, range: Range<usize>, mut op: F) {
        for index in range {
            let i = index * T::DOF;
            let slice = &mut self.data[i..i + T::DOF];
            let mut tmp = T::from_slice(slice);
            op(index, &mut tmp);
            tmp.write_to(slice);
        }
    }
}
