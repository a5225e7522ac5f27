//! Block-allocated packed storage

use super::{PackedArray, PackedElement};
use std::marker::PhantomData;
use std::ops::Range;

/// Default number of elements stored per block
pub const DEFAULT_BLOCK_SIZE: usize = 50_000;

/// How a [`PackedBlockVec`] allocates memory as it grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockGrowth {
    /// The trailing block grows organically up to the block capacity. Smaller
    /// footprint for arrays that never fill a whole block.
    GrowLast,
    /// Every block is allocated at full capacity up front. Fewer reallocations
    /// when the final size is large.
    FixedBlocks,
}

/// Packed array backed by a list of fixed-capacity interleaved blocks.
///
/// Growing never copies previously stored elements, only a new block is
/// allocated, which bounds the cost of appending to clouds with millions of
/// points. In exchange an index must be translated into block + offset. All
/// blocks except the last are always full.
#[derive(Debug, Clone)]
pub struct PackedBlockVec<T: PackedElement> {
    blocks: Vec<Vec<T::Scalar>>,
    /// scalars per full block, always a multiple of `T::DOF`
    block_capacity: usize,
    growth: BlockGrowth,
    _element: PhantomData<T>,
}

impl<T: PackedElement> PackedBlockVec<T> {
    pub fn new() -> Self {
        Self::with_blocks(DEFAULT_BLOCK_SIZE, BlockGrowth::GrowLast)
    }

    /// Configures the number of elements per block and the growth policy
    pub fn with_blocks(elements_per_block: usize, growth: BlockGrowth) -> Self {
        let elements_per_block = elements_per_block.max(1);
        Self {
            blocks: Vec::new(),
            block_capacity: elements_per_block * T::DOF,
            growth,
            _element: PhantomData,
        }
    }

    /// Makes this array identical in value to `src`. Block configuration is
    /// left unchanged.
    pub fn set_to(&mut self, src: &Self) {
        self.reset();
        self.reserve(src.len());
        for block in &src.blocks {
            let mut i = 0;
            while i < block.len() {
                self.append(T::from_slice(&block[i..i + T::DOF]));
                i += T::DOF;
            }
        }
    }

    /// Number of elements a single block can hold
    pub fn elements_per_block(&self) -> usize {
        self.block_capacity / T::DOF
    }

    fn stored_scalars(&self) -> usize {
        match self.blocks.split_last() {
            Some((last, full)) => full.len() * self.block_capacity + last.len(),
            None => 0,
        }
    }

    fn push_block(&mut self) {
        let capacity = match self.growth {
            BlockGrowth::GrowLast => 0,
            BlockGrowth::FixedBlocks => self.block_capacity,
        };
        self.blocks.push(Vec::with_capacity(capacity));
    }
}

impl<T: PackedElement> Default for PackedBlockVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PackedElement> PackedArray<T> for PackedBlockVec<T> {
    fn reset(&mut self) {
        self.blocks.clear();
    }

    fn reserve(&mut self, count: usize) {
        // Only the trailing block can be grown without breaking the full-block
        // invariant. Whole blocks are allocated on demand by append.
        if let Some(last) = self.blocks.last_mut() {
            let wanted = (count * T::DOF).min(self.block_capacity.saturating_sub(last.len()));
            last.reserve(wanted);
        } else if count > 0 {
            self.push_block();
            let wanted = (count * T::DOF).min(self.block_capacity);
            if let Some(last) = self.blocks.last_mut() {
                last.reserve(wanted);
            }
        }
    }

    fn append(&mut self, element: T) {
        if self
            .blocks
            .last()
            .map_or(true, |b| b.len() == self.block_capacity)
        {
            self.push_block();
        }
        if let Some(block) = self.blocks.last_mut() {
            let n = block.len();
            block.resize(n + T::DOF, T::Scalar::default());
            element.write_to(&mut block[n..]);
        }
    }

    fn set(&mut self, index: usize, element: T) {
        let i = index * T::DOF;
        let block = &mut self.blocks[i / self.block_capacity];
        let offset = i % self.block_capacity;
        element.write_to(&mut block[offset..offset + T::DOF]);
    }

    fn get(&self, index: usize) -> T {
        let i = index * T::DOF;
        let block = &self.blocks[i / self.block_capacity];
        let offset = i % self.block_capacity;
        T::from_slice(&block[offset..offset + T::DOF])
    }

    fn len(&self) -> usize {
        self.stored_scalars() / T::DOF
    }

    fn for_idx<F: FnMut(usize, &mut T)>(&mut self, range: Range<usize>, mut op: F) {
        for index in range {
            let i = index * T::DOF;
            let block = &mut self.blocks[i / self.block_capacity];
            let offset = i % self.block_capacity;
            let slice = &mut block[offset..offset + T::DOF];
            let mut tmp = T::from_slice(slice);
            op(index, &mut tmp);
            tmp.write_to(slice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point2, Point3, Point4};
    use rand::prelude::*;

    /// Small blocks so a handful of points spans several of them
    fn small_blocks<T: PackedElement>(growth: BlockGrowth) -> PackedBlockVec<T> {
        PackedBlockVec::with_blocks(3, growth)
    }

    #[test]
    fn append_spans_multiple_blocks() {
        for growth in [BlockGrowth::GrowLast, BlockGrowth::FixedBlocks] {
            let mut rng = StdRng::seed_from_u64(345);
            let mut array = small_blocks::<Point3<f64>>(growth);

            let points: Vec<Point3<f64>> = (0..20)
                .map(|_| Point3::new(rng.gen(), rng.gen(), rng.gen()))
                .collect();

            for p in &points {
                array.append(*p);
            }

            assert_eq!(points.len(), array.len());
            for (i, p) in points.iter().enumerate() {
                assert_eq!(*p, array.get(i), "growth={growth:?} index={i}");
            }
        }
    }

    #[test]
    fn set_across_block_boundary() {
        let mut array = small_blocks::<Point2<f64>>(BlockGrowth::FixedBlocks);
        for i in 0..10 {
            array.append(Point2::new(i as f64, 0.0));
        }

        array.set(4, Point2::new(-1.0, -2.0));
        array.set(9, Point2::new(-3.0, -4.0));

        assert_eq!(Point2::new(-1.0, -2.0), array.get(4));
        assert_eq!(Point2::new(-3.0, -4.0), array.get(9));
        assert_eq!(Point2::new(3.0, 0.0), array.get(3));
    }

    #[test]
    fn for_idx_writes_back_across_blocks() {
        let mut array = small_blocks::<Point4<f64>>(BlockGrowth::GrowLast);
        for i in 0..8 {
            array.append(Point4::new(i as f64, 0.0, 0.0, 1.0));
        }

        array.for_idx(0..8, |idx, p| {
            p.y = idx as f64 + 0.5;
        });

        for i in 0..8 {
            assert_eq!(i as f64 + 0.5, array.get(i).y);
        }
    }

    #[test]
    fn set_to_copies_every_element() {
        let mut src = small_blocks::<Point3<f64>>(BlockGrowth::GrowLast);
        for i in 0..11 {
            src.append(Point3::new(i as f64, 2.0 * i as f64, 3.0));
        }

        let mut dst = small_blocks::<Point3<f64>>(BlockGrowth::GrowLast);
        dst.append(Point3::new(9.0, 9.0, 9.0));
        dst.set_to(&src);

        assert_eq!(src.len(), dst.len());
        for i in 0..src.len() {
            assert_eq!(src.get(i), dst.get(i));
        }
    }

    #[test]
    fn reserve_is_only_a_hint() {
        let mut array = small_blocks::<Point2<f32>>(BlockGrowth::GrowLast);
        array.reserve(100);
        assert_eq!(0, array.len());
        array.append(Point2::new(1.0, 2.0));
        assert_eq!(1, array.len());
        assert_eq!(Point2::new(1.0, 2.0), array.get(0));
    }

    #[test]
    fn reset_drops_blocks() {
        let mut array = small_blocks::<Point3<f32>>(BlockGrowth::FixedBlocks);
        for _ in 0..7 {
            array.append(Point3::new(1.0, 2.0, 3.0));
        }
        array.reset();
        assert_eq!(0, array.len());
        array.append(Point3::new(4.0, 5.0, 6.0));
        assert_eq!(Point3::new(4.0, 5.0, 6.0), array.get(0));
    }

    #[test]
    fn default_configuration() {
        let array = PackedBlockVec::<Point3<f64>>::new();
        assert_eq!(DEFAULT_BLOCK_SIZE, array.elements_per_block());
        assert!(array.is_empty());
    }
}
