//! Packed storage for tuples whose width is only known at runtime

/// Interleaved array of fixed-width tuples, e.g. byte descriptors, where the
/// width is a runtime value instead of a type parameter.
#[derive(Debug, Clone)]
pub struct PackedTupleVec<T: Copy + Default> {
    dof: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> PackedTupleVec<T> {
    /// `dof` is the number of components in every tuple, must be non-zero
    pub fn new(dof: usize) -> Self {
        Self {
            dof: dof.max(1),
            data: Vec::new(),
        }
    }

    /// Components per tuple
    pub fn dof(&self) -> usize {
        self.dof
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dof
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn reset(&mut self) {
        self.data.clear();
    }

    pub fn reserve(&mut self, count: usize) {
        self.data.reserve(count * self.dof);
    }

    /// Appends one tuple. The slice length must equal `dof`.
    pub fn append(&mut self, tuple: &[T]) {
        debug_assert_eq!(self.dof, tuple.len());
        self.data.extend_from_slice(tuple);
    }

    /// Borrows the tuple at `index`
    pub fn get(&self, index: usize) -> &[T] {
        let i = index * self.dof;
        &self.data[i..i + self.dof]
    }

    /// Overwrites the tuple at `index`
    pub fn set(&mut self, index: usize, tuple: &[T]) {
        debug_assert_eq!(self.dof, tuple.len());
        let i = index * self.dof;
        self.data[i..i + self.dof].copy_from_slice(tuple);
    }

    /// Makes this array identical in value to `src`, including its width
    pub fn set_to(&mut self, src: &Self) {
        self.dof = src.dof;
        self.data.clear();
        self.data.extend_from_slice(&src.data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_get() {
        let mut array = PackedTupleVec::<u8>::new(4);
        array.append(&[1, 2, 3, 4]);
        array.append(&[5, 6, 7, 8]);

        assert_eq!(2, array.len());
        assert_eq!(&[1, 2, 3, 4], array.get(0));
        assert_eq!(&[5, 6, 7, 8], array.get(1));
    }

    #[test]
    fn set_overwrites() {
        let mut array = PackedTupleVec::<u8>::new(2);
        array.append(&[1, 2]);
        array.append(&[3, 4]);
        array.set(0, &[9, 9]);
        assert_eq!(&[9, 9], array.get(0));
        assert_eq!(&[3, 4], array.get(1));
    }

    #[test]
    fn set_to_copies_width_and_data() {
        let mut src = PackedTupleVec::<u8>::new(3);
        src.append(&[1, 2, 3]);

        let mut dst = PackedTupleVec::<u8>::new(5);
        dst.set_to(&src);

        assert_eq!(3, dst.dof());
        assert_eq!(1, dst.len());
        assert_eq!(&[1, 2, 3], dst.get(0));
    }
}
