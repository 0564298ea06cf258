use ndarray::{s, Array2, ArrayView2};

pub struct MatrixHelper;

impl MatrixHelper {
    /// Copies `input` into the left of a zeroed matrix `width` columns wide.
    ///
    /// Returns `None` when `input` is wider than `width`; columns are never
    /// dropped.
    pub fn pad_columns<T: Copy + Default>(input: ArrayView2<T>, width: usize) -> Option<Array2<T>> {
        let (rows, cols) = input.dim();
        if cols > width {
            return None;
        }
        let mut padded = Array2::from_elem((rows, width), T::default());
        padded.slice_mut(s![.., ..cols]).assign(&input);
        Some(padded)
    }
}
