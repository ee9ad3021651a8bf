//! Batch Partitioning

use std::num::NonZeroUsize;

/// A contiguous slice `[offset, offset + len)` of the input rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch<'a, T> {
    index: usize,
    offset: usize,
    rows: &'a [T],
}

impl<'a, T> Batch<'a, T> {
    /// Position of this batch in the partition
    pub fn index(&self) -> usize {
        self.index
    }

    /// Offset of the first row in the full input
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Offset one past the last row
    pub fn end(&self) -> usize {
        self.offset + self.rows.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &'a [T] {
        self.rows
    }
}

/// Number of batches `partition` yields for `len` rows
pub fn batch_count(len: usize, batch_size: NonZeroUsize) -> usize {
    len.div_ceil(batch_size.get())
}

/// Split `rows` into consecutive batches of `batch_size`; the last may be shorter
pub fn partition<T>(
    rows: &[T],
    batch_size: NonZeroUsize,
) -> impl ExactSizeIterator<Item = Batch<'_, T>> {
    rows.chunks(batch_size.get())
        .enumerate()
        .map(move |(index, rows)| Batch {
            index,
            offset: index * batch_size.get(),
            rows,
        })
}
