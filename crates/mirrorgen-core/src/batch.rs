//! Order-preserving partitioning of a registry listing into batches.

use crate::{error::CoreError, CoreResult};

/// A contiguous slice of the listing, owned by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<T> {
    pub index: usize,
    pub entries: Vec<T>,
}

impl<T> Batch<T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Number of batches `partition` produces for `len` entries.
pub fn batch_count(len: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    len.div_ceil(batch_size)
}

/// Splits `entries` into consecutive batches of `batch_size`.
///
/// Every batch but the last holds exactly `batch_size` entries. Entries are
/// moved, so concatenating the batches in index order gives back the input.
///
/// # Errors
///
/// Returns [`CoreError::InvalidConfiguration`] if `batch_size` is zero.
///
/// # Example
///
/// ```
/// use mirrorgen_core::batch::partition;
///
/// let batches = partition(vec!["a", "b", "c", "d", "e"], 2).unwrap();
/// assert_eq!(batches.len(), 3);
/// assert_eq!(batches[2].entries, vec!["e"]);
/// ```
pub fn partition<T>(entries: Vec<T>, batch_size: usize) -> CoreResult<Vec<Batch<T>>> {
    if batch_size == 0 {
        return Err(CoreError::InvalidConfiguration(
            "batch size must be at least 1".into(),
        ));
    }

    let mut batches = Vec::with_capacity(batch_count(entries.len(), batch_size));
    let mut remaining = entries.into_iter().peekable();

    while remaining.peek().is_some() {
        let chunk: Vec<T> = remaining.by_ref().take(batch_size).collect();
        batches.push(Batch {
            index: batches.len(),
            entries: chunk,
        });
    }

    Ok(batches)
}
