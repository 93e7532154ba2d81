//! Splitting an ordered record set into batches.

use crm_core::BulkError;

/// Split `records` into consecutive batches of `size` elements.
///
/// Every batch but the last holds exactly `size` elements; concatenating
/// the batches reproduces the input. Empty input yields no batches.
pub fn chunk<T>(records: &[T], size: usize) -> Result<Vec<&[T]>, BulkError> {
    if size == 0 {
        return Err(BulkError::invalid_argument(
            "Batch size must be a positive integer",
        ));
    }
    Ok(records.chunks(size).collect())
}
