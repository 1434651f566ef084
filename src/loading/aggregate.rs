//! In-order merging of parsed chunks into the dataset store.

use thiserror::Error;

use crate::data::DataStore;

use super::Chunk;

/// Fatal internal-invariant violations detected during merging.
///
/// These indicate a decoder contract violation, not bad input data;
/// continuing would silently misalign features and targets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error(
        "chunk {chunk_idx}: feature buffer holds {feature_len} values for \
         {targets} targets at {n_features} features per row"
    )]
    LengthMismatch {
        chunk_idx: usize,
        feature_len: usize,
        targets: usize,
        n_features: usize,
    },
}

/// Outcome of a merge: how many rows the store accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Rows actually ingested across all chunks.
    pub ingested: usize,
    /// True when the store refused a row before the chunk list was exhausted.
    pub truncated: bool,
}

/// Merge parsed chunks into `store`, preserving original input order.
///
/// Walks chunks in list order and rows in chunk-internal order, so rows land
/// in the store exactly as they appeared in the input stream, modulo rows
/// dropped by decoding. The merge stops at the store's first refusal and
/// reports the ingested count; no row after the refused one is attempted.
pub fn merge_chunks(chunks: &[Chunk], store: &mut DataStore) -> Result<MergeOutcome, MergeError> {
    let n_features = store.n_features();
    let mut ingested = 0;
    for (chunk_idx, chunk) in chunks.iter().enumerate() {
        if chunk.feature_buffer().len() != chunk.n_rows() * n_features {
            return Err(MergeError::LengthMismatch {
                chunk_idx,
                feature_len: chunk.feature_buffer().len(),
                targets: chunk.n_rows(),
                n_features,
            });
        }
        for (features, target) in chunk.rows(n_features) {
            if !store.add_vector(features, target) {
                return Ok(MergeOutcome {
                    ingested,
                    truncated: true,
                });
            }
            ingested += 1;
        }
    }
    Ok(MergeOutcome {
        ingested,
        truncated: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TsvDecoder;
    use crate::loading::{parse_chunks, read_chunks};
    use std::io::Cursor;

    fn store(max_examples: Option<usize>) -> DataStore {
        DataStore::new(1, 100, max_examples)
    }

    fn parsed(input: &str, chunk_size: usize) -> Vec<Chunk> {
        let decoder = TsvDecoder::new(1);
        let mut chunks = read_chunks(Cursor::new(input), chunk_size).unwrap();
        parse_chunks(&mut chunks, &decoder, 0);
        chunks
    }

    #[test]
    fn merges_all_rows_in_order() {
        let chunks = parsed("1 10\n2 20\n3 30\n4 40\n5 50\n", 2);
        let mut store = store(None);
        let outcome = merge_chunks(&chunks, &mut store).unwrap();
        assert_eq!(
            outcome,
            MergeOutcome {
                ingested: 5,
                truncated: false
            }
        );
        store.close();
        assert_eq!(store.targets(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn refusal_stops_at_exact_row() {
        let chunks = parsed("1 10\n2 20\n3 30\n4 40\n5 50\n", 2);
        let mut store = store(Some(3));
        let outcome = merge_chunks(&chunks, &mut store).unwrap();
        assert_eq!(
            outcome,
            MergeOutcome {
                ingested: 3,
                truncated: true
            }
        );
        store.close();
        assert_eq!(store.targets(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn length_mismatch_is_fatal() {
        // Two targets but three feature values at one feature per row.
        let bad = Chunk::from_parsed(vec![0.1, 0.2, 0.3], vec![1.0, 2.0]);
        let mut store = store(None);
        let err = merge_chunks(&[bad], &mut store).unwrap_err();
        assert_eq!(
            err,
            MergeError::LengthMismatch {
                chunk_idx: 0,
                feature_len: 3,
                targets: 2,
                n_features: 1,
            }
        );
    }
}
