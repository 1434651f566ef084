//! Integration tests for the chunked loading pipeline: order preservation,
//! parallelism equivalence, and aggregation refusal, exercised end-to-end
//! from raw text to the dataset store.

use std::io::Cursor;

use gbtrain::{
    merge_chunks, parse_chunks, read_chunks, DataStore, MergeOutcome, RowDecoder, TsvDecoder,
};

/// Build a deterministic input with distinct targets, a sprinkle of empty
/// and malformed lines, and two features per row.
fn sample_input(rows: usize) -> String {
    let mut input = String::new();
    for i in 0..rows {
        if i % 13 == 0 {
            input.push('\n');
        }
        if i % 17 == 0 {
            input.push_str("not numeric at all\n");
        }
        input.push_str(&format!("{} {} {}\n", i, i as f64 * 0.25, 100.0 - i as f64));
    }
    input
}

/// Reference semantics: decode each line independently, in order, dropping
/// failures.
fn reference_rows(input: &str, decoder: &TsvDecoder) -> Vec<(Vec<f64>, f64)> {
    input
        .lines()
        .filter(|l| !l.is_empty())
        .filter_map(|l| decoder.decode(l))
        .map(|row| (row.features, row.target))
        .collect()
}

fn pipeline_targets(input: &str, chunk_size: usize, threads: usize) -> Vec<f64> {
    let decoder = TsvDecoder::new(2);
    let mut chunks = read_chunks(Cursor::new(input), chunk_size).unwrap();
    parse_chunks(&mut chunks, &decoder, threads);
    let mut store = DataStore::new(2, 10_000, None);
    let outcome = merge_chunks(&chunks, &mut store).unwrap();
    assert!(!outcome.truncated);
    store.close();
    store.targets().to_vec()
}

#[test]
fn dataset_order_matches_independent_decoding() {
    let input = sample_input(100);
    let decoder = TsvDecoder::new(2);
    let expected: Vec<f64> = reference_rows(&input, &decoder)
        .into_iter()
        .map(|(_, target)| target)
        .collect();
    assert_eq!(expected.len(), 100);

    for chunk_size in [1, 3, 7, 100, 1000] {
        for threads in [0, 1, 4] {
            let targets = pipeline_targets(&input, chunk_size, threads);
            assert_eq!(
                targets, expected,
                "chunk_size = {chunk_size}, threads = {threads}"
            );
        }
    }
}

#[test]
fn parsed_chunks_are_identical_across_pool_sizes() {
    let input = sample_input(200);
    let decoder = TsvDecoder::new(2);

    let collect = |threads: usize| -> Vec<(Vec<f64>, f64)> {
        let mut chunks = read_chunks(Cursor::new(&input[..]), 9).unwrap();
        parse_chunks(&mut chunks, &decoder, threads);
        chunks
            .iter()
            .flat_map(|c| c.rows(2).map(|(f, t)| (f.to_vec(), t)))
            .collect()
    };

    let inline = collect(0);
    assert_eq!(inline, reference_rows(&input, &decoder));
    for threads in [1, 2, 3, 8] {
        assert_eq!(collect(threads), inline, "threads = {threads}");
    }
}

#[test]
fn refusal_reports_exact_ingested_count() {
    let input = sample_input(50);
    let decoder = TsvDecoder::new(2);
    let mut chunks = read_chunks(Cursor::new(&input[..]), 4).unwrap();
    parse_chunks(&mut chunks, &decoder, 2);

    for cap in [0, 1, 7, 49] {
        let mut store = DataStore::new(2, 10_000, Some(cap));
        let outcome = merge_chunks(&chunks, &mut store).unwrap();
        assert_eq!(
            outcome,
            MergeOutcome {
                ingested: cap,
                truncated: true
            }
        );
        assert_eq!(store.n_examples(), cap);
    }

    // A cap equal to the row count is not a truncation.
    let mut store = DataStore::new(2, 10_000, Some(50));
    let outcome = merge_chunks(&chunks, &mut store).unwrap();
    assert_eq!(
        outcome,
        MergeOutcome {
            ingested: 50,
            truncated: false
        }
    );
}

#[test]
fn decoder_feature_count_flows_through_the_pipeline() {
    let decoder = TsvDecoder::new(3);
    assert_eq!(decoder.n_features(), 3);
    let mut chunks = read_chunks(Cursor::new("1 2 3 4\n5 6 7 8\n"), 10).unwrap();
    parse_chunks(&mut chunks, &decoder, 0);
    let rows: Vec<(Vec<f64>, f64)> = chunks[0].rows(3).map(|(f, t)| (f.to_vec(), t)).collect();
    assert_eq!(
        rows,
        vec![
            (vec![2.0, 3.0, 4.0], 1.0),
            (vec![6.0, 7.0, 8.0], 5.0),
        ]
    );
}
