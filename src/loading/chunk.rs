//! Bounded batches of raw input lines and their parsed rows.

use std::io::{self, BufRead};

use crate::data::RowDecoder;

/// Number of accepted lines a loading chunk may hold and parse as one unit.
pub const DEFAULT_CHUNK_SIZE: usize = 2500;

/// One unit of parallel parsing work.
///
/// A chunk buffers raw lines during the read phase. [`Chunk::parse`] decodes
/// every buffered line in order, filling the flat feature buffer (row-major,
/// stride = feature count) and the target list. Rows the decoder rejects are
/// dropped, not replaced, so `n_rows() <= n_lines()`.
#[derive(Debug, Default)]
pub struct Chunk {
    lines: Vec<String>,
    features: Vec<f64>,
    targets: Vec<f64>,
}

impl Chunk {
    fn with_capacity(lines: usize) -> Self {
        Self {
            lines: Vec::with_capacity(lines),
            features: Vec::new(),
            targets: Vec::new(),
        }
    }

    /// Append a raw line; empty lines are rejected and not counted.
    pub fn add_line(&mut self, line: String) -> bool {
        if line.is_empty() {
            return false;
        }
        self.lines.push(line);
        true
    }

    /// Number of buffered raw lines.
    pub fn n_lines(&self) -> usize {
        self.lines.len()
    }

    /// Number of successfully parsed rows.
    pub fn n_rows(&self) -> usize {
        self.targets.len()
    }

    /// Decode every buffered line, keeping accepted rows in input order.
    pub fn parse<D: RowDecoder>(&mut self, decoder: &D) {
        self.features.reserve(self.lines.len() * decoder.n_features());
        self.targets.reserve(self.lines.len());
        for line in &self.lines {
            if let Some(row) = decoder.decode(line) {
                self.features.extend_from_slice(&row.features);
                self.targets.push(row.target);
            }
        }
    }

    /// Parsed rows as `(features, target)` pairs, in input order.
    ///
    /// `n_features` must match the decoder the chunk was parsed with.
    pub fn rows(&self, n_features: usize) -> impl Iterator<Item = (&[f64], f64)> {
        self.features
            .chunks_exact(n_features)
            .zip(self.targets.iter().copied())
    }

    pub(crate) fn feature_buffer(&self) -> &[f64] {
        &self.features
    }

    /// Build a chunk with pre-populated parsed buffers, bypassing `parse`.
    #[cfg(test)]
    pub(crate) fn from_parsed(features: Vec<f64>, targets: Vec<f64>) -> Self {
        Self {
            lines: Vec::new(),
            features,
            targets,
        }
    }
}

/// Split a line source into parse-ready chunks of at most `chunk_size`
/// accepted lines.
///
/// Empty lines are silently dropped and do not count toward the chunk size.
/// Concatenating all chunks' lines in order reproduces the accepted input
/// lines in original order. No parsing happens here; see
/// [`parse_chunks`](super::parse_chunks).
pub fn read_chunks<R: BufRead>(reader: R, chunk_size: usize) -> io::Result<Vec<Chunk>> {
    assert!(chunk_size >= 1, "chunk_size must be at least 1");
    let mut chunks = Vec::new();
    let mut current = Chunk::with_capacity(chunk_size);
    for line in reader.lines() {
        current.add_line(line?);
        if current.n_lines() >= chunk_size {
            chunks.push(std::mem::replace(&mut current, Chunk::with_capacity(chunk_size)));
        }
    }
    if current.n_lines() > 0 {
        chunks.push(current);
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TsvDecoder;
    use std::io::Cursor;

    #[test]
    fn five_lines_chunk_size_two() {
        let input = "1 0.1\n2 0.2\n3 0.3\n4 0.4\n5 0.5\n";
        let chunks = read_chunks(Cursor::new(input), 2).unwrap();
        let sizes: Vec<usize> = chunks.iter().map(Chunk::n_lines).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let chunks = read_chunks(Cursor::new(""), 4).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn single_empty_line_yields_no_chunks() {
        let chunks = read_chunks(Cursor::new("\n"), 4).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn empty_lines_do_not_count_toward_chunk_size() {
        let input = "1 0.1\n\n2 0.2\n\n\n3 0.3\n";
        let chunks = read_chunks(Cursor::new(input), 2).unwrap();
        let sizes: Vec<usize> = chunks.iter().map(Chunk::n_lines).collect();
        assert_eq!(sizes, vec![2, 1]);
    }

    #[test]
    fn parse_drops_malformed_rows() {
        let decoder = TsvDecoder::new(1);
        let input = "1.0 0.5\nnot a row\n2.0 0.25\n";
        let mut chunks = read_chunks(Cursor::new(input), 10).unwrap();
        assert_eq!(chunks.len(), 1);
        let chunk = &mut chunks[0];
        assert_eq!(chunk.n_lines(), 3);
        chunk.parse(&decoder);
        assert_eq!(chunk.n_rows(), 2);
        let rows: Vec<(Vec<f64>, f64)> = chunk
            .rows(1)
            .map(|(f, t)| (f.to_vec(), t))
            .collect();
        assert_eq!(rows, vec![(vec![0.5], 1.0), (vec![0.25], 2.0)]);
    }
}
