//! Line decoding into feature vectors and targets.

/// A decoded training row.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    /// Feature values, length = the decoder's feature count.
    pub features: Vec<f64>,
    pub target: f64,
}

/// A decoded test row, carrying the logged reference score when present.
///
/// The reference score is an externally supplied expected output used only
/// for the agreement diagnostic, never for loss computation.
#[derive(Debug, Clone, PartialEq)]
pub struct TestRow {
    pub features: Vec<f64>,
    pub target: f64,
    pub reference_score: f64,
}

/// Decodes one raw line into a row, or rejects it.
///
/// Implementations must absorb malformed input: a bad line yields `None`,
/// never a panic. Decoders are shared across parse workers, hence `Sync`.
pub trait RowDecoder: Sync {
    /// Feature values every accepted row carries.
    fn n_features(&self) -> usize;

    /// Decode a training row.
    fn decode(&self, line: &str) -> Option<ParsedRow>;

    /// Decode a test row, also yielding the logged reference score.
    fn decode_test(&self, line: &str) -> Option<TestRow>;
}

/// Whitespace-separated row decoder.
///
/// Layout: target first, then exactly `n_features` feature values. Test rows
/// may carry one trailing column holding the logged reference score; when it
/// is absent the score decodes as NaN, which can never win the agreement
/// check.
#[derive(Debug, Clone)]
pub struct TsvDecoder {
    n_features: usize,
}

impl TsvDecoder {
    pub fn new(n_features: usize) -> Self {
        Self { n_features }
    }

    fn decode_fields(&self, line: &str) -> Option<(Vec<f64>, f64, Option<f64>)> {
        let mut fields = line.split_whitespace();
        let target: f64 = fields.next()?.parse().ok()?;
        let mut features = Vec::with_capacity(self.n_features);
        for _ in 0..self.n_features {
            features.push(fields.next()?.parse().ok()?);
        }
        let score = match fields.next() {
            Some(field) => Some(field.parse().ok()?),
            None => None,
        };
        if fields.next().is_some() {
            return None;
        }
        Some((features, target, score))
    }
}

impl RowDecoder for TsvDecoder {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn decode(&self, line: &str) -> Option<ParsedRow> {
        let (features, target, score) = self.decode_fields(line)?;
        // Training rows have no score column.
        if score.is_some() {
            return None;
        }
        Some(ParsedRow { features, target })
    }

    fn decode_test(&self, line: &str) -> Option<TestRow> {
        let (features, target, score) = self.decode_fields(line)?;
        Some(TestRow {
            features,
            target,
            reference_score: score.unwrap_or(f64::NAN),
        })
    }
}
