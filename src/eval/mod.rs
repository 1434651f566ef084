//! Streaming evaluation of an ensemble against test rows.

use std::io::{self, BufRead};

use tracing::info;

use crate::data::{RowDecoder, TestRow};
use crate::model::Forest;
use crate::training::{LeastSquaresLoss, LossFunction};

/// A logged reference score agrees with the computed prediction when they
/// differ by at most this much.
const AGREEMENT_TOLERANCE: f64 = 1e-5;

/// Running reduction/loss is reported every this many scored examples.
const PROGRESS_INTERVAL: u64 = 1000;

/// Final accounting of one evaluation run.
#[derive(Debug, Clone, PartialEq)]
pub struct TestReport {
    pub n_examples: u64,
    /// Total loss over the run.
    pub loss: f64,
    /// Baseline loss minus achieved loss.
    pub reduction: f64,
    pub sum_targets: f64,
    pub sum_sq_targets: f64,
    /// Rows whose logged reference score matched the computed prediction.
    pub agreement: u64,
    /// Loss per ensemble prefix length, when optimal-size mode was on.
    pub prefix_losses: Option<Vec<f64>>,
}

impl TestReport {
    pub fn avg_loss(&self) -> f64 {
        if self.n_examples == 0 {
            0.0
        } else {
            self.loss / self.n_examples as f64
        }
    }

    /// Prefix length with minimum loss; the recommended ensemble truncation.
    ///
    /// `None` unless optimal-size mode was active.
    pub fn optimal_num_trees(&self) -> Option<usize> {
        let losses = self.prefix_losses.as_ref()?;
        losses
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx + 1)
    }
}

/// Streams test rows through the decoder and scores them against a forest.
///
/// Single-threaded by design: rows are scored in strict input order because
/// the running accumulators and periodic progress reporting are
/// order-sensitive for reproducibility. One pipeline instance may consume
/// several readers; accumulators span all of them and are never reset.
pub struct EvalPipeline<'a, D> {
    forest: &'a Forest,
    decoder: &'a D,
    global: LeastSquaresLoss,
    /// One accumulator per ensemble prefix, sized at construction.
    prefix: Option<Vec<LeastSquaresLoss>>,
    sum_targets: f64,
    sum_sq_targets: f64,
    agreement: u64,
}

impl<'a, D: RowDecoder> EvalPipeline<'a, D> {
    /// With `find_optimal_num_trees`, one loss accumulator is created per
    /// ensemble prefix length `1..=n_trees`, fixed for the run.
    pub fn new(forest: &'a Forest, decoder: &'a D, find_optimal_num_trees: bool) -> Self {
        let prefix =
            find_optimal_num_trees.then(|| vec![LeastSquaresLoss::new(); forest.n_trees()]);
        Self {
            forest,
            decoder,
            global: LeastSquaresLoss::new(),
            prefix,
            sum_targets: 0.0,
            sum_sq_targets: 0.0,
            agreement: 0,
        }
    }

    /// Score every decodable row from one line source, in order.
    ///
    /// Rows the decoder rejects are skipped silently.
    pub fn process<R: BufRead>(&mut self, reader: R) -> io::Result<()> {
        for line in reader.lines() {
            if let Some(row) = self.decoder.decode_test(&line?) {
                self.score_row(&row);
            }
        }
        Ok(())
    }

    fn score_row(&mut self, row: &TestRow) {
        self.sum_targets += row.target;
        self.sum_sq_targets += row.target * row.target;

        let forest = self.forest;
        let prediction = match &mut self.prefix {
            Some(accumulators) => {
                // One traversal per tree; each prefix reuses the partial sum.
                let mut full = 0.0;
                for (prefix_len, partial) in forest.staged_predict(&row.features) {
                    accumulators[prefix_len - 1].accumulate(row.target, partial);
                    full = partial;
                }
                full
            }
            None => forest.predict(&row.features),
        };

        self.global.accumulate(row.target, prediction);
        if (row.reference_score - prediction).abs() <= AGREEMENT_TOLERANCE {
            self.agreement += 1;
        }

        if self.global.n_examples() % PROGRESS_INTERVAL == 0 {
            info!(
                examples = self.global.n_examples(),
                reduction = self.global.reduction(),
                loss = self.global.loss(),
                logged_score = row.reference_score,
                computed_score = prediction,
                "test progress"
            );
        }
    }

    /// Finish the run and emit the report.
    pub fn finish(self) -> TestReport {
        TestReport {
            n_examples: self.global.n_examples(),
            loss: self.global.loss(),
            reduction: self.global.reduction(),
            sum_targets: self.sum_targets,
            sum_sq_targets: self.sum_sq_targets,
            agreement: self.agreement,
            prefix_losses: self
                .prefix
                .map(|accs| accs.iter().map(LossFunction::loss).collect()),
        }
    }
}
