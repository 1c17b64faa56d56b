use std::ops::Range;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;
use thiserror::Error;
use log::debug;
use crate::parsers::expression_parser::{ExpressionMatrix, GeneID};
use crate::analysis::multiple_testing_correction::adjust_gene_p_values;

/// A gene must change by more than this many log2 units to be significant.
pub const LOG2FC_THRESHOLD: f64 = 1.0;
/// Adjusted p-values must fall strictly below this to be significant.
pub const ADJ_P_VALUE_THRESHOLD: f64 = 0.05;
/// P-value assigned when the t-test cannot be computed for a gene.
pub const DEGENERATE_P_VALUE: f64 = 1.0;
/// Bound for infinite fold changes, e.g. a gene silenced in treatment.
/// `log2` of the smallest positive `f64`, so every finite ratio stays inside it.
pub const LOG2FC_LIMIT: f64 = 1074.0;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Expression matrix is empty")]
    EmptyMatrix,

    #[error("Expression matrix has no sample columns")]
    NoSamples,

    #[error("Expression matrix needs at least 2 sample columns, found {0}")]
    TooFewSamples(usize),

    #[error("Row for gene '{gene}' has {found} values, expected {expected}")]
    RaggedRow { gene: String, expected: usize, found: usize },

    #[error("Invalid expression value '{value}' for gene '{gene}' in sample '{sample}'")]
    InvalidValue { gene: String, sample: String, value: String },

    #[error("Duplicate gene identifier: {0}")]
    DuplicateGene(String),

    #[error("Duplicate sample identifier: {0}")]
    DuplicateSample(String),

    #[error("Matrix of {rows}x{cols} values does not match {genes} genes and {samples} samples")]
    ShapeMismatch { rows: usize, cols: usize, genes: usize, samples: usize },

    #[error("Malformed expression matrix: {0}")]
    Malformed(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Expression analysis was interrupted: {0}")]
    Interrupted(String),
}

/// Control and treatment columns, split by position only: the first half
/// of the samples (rounded down) is control, the rest is treatment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleGrouping {
    pub control: Range<usize>,
    pub treatment: Range<usize>,
}

impl SampleGrouping {
    pub fn by_position(n_samples: usize) -> Self {
        let n_control = n_samples / 2;
        Self {
            control: 0..n_control,
            treatment: n_control..n_samples,
        }
    }

    pub fn control_size(&self) -> usize {
        self.control.len()
    }

    pub fn treatment_size(&self) -> usize {
        self.treatment.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneResult {
    pub gene: GeneID,
    pub log2fc: f64,
    pub p_value: f64,
    pub adj_p_value: f64,
    pub significant: bool,
    pub mean_expression: f64,
}

/// Column-oriented result of one analysis run. `genes`, `log2fc`,
/// `p_values`, `adj_p_values`, `significant` and `mean_expression` are
/// index-aligned with the rows of the analysed matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub genes: Vec<GeneID>,
    pub log2fc: Vec<f64>,
    pub p_values: Vec<f64>,
    pub adj_p_values: Vec<f64>,
    pub significant: Vec<bool>,
    pub significant_genes: Vec<GeneID>,
    #[serde(default)]
    pub mean_expression: Vec<f64>,
}

impl AnalysisResult {
    pub fn from_gene_results(gene_results: Vec<GeneResult>) -> Self {
        let mut result = AnalysisResult::default();
        for gene_result in gene_results {
            if gene_result.significant {
                result.significant_genes.push(gene_result.gene.clone());
            }
            result.genes.push(gene_result.gene);
            result.log2fc.push(gene_result.log2fc);
            result.p_values.push(gene_result.p_value);
            result.adj_p_values.push(gene_result.adj_p_value);
            result.significant.push(gene_result.significant);
            result.mean_expression.push(gene_result.mean_expression);
        }
        result
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn gene_result(&self, index: usize) -> Option<GeneResult> {
        Some(GeneResult {
            gene: self.genes.get(index)?.clone(),
            log2fc: *self.log2fc.get(index)?,
            p_value: *self.p_values.get(index)?,
            adj_p_value: *self.adj_p_values.get(index)?,
            significant: *self.significant.get(index)?,
            mean_expression: self.mean_expression.get(index).copied().unwrap_or(f64::NAN),
        })
    }

    pub fn gene_results(&self) -> Vec<GeneResult> {
        (0..self.len())
            .filter_map(|index| self.gene_result(index))
            .collect()
    }
}

pub fn is_significant(log2fc: f64, adj_p_value: f64) -> bool {
    log2fc.abs() > LOG2FC_THRESHOLD && adj_p_value < ADJ_P_VALUE_THRESHOLD
}

/// `log2(treatment / control)`, or 0 when the control mean is not positive.
/// Genes without control expression are therefore never called significant.
/// Infinite values are clamped to `LOG2FC_LIMIT` and keep their sign; an
/// undefined ratio (negative treatment mean) gives 0.
pub fn log2_fold_change(control_mean: f64, treatment_mean: f64) -> f64 {
    if control_mean > 0.0 {
        let log2fc = (treatment_mean / control_mean).log2();
        if log2fc.is_nan() {
            0.0
        } else {
            log2fc.clamp(-LOG2FC_LIMIT, LOG2FC_LIMIT)
        }
    } else {
        0.0
    }
}

fn sum_of_squares(values: &[f64], mean: f64) -> f64 {
    values.iter().map(|value| (value - mean).powi(2)).sum()
}

/// Two-sided p-value of Student's t-test with pooled variance.
/// `None` when the statistic is undefined for these samples.
pub fn students_t_test(control: &[f64], treatment: &[f64]) -> Option<f64> {
    let n_control = control.len() as f64;
    let n_treatment = treatment.len() as f64;
    let degrees_of_freedom = n_control + n_treatment - 2.0;
    if control.is_empty() || treatment.is_empty() || degrees_of_freedom < 1.0 {
        return None;
    }

    let control_mean = control.iter().mean();
    let treatment_mean = treatment.iter().mean();

    let pooled_variance = (sum_of_squares(control, control_mean)
        + sum_of_squares(treatment, treatment_mean))
        / degrees_of_freedom;
    if !(pooled_variance > 0.0) || !pooled_variance.is_finite() {
        return None;
    }

    let standard_error = (pooled_variance * (1.0 / n_control + 1.0 / n_treatment)).sqrt();
    let t_statistic = (control_mean - treatment_mean) / standard_error;
    if !t_statistic.is_finite() {
        return None;
    }
    if t_statistic == 0.0 {
        return Some(1.0);
    }

    let distribution = StudentsT::new(0.0, 1.0, degrees_of_freedom).ok()?;
    let p_value = 2.0 * distribution.sf(t_statistic.abs());

    if p_value.is_finite() {
        Some(p_value.clamp(0.0, 1.0))
    } else {
        None
    }
}

pub fn t_test_p_value(control: &[f64], treatment: &[f64]) -> f64 {
    students_t_test(control, treatment).unwrap_or(DEGENERATE_P_VALUE)
}

struct GeneStatistics {
    log2fc: f64,
    p_value: f64,
    mean_expression: f64,
}

pub struct DifferentialExpression {
    pub grouping: SampleGrouping,
}

impl DifferentialExpression {
    pub fn new(n_samples: usize) -> Result<Self, AnalysisError> {
        if n_samples == 0 {
            return Err(AnalysisError::NoSamples);
        }
        if n_samples < 2 {
            return Err(AnalysisError::TooFewSamples(n_samples));
        }
        Ok(Self { grouping: SampleGrouping::by_position(n_samples) })
    }

    pub fn analyze(
        &self,
        matrix: &ExpressionMatrix
    ) -> Result<AnalysisResult, AnalysisError> {
        if matrix.n_genes() == 0 {
            return Err(AnalysisError::EmptyMatrix);
        }
        if matrix.n_samples() != self.grouping.treatment.end {
            return Err(AnalysisError::ShapeMismatch {
                rows: matrix.n_genes(),
                cols: matrix.n_samples(),
                genes: matrix.n_genes(),
                samples: self.grouping.treatment.end,
            });
        }

        let statistics: Vec<GeneStatistics> = (0..matrix.n_genes())
            .map(|row| self.analyze_single_gene(&matrix.row(row).to_vec()))
            .collect();

        let raw_p_values: Vec<f64> = statistics
            .iter()
            .map(|stats| stats.p_value)
            .collect();
        let adjusted_p_values = adjust_gene_p_values(&raw_p_values);

        let gene_results: Vec<GeneResult> = matrix
            .genes()
            .iter()
            .zip(statistics)
            .zip(adjusted_p_values)
            .map(|((gene, stats), adj_p_value)| GeneResult {
                gene: gene.clone(),
                log2fc: stats.log2fc,
                p_value: stats.p_value,
                adj_p_value,
                significant: is_significant(stats.log2fc, adj_p_value),
                mean_expression: stats.mean_expression,
            })
            .collect();

        let result = AnalysisResult::from_gene_results(gene_results);
        debug!(
            "Analysed {} genes ({} control / {} treatment samples), {} significant",
            result.len(),
            self.grouping.control_size(),
            self.grouping.treatment_size(),
            result.significant_genes.len()
        );
        Ok(result)
    }

    fn analyze_single_gene(&self, row: &[f64]) -> GeneStatistics {
        let control = &row[self.grouping.control.clone()];
        let treatment = &row[self.grouping.treatment.clone()];

        let control_mean = control.iter().mean();
        let treatment_mean = treatment.iter().mean();

        GeneStatistics {
            log2fc: log2_fold_change(control_mean, treatment_mean),
            p_value: t_test_p_value(control, treatment),
            mean_expression: row.iter().mean(),
        }
    }
}

pub fn differential_expression_analysis(
    matrix: &ExpressionMatrix
) -> Result<AnalysisResult, AnalysisError> {
    DifferentialExpression::new(matrix.n_samples())?.analyze(matrix)
}
