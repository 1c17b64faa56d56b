use std::fs::File;
use std::io::Read;
use std::path::Path;
use csv::{ReaderBuilder, Trim};
use ndarray::{Array2, ArrayView1, Axis};
use rustc_hash::{FxHashMap, FxHashSet};
use crate::analysis::differential_expression::AnalysisError;

pub type GeneID = String;
pub type SampleID = String;

/// Genes × samples table of expression values.
///
/// Rows keep the order of the input file, so every downstream result that
/// is indexed by gene position can be mapped back to `genes()`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionMatrix {
    genes: Vec<GeneID>,
    samples: Vec<SampleID>,
    values: Array2<f64>,
    gene_index: FxHashMap<GeneID, usize>,
}

impl ExpressionMatrix {
    pub fn new(
        genes: Vec<GeneID>,
        samples: Vec<SampleID>,
        values: Array2<f64>,
    ) -> Result<Self, AnalysisError> {
        if samples.is_empty() {
            return Err(AnalysisError::NoSamples);
        }
        if genes.is_empty() {
            return Err(AnalysisError::EmptyMatrix);
        }
        if values.nrows() != genes.len() || values.ncols() != samples.len() {
            return Err(AnalysisError::ShapeMismatch {
                rows: values.nrows(),
                cols: values.ncols(),
                genes: genes.len(),
                samples: samples.len(),
            });
        }

        let mut seen_samples: FxHashSet<&str> = FxHashSet::default();
        for sample in &samples {
            if !seen_samples.insert(sample.as_str()) {
                return Err(AnalysisError::DuplicateSample(sample.clone()));
            }
        }

        let mut gene_index = FxHashMap::with_capacity_and_hasher(
            genes.len(),
            rustc_hash::FxBuildHasher::default()
        );
        for (row, gene) in genes.iter().enumerate() {
            if gene_index.insert(gene.clone(), row).is_some() {
                return Err(AnalysisError::DuplicateGene(gene.clone()));
            }
        }

        if let Some(((row, col), value)) = values
            .indexed_iter()
            .find(|(_, value)| !value.is_finite())
        {
            return Err(AnalysisError::InvalidValue {
                gene: genes[row].clone(),
                sample: samples[col].clone(),
                value: value.to_string(),
            });
        }

        Ok(Self { genes, samples, values, gene_index })
    }

    /// Reads a CSV table: a header of sample names (the first header cell
    /// labels the gene column and is ignored), then one row per gene.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, AnalysisError> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let header = csv_reader.headers()?.clone();
        if header.is_empty() {
            return Err(AnalysisError::EmptyMatrix);
        }

        let samples: Vec<SampleID> = header
            .iter()
            .skip(1)
            .map(|sample| sample.to_string())
            .collect();
        if samples.is_empty() {
            return Err(AnalysisError::NoSamples);
        }

        let mut genes: Vec<GeneID> = Vec::new();
        let mut flat_values: Vec<f64> = Vec::new();

        for result in csv_reader.records() {
            let record = result?;
            if record.iter().all(|cell| cell.is_empty()) {
                continue;
            }

            let gene = record.get(0).unwrap_or_default().to_string();
            if record.len() != header.len() {
                return Err(AnalysisError::RaggedRow {
                    gene,
                    expected: samples.len(),
                    found: record.len().saturating_sub(1),
                });
            }

            for (sample, cell) in samples.iter().zip(record.iter().skip(1)) {
                let value = cell.parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .ok_or_else(|| AnalysisError::InvalidValue {
                        gene: gene.clone(),
                        sample: sample.clone(),
                        value: cell.to_string(),
                    })?;
                flat_values.push(value);
            }
            genes.push(gene);
        }

        if genes.is_empty() {
            return Err(AnalysisError::EmptyMatrix);
        }

        let values = Array2::from_shape_vec((genes.len(), samples.len()), flat_values)
            .map_err(|e| AnalysisError::Malformed(e.to_string()))?;

        Self::new(genes, samples, values)
    }

    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, AnalysisError> {
        Self::from_reader(bytes)
    }

    pub fn genes(&self) -> &[GeneID] {
        &self.genes
    }

    pub fn samples(&self) -> &[SampleID] {
        &self.samples
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.values.row(index)
    }

    pub fn gene_index(&self, gene: &str) -> Option<usize> {
        self.gene_index.get(gene).copied()
    }

    /// Rows in the requested order, every sample column kept.
    pub fn subset_rows(&self, rows: &[usize]) -> Vec<Vec<f64>> {
        self.values
            .select(Axis(0), rows)
            .outer_iter()
            .map(|row| row.to_vec())
            .collect()
    }
}

pub fn read_expression_matrix(
    csv_file: impl AsRef<Path>
) -> Result<ExpressionMatrix, AnalysisError> {
    let file = File::open(csv_file)?;
    ExpressionMatrix::from_reader(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_header_and_rows_in_order() {
        let csv = "gene,c1,c2,t1,t2\nTP53,1.0,2.0,3.0,4.0\nAPOE, 5 ,6,7,8\n";
        let matrix = ExpressionMatrix::from_csv_bytes(csv.as_bytes()).unwrap();

        assert_eq!(matrix.genes(), &["TP53".to_string(), "APOE".to_string()]);
        assert_eq!(matrix.samples().len(), 4);
        assert_eq!(matrix.row(1).to_vec(), vec![5.0, 6.0, 7.0, 8.0]);
        assert_eq!(matrix.gene_index("APOE"), Some(1));
        assert_eq!(matrix.subset_rows(&[1, 0])[1], vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn rejects_non_numeric_cells() {
        let csv = "gene,a,b\nTP53,1.0,high\n";
        match ExpressionMatrix::from_csv_bytes(csv.as_bytes()) {
            Err(AnalysisError::InvalidValue { gene, sample, value }) => {
                assert_eq!(gene, "TP53");
                assert_eq!(sample, "b");
                assert_eq!(value, "high");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn rejects_nan_cells() {
        let csv = "gene,a,b\nTP53,1.0,NaN\n";
        assert!(matches!(
            ExpressionMatrix::from_csv_bytes(csv.as_bytes()),
            Err(AnalysisError::InvalidValue { .. })
        ));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(
            ExpressionMatrix::from_csv_bytes(b""),
            Err(AnalysisError::EmptyMatrix)
        ));
        assert!(matches!(
            ExpressionMatrix::from_csv_bytes(b"gene,a,b\n"),
            Err(AnalysisError::EmptyMatrix)
        ));
        assert!(matches!(
            ExpressionMatrix::from_csv_bytes(b"gene\nTP53\n"),
            Err(AnalysisError::NoSamples)
        ));
    }

    #[test]
    fn rejects_ragged_rows_and_duplicates() {
        let ragged = "gene,a,b\nTP53,1.0\n";
        assert!(matches!(
            ExpressionMatrix::from_csv_bytes(ragged.as_bytes()),
            Err(AnalysisError::RaggedRow { expected: 2, found: 1, .. })
        ));

        let duplicated = "gene,a,b\nTP53,1,2\nTP53,3,4\n";
        assert!(matches!(
            ExpressionMatrix::from_csv_bytes(duplicated.as_bytes()),
            Err(AnalysisError::DuplicateGene(gene)) if gene == "TP53"
        ));

        let duplicated_samples = "gene,a,a\nTP53,1,2\n";
        assert!(matches!(
            ExpressionMatrix::from_csv_bytes(duplicated_samples.as_bytes()),
            Err(AnalysisError::DuplicateSample(_))
        ));
    }

    #[test]
    fn reads_matrix_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "gene,s1,s2").unwrap();
        writeln!(file, "BRCA1,0.5,1.5").unwrap();
        let matrix = read_expression_matrix(file.path()).unwrap();
        assert_eq!(matrix.n_genes(), 1);
        assert_eq!(matrix.n_samples(), 2);
    }
}
