use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, AsRefStr};
use crate::parsers::expression_parser::{ExpressionMatrix, GeneID, SampleID};
use crate::analysis::differential_expression::AnalysisResult;

/// Smallest p-value plotted; `-log10(0)` is undefined.
pub const MIN_PLOTTED_P_VALUE: f64 = 1e-300;
pub const HEATMAP_TOP_GENES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GeneCategory {
    Significant,
    NotSignificant,
}

impl GeneCategory {
    pub fn from_flag(significant: bool) -> Self {
        if significant {
            GeneCategory::Significant
        } else {
            GeneCategory::NotSignificant
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            GeneCategory::Significant => "red",
            GeneCategory::NotSignificant => "gray",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolcanoPoint {
    pub gene: GeneID,
    pub log2fc: f64,
    pub neg_log10_p: f64,
    pub p_value: f64,
    pub adj_p_value: f64,
    pub category: GeneCategory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolcanoData {
    pub points: Vec<VolcanoPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeatmapData {
    pub genes: Vec<GeneID>,
    pub samples: Vec<SampleID>,
    pub values: Vec<Vec<f64>>,
}

impl HeatmapData {
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaPoint {
    pub gene: GeneID,
    pub mean_expression: f64,
    pub log2fc: f64,
    pub category: GeneCategory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaPlotData {
    pub points: Vec<MaPoint>,
}

pub fn neg_log10_p_value(p_value: f64) -> f64 {
    -p_value.max(MIN_PLOTTED_P_VALUE).log10()
}

pub fn volcano_data(result: &AnalysisResult) -> VolcanoData {
    let points = result
        .gene_results()
        .into_iter()
        .map(|gene| VolcanoPoint {
            neg_log10_p: neg_log10_p_value(gene.p_value),
            category: GeneCategory::from_flag(gene.significant),
            gene: gene.gene,
            log2fc: gene.log2fc,
            p_value: gene.p_value,
            adj_p_value: gene.adj_p_value,
        })
        .collect();

    VolcanoData { points }
}

/// Indices of the significant genes with the largest absolute fold change,
/// at most `HEATMAP_TOP_GENES`. Equal magnitudes keep matrix order.
pub fn top_significant_genes(result: &AnalysisResult) -> Vec<usize> {
    let mut significant_rows: Vec<usize> = result
        .significant
        .iter()
        .enumerate()
        .filter_map(|(index, &significant)| significant.then_some(index))
        .collect();

    significant_rows.sort_by(|&a, &b| {
        result.log2fc[b].abs().total_cmp(&result.log2fc[a].abs())
    });
    significant_rows.truncate(HEATMAP_TOP_GENES);
    significant_rows
}

pub fn heatmap_data(matrix: &ExpressionMatrix, result: &AnalysisResult) -> HeatmapData {
    let rows: Vec<usize> = top_significant_genes(result)
        .into_iter()
        .filter_map(|index| matrix.gene_index(&result.genes[index]))
        .collect();

    HeatmapData {
        genes: rows.iter().map(|&row| matrix.genes()[row].clone()).collect(),
        samples: matrix.samples().to_vec(),
        values: matrix.subset_rows(&rows),
    }
}

pub fn ma_plot_data(result: &AnalysisResult) -> MaPlotData {
    let points = result
        .gene_results()
        .into_iter()
        .map(|gene| MaPoint {
            category: GeneCategory::from_flag(gene.significant),
            gene: gene.gene,
            mean_expression: gene.mean_expression,
            log2fc: gene.log2fc,
        })
        .collect();

    MaPlotData { points }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::differential_expression::GeneResult;
    use ndarray::Array2;

    fn gene(name: &str, log2fc: f64, p_value: f64, significant: bool) -> GeneResult {
        GeneResult {
            gene: name.to_string(),
            log2fc,
            p_value,
            adj_p_value: p_value,
            significant,
            mean_expression: 2.0,
        }
    }

    fn matrix_for(result: &AnalysisResult) -> ExpressionMatrix {
        let n = result.len();
        let values = Array2::from_shape_fn((n, 2), |(row, col)| (row * 2 + col) as f64);
        ExpressionMatrix::new(
            result.genes.clone(),
            vec!["control".to_string(), "treatment".to_string()],
            values,
        )
        .unwrap()
    }

    #[test]
    fn volcano_clamps_zero_p_values() {
        let result = AnalysisResult::from_gene_results(vec![
            gene("A", 2.0, 0.0, true),
            gene("B", 0.1, 0.1, false),
        ]);
        let data = volcano_data(&result);

        assert_eq!(data.points.len(), 2);
        assert!((data.points[0].neg_log10_p - 300.0).abs() < 1e-9);
        assert!((data.points[1].neg_log10_p - 1.0).abs() < 1e-9);
        assert_eq!(data.points[0].category, GeneCategory::Significant);
        assert_eq!(data.points[1].category.color(), "gray");
    }

    #[test]
    fn heatmap_sorts_by_absolute_fold_change_with_stable_ties() {
        let result = AnalysisResult::from_gene_results(vec![
            gene("A", 1.5, 0.01, true),
            gene("B", -3.0, 0.01, true),
            gene("C", 0.2, 0.9, false),
            gene("D", 3.0, 0.01, true),
            gene("E", 2.0, 0.01, true),
        ]);
        let matrix = matrix_for(&result);
        let data = heatmap_data(&matrix, &result);

        assert_eq!(data.genes, vec!["B", "D", "E", "A"]);
        assert_eq!(data.samples, vec!["control", "treatment"]);
        assert_eq!(data.values[0], vec![2.0, 3.0]);
        assert_eq!(data.values[3], vec![0.0, 1.0]);
    }

    #[test]
    fn heatmap_keeps_at_most_fifty_genes() {
        let genes: Vec<GeneResult> = (0..80)
            .map(|i| gene(&format!("G{}", i), 1.0 + i as f64 / 10.0, 0.001, true))
            .collect();
        let result = AnalysisResult::from_gene_results(genes);
        let matrix = matrix_for(&result);

        let data = heatmap_data(&matrix, &result);
        assert_eq!(data.genes.len(), HEATMAP_TOP_GENES);
        assert_eq!(data.genes[0], "G79");

        let magnitudes: Vec<f64> = data
            .genes
            .iter()
            .map(|name| result.log2fc[matrix.gene_index(name).unwrap()].abs())
            .collect();
        assert!(magnitudes.windows(2).all(|pair| pair[0] >= pair[1]));

        assert_eq!(heatmap_data(&matrix, &result), data);
    }

    #[test]
    fn heatmap_is_empty_without_significant_genes() {
        let result = AnalysisResult::from_gene_results(vec![gene("A", 0.1, 0.5, false)]);
        let matrix = matrix_for(&result);
        assert!(heatmap_data(&matrix, &result).is_empty());
    }

    #[test]
    fn ma_plot_is_deterministic() {
        let result = AnalysisResult::from_gene_results(vec![
            gene("A", 2.0, 0.01, true),
            gene("B", -0.5, 0.4, false),
        ]);
        let first = ma_plot_data(&result);
        assert_eq!(first, ma_plot_data(&result));
        assert_eq!(first.points[0].mean_expression, 2.0);
        assert_eq!(first.points[1].log2fc, -0.5);
    }
}
