use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::analysis::chart_data::{
    heatmap_data, ma_plot_data, volcano_data, HeatmapData, MaPlotData, VolcanoData,
};
use crate::analysis::differential_expression::{
    differential_expression_analysis, AnalysisError, AnalysisResult,
};
use crate::analysis::expression_plots::{
    enrichment_bar_plot, figure_json, heatmap_plot, ma_plot, volcano_plot,
};
use crate::collaborators::client::{with_fallback, Collaborators};
use crate::collaborators::drug_targets::{predict_drug_targets, DEFAULT_TOP_TARGETS};
use crate::collaborators::enrichment::{EnrichmentTerm, DEFAULT_MAX_TERMS};
use crate::collaborators::fallback::{
    fallback_enrichment, fallback_genes, fallback_network, fallback_pathways,
    EXPLANATION_UNAVAILABLE,
};
use crate::collaborators::kegg::{pathway_image_url, DEFAULT_MAX_GENES, DEFAULT_MAX_PATHWAYS};
use crate::collaborators::string_network::{
    cytoscape_config, network_report, InteractionNetwork, NetworkReport,
};
use crate::parsers::expression_parser::ExpressionMatrix;

/// How many genes, pathways, terms and drug targets a report keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLimits {
    pub max_genes: usize,
    pub max_pathways: usize,
    pub max_terms: usize,
    pub max_drug_targets: usize,
}

impl Default for ReportLimits {
    fn default() -> Self {
        Self {
            max_genes: DEFAULT_MAX_GENES,
            max_pathways: DEFAULT_MAX_PATHWAYS,
            max_terms: DEFAULT_MAX_TERMS,
            max_drug_targets: DEFAULT_TOP_TARGETS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneSource {
    Expression,
    #[default]
    Kegg,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionFigures {
    pub volcano: Value,
    pub heatmap: Value,
    pub ma_plot: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionCharts {
    pub volcano: VolcanoData,
    pub heatmap: HeatmapData,
    pub ma_plot: MaPlotData,
    pub figures: ExpressionFigures,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkView {
    pub network: InteractionNetwork,
    pub cytoscape: Value,
    pub report: NetworkReport,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentView {
    pub terms: Vec<EnrichmentTerm>,
    pub figure: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiseaseReport {
    pub disease: String,
    pub genes: Vec<String>,
    pub gene_source: GeneSource,
    pub analysis: Option<AnalysisResult>,
    pub charts: Option<ExpressionCharts>,
    pub analysis_error: Option<String>,
    pub pathways: Vec<String>,
    pub pathway_images: Vec<String>,
    pub enrichment: EnrichmentView,
    pub network: NetworkView,
    pub explanation: String,
    pub drug_targets: Vec<String>,
}

pub fn expression_charts(matrix: &ExpressionMatrix, result: &AnalysisResult) -> ExpressionCharts {
    let volcano = volcano_data(result);
    let heatmap = heatmap_data(matrix, result);
    let ma_points = ma_plot_data(result);

    let figures = ExpressionFigures {
        volcano: figure_json(&volcano_plot(&volcano)),
        heatmap: if heatmap.is_empty() {
            Value::Null
        } else {
            figure_json(&heatmap_plot(&heatmap))
        },
        ma_plot: figure_json(&ma_plot(&ma_points)),
    };

    ExpressionCharts {
        volcano,
        heatmap,
        ma_plot: ma_points,
        figures,
    }
}

/// Parses an uploaded matrix and runs the differential expression analysis.
pub fn analyze_expression_csv(
    csv_bytes: &[u8],
) -> Result<(AnalysisResult, ExpressionCharts), AnalysisError> {
    let matrix = ExpressionMatrix::from_csv_bytes(csv_bytes)?;
    let result = differential_expression_analysis(&matrix)?;
    let charts = expression_charts(&matrix, &result);
    Ok((result, charts))
}

/// Runs `analyze_expression_csv` on the blocking thread pool so large
/// matrices do not hold up the async workers.
pub async fn analyze_expression_csv_blocking(
    csv_bytes: Vec<u8>,
) -> Result<(AnalysisResult, ExpressionCharts), AnalysisError> {
    tokio::task::spawn_blocking(move || analyze_expression_csv(&csv_bytes))
        .await
        .map_err(|e| AnalysisError::Interrupted(e.to_string()))?
}

pub fn enrichment_view(terms: Vec<EnrichmentTerm>) -> EnrichmentView {
    let figure = if terms.is_empty() {
        Value::Null
    } else {
        figure_json(&enrichment_bar_plot(&terms))
    };
    EnrichmentView { terms, figure }
}

pub fn network_view(network: InteractionNetwork, genes: &[String]) -> NetworkView {
    NetworkView {
        cytoscape: cytoscape_config(&network),
        report: network_report(&network, genes),
        network,
    }
}

/// Assembles disease reports from an optional expression matrix and the
/// external collaborators.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    collaborators: Collaborators,
}

impl ReportBuilder {
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub async fn disease_genes(&self, disease: &str, max_genes: usize) -> Vec<String> {
        let fetched = self.collaborators.fetch_genes_for_disease(disease, max_genes).await;
        with_fallback(fetched, "KEGG genes", || fallback_genes(disease, max_genes))
    }

    pub async fn pathways(&self, disease: &str, genes: &[String], max_pathways: usize) -> Vec<String> {
        let fetched = self.collaborators.fetch_pathways(genes, max_pathways).await;
        with_fallback(fetched, "KEGG pathways", || {
            fallback_pathways(Some(disease), max_pathways)
        })
    }

    pub async fn enrichment(&self, genes: &[String], max_terms: usize) -> EnrichmentView {
        let fetched = self.collaborators.run_enrichment(genes, max_terms).await;
        let terms = with_fallback(fetched, "enrichment terms", || fallback_enrichment(max_terms));
        enrichment_view(terms)
    }

    pub async fn network(&self, genes: &[String]) -> NetworkView {
        let network = match self.collaborators.fetch_interaction_network(genes).await {
            Ok(network) if !network.is_empty() || genes.len() < 2 => network,
            Ok(_) => {
                warn!("STRING returned no interactions, using fallback network");
                fallback_network(genes)
            }
            Err(e) => {
                warn!("Could not fetch interaction network: {}. Using fallback network", e);
                fallback_network(genes)
            }
        };
        network_view(network, genes)
    }

    pub async fn explanation(&self, disease: &str, genes: &[String], pathways: &[String]) -> String {
        let fetched = self.collaborators.explain_disease(disease, genes, pathways).await;
        with_fallback(fetched, "AI explanation", || EXPLANATION_UNAVAILABLE.to_string())
    }

    pub async fn run(
        &self,
        disease: &str,
        csv_bytes: Option<&[u8]>,
        limits: &ReportLimits,
    ) -> DiseaseReport {
        let mut report = DiseaseReport {
            disease: disease.to_string(),
            ..DiseaseReport::default()
        };

        if let Some(bytes) = csv_bytes {
            match analyze_expression_csv_blocking(bytes.to_vec()).await {
                Ok((result, charts)) => {
                    info!(
                        "Expression analysis found {} significant genes out of {}",
                        result.significant_genes.len(),
                        result.len()
                    );
                    report.genes = result.significant_genes.clone();
                    report.analysis = Some(result);
                    report.charts = Some(charts);
                }
                Err(e) => {
                    warn!("Expression analysis failed: {}", e);
                    report.analysis_error = Some(e.to_string());
                }
            }
        }

        if report.genes.is_empty() {
            report.genes = self.disease_genes(disease, limits.max_genes).await;
            report.gene_source = GeneSource::Kegg;
        } else {
            report.gene_source = GeneSource::Expression;
        }

        report.pathways = self.pathways(disease, &report.genes, limits.max_pathways).await;
        report.pathway_images = report
            .pathways
            .iter()
            .map(|pathway| pathway_image_url(&self.collaborators.config.kegg_url, pathway))
            .collect();

        report.enrichment = self.enrichment(&report.genes, limits.max_terms).await;
        report.network = self.network(&report.genes).await;
        report.explanation = self.explanation(disease, &report.genes, &report.pathways).await;
        report.drug_targets = predict_drug_targets(&report.genes, limits.max_drug_targets);

        report
    }
}
