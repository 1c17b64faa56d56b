use std::io::Write;
use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use crate::analysis::differential_expression::AnalysisResult;

pub const EXPORT_HEADER: [&str; 5] = [
    "Gene",
    "log2 Fold Change",
    "p-value",
    "Adjusted p-value",
    "Significant",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExportFormat {
    Csv,
    Tsv,
    Json,
}

impl Default for ExportFormat {
    fn default() -> Self {
        ExportFormat::Csv
    }
}

pub struct DownloadManager {
    disease_name: String,
}

impl DownloadManager {
    pub fn new(disease_name: &str) -> Self {
        Self {
            disease_name: disease_name.to_string(),
        }
    }

    /// Disease name reduced to characters safe in a file name.
    pub fn base_filename(&self) -> String {
        let cleaned: String = self
            .disease_name
            .trim()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let cleaned = cleaned.trim_matches('_');

        if cleaned.is_empty() {
            "differential_expression".to_string()
        } else {
            format!("{}_differential_expression", cleaned)
        }
    }

    pub fn generate_file_content(
        &self,
        result: &AnalysisResult,
        format: ExportFormat,
    ) -> Result<(String, Vec<u8>)> {
        let output_filename = format!("{}.{}", self.base_filename(), format);

        match format {
            ExportFormat::Csv => {
                let mut wtr = WriterBuilder::new()
                    .has_headers(false)
                    .from_writer(vec![]);

                wtr.write_record(EXPORT_HEADER)?;
                for gene in result.gene_results() {
                    wtr.write_record(&[
                        gene.gene,
                        format!("{:.3}", gene.log2fc),
                        gene.p_value.to_string(),
                        gene.adj_p_value.to_string(),
                        gene.significant.to_string(),
                    ])?;
                }

                let content = wtr.into_inner().context("Failed to flush CSV export")?;
                Ok((output_filename, content))
            }
            ExportFormat::Tsv => {
                let mut content = Vec::new();

                writeln!(content, "{}", EXPORT_HEADER.join("\t"))?;
                for gene in result.gene_results() {
                    writeln!(content, "{}\t{:.3}\t{}\t{}\t{}",
                        gene.gene,
                        gene.log2fc,
                        gene.p_value,
                        gene.adj_p_value,
                        gene.significant)?;
                }

                Ok((output_filename, content))
            }
            ExportFormat::Json => {
                let content = serde_json::to_vec_pretty(result)?;
                Ok((output_filename, content))
            }
        }
    }
}
