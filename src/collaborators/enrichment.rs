use serde::{Deserialize, Serialize};
use crate::collaborators::client::{CollaboratorError, Collaborators};

pub const DEFAULT_MAX_TERMS: usize = 10;
const SERVICE: &str = "g:Profiler";

/// One enriched GO or Reactome term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentTerm {
    pub term: String,
    pub p_value: f64,
}

#[derive(Debug, Serialize)]
struct GostRequest<'a> {
    organism: &'a str,
    query: &'a [String],
    sources: [&'a str; 2],
    user_threshold: f64,
    all_results: bool,
    ordered: bool,
    no_iea: bool,
    no_evidences: bool,
    domain_scope: &'a str,
}

#[derive(Debug, Deserialize)]
struct GostResponse {
    result: Option<Vec<GostTerm>>,
}

#[derive(Debug, Deserialize)]
struct GostTerm {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    p_value: Option<f64>,
    #[serde(default)]
    source: Option<String>,
}

impl GostTerm {
    fn into_enrichment_term(self) -> EnrichmentTerm {
        let name = self.name.unwrap_or_else(|| "Unknown".to_string());
        let term = match self.source.as_deref() {
            Some("GO:BP") => format!("GO:{}", name),
            Some("REAC") => format!("Reactome:{}", name),
            _ => name,
        };
        EnrichmentTerm {
            term,
            p_value: self.p_value.unwrap_or(1.0),
        }
    }
}

/// Sorts by ascending p-value and keeps the best `max_terms`.
pub fn top_terms(mut terms: Vec<EnrichmentTerm>, max_terms: usize) -> Vec<EnrichmentTerm> {
    terms.sort_by(|a, b| a.p_value.total_cmp(&b.p_value));
    terms.truncate(max_terms);
    terms
}

impl Collaborators {
    pub async fn run_enrichment(
        &self,
        genes: &[String],
        max_terms: usize,
    ) -> Result<Vec<EnrichmentTerm>, CollaboratorError> {
        if genes.is_empty() {
            return Ok(Vec::new());
        }

        let request = GostRequest {
            organism: "hsapiens",
            query: genes,
            sources: ["GO:BP", "REAC"],
            user_threshold: 0.05,
            all_results: false,
            ordered: true,
            no_iea: false,
            no_evidences: false,
            domain_scope: "annotated",
        };

        let response = self.http
            .post(&self.config.gprofiler_url)
            .json(&request)
            .timeout(self.config.gprofiler_timeout)
            .send()
            .await
            .map_err(CollaboratorError::request(SERVICE))?;

        if !response.status().is_success() {
            return Err(CollaboratorError::Status {
                service: SERVICE,
                status: response.status().as_u16(),
            });
        }

        let body: GostResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Malformed {
                service: SERVICE,
                reason: e.to_string(),
            })?;

        let terms = body
            .result
            .ok_or(CollaboratorError::EmptyResponse { service: SERVICE })?
            .into_iter()
            .map(GostTerm::into_enrichment_term)
            .collect();

        Ok(top_terms(terms, max_terms))
    }
}
