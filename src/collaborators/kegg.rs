use itertools::Itertools;
use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use crate::collaborators::client::{CollaboratorError, Collaborators};
use crate::collaborators::fallback::canonical_disease_name;

pub const DEFAULT_MAX_GENES: usize = 10;
pub const DEFAULT_MAX_PATHWAYS: usize = 5;
const SERVICE: &str = "KEGG";

lazy_static! {
    static ref FIND_LINE: Regex = Regex::new(r"^[^:\t]+:([^\t\s]+)\t").unwrap();
    static ref LINK_LINE: Regex = Regex::new(r"^[^\t]+\t[^:\t]+:(\S+)").unwrap();
}

const DISEASE_FAMILIES: &[(&str, [&str; 2])] = &[
    ("alzheimer", ["alzheimer", "alzheimer disease"]),
    ("diabetes", ["diabetes", "diabetes mellitus"]),
    ("cancer", ["cancer", "tumor"]),
    ("parkinson", ["parkinson", "parkinson disease"]),
];

/// Search terms tried in order: the name itself, its alias, then the terms
/// of the first disease family it belongs to.
pub fn search_terms(disease: &str) -> Vec<String> {
    let lowered = disease.trim().to_lowercase();
    let mut terms = vec![lowered.clone()];

    if let Some(canonical) = canonical_disease_name(&lowered) {
        terms.push(canonical.to_string());
    }
    if let Some((_, family)) = DISEASE_FAMILIES
        .iter()
        .find(|(family, _)| lowered.contains(family))
    {
        terms.extend(family.iter().map(|term| term.to_string()));
    }

    terms.into_iter().unique().collect()
}

/// Entry id of the first hit of a `find/disease` answer, e.g. `H00056`.
pub fn parse_first_entry(body: &str) -> Option<String> {
    body.lines()
        .next()
        .and_then(|line| FIND_LINE.captures(line))
        .map(|captures| captures[1].to_string())
}

/// Target ids of a `link` answer with their database prefix removed.
pub fn parse_link_targets(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| LINK_LINE.captures(line))
        .map(|captures| captures[1].to_string())
        .collect()
}

pub fn pathway_image_url(kegg_url: &str, pathway_id: &str) -> String {
    format!("{}/get/{}/image", kegg_url.trim_end_matches('/'), pathway_id)
}

impl Collaborators {
    pub async fn fetch_genes_for_disease(
        &self,
        disease: &str,
        max_genes: usize,
    ) -> Result<Vec<String>, CollaboratorError> {
        let mut last_error = None;

        for term in search_terms(disease) {
            debug!("Searching KEGG for: {}", term);
            let url = format!("{}/find/disease/{}", self.config.kegg_url, term);
            let entry = match self.get_text(SERVICE, &url, self.config.kegg_timeout).await {
                Ok(body) => parse_first_entry(&body),
                Err(e) => {
                    last_error = Some(e);
                    continue;
                }
            };
            let Some(entry) = entry else { continue };

            let url = format!("{}/link/hsa/{}", self.config.kegg_url, entry);
            match self.get_text(SERVICE, &url, self.config.kegg_timeout).await {
                Ok(body) => {
                    let mut genes = parse_link_targets(&body);
                    if !genes.is_empty() {
                        info!("Found {} KEGG genes for {}", genes.len(), term);
                        genes.truncate(max_genes);
                        return Ok(genes);
                    }
                }
                Err(e) => last_error = Some(e),
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(Vec::new()),
        }
    }

    pub async fn fetch_pathways(
        &self,
        genes: &[String],
        max_paths: usize,
    ) -> Result<Vec<String>, CollaboratorError> {
        let mut pathways: Vec<String> = Vec::new();
        let mut last_error = None;

        for gene in genes {
            let url = format!("{}/link/pathway/hsa:{}", self.config.kegg_url, gene);
            let body = match self.get_text(SERVICE, &url, self.config.kegg_timeout).await {
                Ok(body) => body,
                Err(e) => {
                    last_error = Some(e);
                    continue;
                }
            };

            for pathway in parse_link_targets(&body) {
                if !pathways.contains(&pathway) {
                    pathways.push(pathway);
                }
                if pathways.len() >= max_paths {
                    return Ok(pathways);
                }
            }
        }

        match (pathways.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            _ => Ok(pathways),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::client::CollaboratorConfig;

    #[test]
    fn search_terms_include_aliases_and_family() {
        assert_eq!(
            search_terms("Alzheimer's disease"),
            vec!["alzheimer's disease", "alzheimer", "alzheimer disease"]
        );
        assert_eq!(search_terms("Lung Cancer"), vec!["lung cancer", "cancer", "tumor"]);
        assert_eq!(search_terms("asthma"), vec!["asthma"]);
    }

    #[test]
    fn parses_find_and_link_answers() {
        let find = "ds:H00056\tAlzheimer disease\nds:H00057\tOther\n";
        assert_eq!(parse_first_entry(find), Some("H00056".to_string()));
        assert_eq!(parse_first_entry("no tab here"), None);

        let link = "ds:H00056\thsa:351\nds:H00056\thsa:5663\n\n";
        assert_eq!(parse_link_targets(link), vec!["351", "5663"]);

        let pathways = "hsa:351\tpath:hsa05010\nhsa:351\tpath:hsa04726\n";
        assert_eq!(parse_link_targets(pathways), vec!["hsa05010", "hsa04726"]);
    }

    #[test]
    fn image_url_points_at_kegg_get() {
        assert_eq!(
            pathway_image_url("http://rest.kegg.jp/", "hsa05010"),
            "http://rest.kegg.jp/get/hsa05010/image"
        );
    }

    #[tokio::test]
    async fn unreachable_kegg_is_an_error() {
        let collaborators = Collaborators::new(CollaboratorConfig::with_base_url("http://127.0.0.1:9"));
        assert!(collaborators.fetch_genes_for_disease("asthma", DEFAULT_MAX_GENES).await.is_err());
        assert!(collaborators.fetch_pathways(&["351".to_string()], DEFAULT_MAX_PATHWAYS).await.is_err());
        assert!(collaborators.fetch_pathways(&[], DEFAULT_MAX_PATHWAYS).await.unwrap().is_empty());
    }
}
