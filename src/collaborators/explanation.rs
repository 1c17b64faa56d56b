use serde::{Deserialize, Serialize};
use crate::collaborators::client::{CollaboratorError, Collaborators};

const SERVICE: &str = "Gemini";

pub fn explanation_prompt(disease: &str, genes: &[String], pathways: &[String]) -> String {
    let first_five = |items: &[String]| {
        items.iter().take(5).map(String::as_str).collect::<Vec<_>>().join(", ")
    };
    format!(
        "Explain the disease '{}' in simple terms, mentioning these genes: {}. Also mention pathways: {}.",
        disease,
        first_five(genes),
        first_five(pathways)
    )
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    fn text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

impl Collaborators {
    pub async fn explain_disease(
        &self,
        disease: &str,
        genes: &[String],
        pathways: &[String],
    ) -> Result<String, CollaboratorError> {
        let api_key = self
            .config
            .gemini_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(CollaboratorError::NotConfigured { service: SERVICE })?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.gemini_url, self.config.gemini_model
        );
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: explanation_prompt(disease, genes, pathways),
                }],
            }],
        };

        let response = self.http
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .timeout(self.config.gemini_timeout)
            .send()
            .await
            .map_err(CollaboratorError::request(SERVICE))?;

        if !response.status().is_success() {
            return Err(CollaboratorError::Status {
                service: SERVICE,
                status: response.status().as_u16(),
            });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Malformed {
                service: SERVICE,
                reason: e.to_string(),
            })?;

        body.text()
            .ok_or(CollaboratorError::EmptyResponse { service: SERVICE })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::client::CollaboratorConfig;

    #[test]
    fn prompt_names_first_five_genes_and_pathways() {
        let genes: Vec<String> = (1..=7).map(|i| format!("G{}", i)).collect();
        let pathways = vec!["hsa05010".to_string()];
        let prompt = explanation_prompt("Alzheimer", &genes, &pathways);

        assert!(prompt.contains("'Alzheimer'"));
        assert!(prompt.contains("G1, G2, G3, G4, G5."));
        assert!(!prompt.contains("G6"));
        assert!(prompt.ends_with("pathways: hsa05010."));
    }

    #[test]
    fn extracts_candidate_text() {
        let raw = r#"{"candidates": [{"content": {"parts": [{"text": " Alzheimer is "}, {"text": "a disease. "}]}}]}"#;
        let response: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.text(), Some("Alzheimer is a disease.".to_string()));

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert_eq!(empty.text(), None);
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let collaborators = Collaborators::new(CollaboratorConfig::with_base_url("http://127.0.0.1:9"));
        let result = collaborators.explain_disease("asthma", &[], &[]).await;
        assert!(matches!(result, Err(CollaboratorError::NotConfigured { .. })));
    }
}
