use std::time::Duration;
use log::warn;
use reqwest::Client;
use thiserror::Error;

pub const DEFAULT_KEGG_URL: &str = "http://rest.kegg.jp";
pub const DEFAULT_GPROFILER_URL: &str = "https://biit.cs.ut.ee/gprofiler/api/gost/profile/";
pub const DEFAULT_STRING_URL: &str = "https://string-db.org/api";
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const HUMAN_SPECIES: u32 = 9606;

#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("{service} request failed: {source}")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} answered with status {status}")]
    Status { service: &'static str, status: u16 },

    #[error("{service} returned no data")]
    EmptyResponse { service: &'static str },

    #[error("{service} returned a malformed response: {reason}")]
    Malformed { service: &'static str, reason: String },

    #[error("{service} is not configured")]
    NotConfigured { service: &'static str },
}

impl CollaboratorError {
    pub fn request(service: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| CollaboratorError::Request { service, source }
    }
}

/// Endpoints, timeouts and credentials of the external services.
#[derive(Debug, Clone)]
pub struct CollaboratorConfig {
    pub kegg_url: String,
    pub gprofiler_url: String,
    pub string_url: String,
    pub gemini_url: String,
    pub gemini_model: String,
    pub gemini_api_key: Option<String>,
    pub species: u32,
    pub kegg_timeout: Duration,
    pub gprofiler_timeout: Duration,
    pub string_timeout: Duration,
    pub gemini_timeout: Duration,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            kegg_url: DEFAULT_KEGG_URL.to_string(),
            gprofiler_url: DEFAULT_GPROFILER_URL.to_string(),
            string_url: DEFAULT_STRING_URL.to_string(),
            gemini_url: DEFAULT_GEMINI_URL.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_api_key: None,
            species: HUMAN_SPECIES,
            kegg_timeout: Duration::from_secs(10),
            gprofiler_timeout: Duration::from_secs(30),
            string_timeout: Duration::from_secs(30),
            gemini_timeout: Duration::from_secs(30),
        }
    }
}

impl CollaboratorConfig {
    /// Every service pointed at one base URL, used to exercise fallbacks.
    pub fn with_base_url(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/');
        Self {
            kegg_url: base_url.to_string(),
            gprofiler_url: format!("{}/gost/profile/", base_url),
            string_url: base_url.to_string(),
            gemini_url: base_url.to_string(),
            kegg_timeout: Duration::from_secs(2),
            gprofiler_timeout: Duration::from_secs(2),
            string_timeout: Duration::from_secs(2),
            gemini_timeout: Duration::from_secs(2),
            ..Self::default()
        }
    }
}

/// Client for every third-party API the report pulls from.
#[derive(Debug, Clone)]
pub struct Collaborators {
    pub(crate) http: Client,
    pub config: CollaboratorConfig,
}

impl Collaborators {
    pub fn new(config: CollaboratorConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    pub(crate) async fn get_text(
        &self,
        service: &'static str,
        url: &str,
        timeout: Duration,
    ) -> Result<String, CollaboratorError> {
        self.get_text_with_query(service, url, &[], timeout).await
    }

    /// GET with URL-encoded query parameters appended to `url`.
    pub(crate) async fn get_text_with_query(
        &self,
        service: &'static str,
        url: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<String, CollaboratorError> {
        let response = self.http
            .get(url)
            .query(query)
            .timeout(timeout)
            .send()
            .await
            .map_err(CollaboratorError::request(service))?;

        if !response.status().is_success() {
            return Err(CollaboratorError::Status {
                service,
                status: response.status().as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(CollaboratorError::request(service))?;

        if body.trim().is_empty() {
            return Err(CollaboratorError::EmptyResponse { service });
        }
        Ok(body)
    }
}

/// Replaces a failed or empty collaborator answer with deterministic data.
pub fn with_fallback<T, F>(
    result: Result<T, CollaboratorError>,
    what: &str,
    fallback: F,
) -> T
where
    T: IsEmptyAnswer,
    F: FnOnce() -> T,
{
    match result {
        Ok(value) if !value.is_empty_answer() => value,
        Ok(_) => {
            warn!("No {} returned, using fallback data", what);
            fallback()
        }
        Err(e) => {
            warn!("Could not fetch {}: {}. Using fallback data", what, e);
            fallback()
        }
    }
}

pub trait IsEmptyAnswer {
    fn is_empty_answer(&self) -> bool;
}

impl<T> IsEmptyAnswer for Vec<T> {
    fn is_empty_answer(&self) -> bool {
        self.is_empty()
    }
}

impl IsEmptyAnswer for String {
    fn is_empty_answer(&self) -> bool {
        self.trim().is_empty()
    }
}
