use actix_multipart::Multipart;
use actix_web::{
    delete, get, post, put,
    error::BlockingError,
    http::{header, StatusCode},
    web::{self, Data, Json, Path, Query},
    HttpResponse, ResponseError,
};
use futures::StreamExt;
use log::{info, warn};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use crate::analysis::differential_expression::AnalysisResult;
use crate::analysis::disease_report::{
    analyze_expression_csv_blocking, EnrichmentView, ExpressionCharts, NetworkView, ReportBuilder,
    ReportLimits,
};
use crate::utils::download::{DownloadManager, ExportFormat};
use crate::utils::history::{HistoryEntry, HistoryStore, StoreError};
use crate::utils::presets::{PresetConfig, PresetStore};

pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub struct AppState {
    pub reports: ReportBuilder,
    pub history: Box<dyn HistoryStore>,
    pub presets: PresetStore,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),

    #[error("Blocking task failed: {0}")]
    Blocking(#[from] BlockingError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::Store(StoreError::IndexOutOfRange { .. }) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Store(_) | ApiError::Internal(_) | ApiError::Blocking(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

/// Runs a store operation on the blocking thread pool. The stores rewrite
/// their JSON file under a mutex, which must not happen on an actix worker.
async fn with_stores<T, F>(state: &Data<AppState>, operation: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppState) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    Ok(web::block(move || operation(state.get_ref())).await??)
}

struct FormField {
    filename: Option<String>,
    data: Vec<u8>,
}

impl FormField {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).trim().to_string()
    }
}

async fn read_form(mut payload: Multipart) -> Result<FxHashMap<String, FormField>, ApiError> {
    let mut fields = FxHashMap::default();
    let mut total = 0usize;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?;
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let filename = disposition.get_filename().map(str::to_string);

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?;
            total += chunk.len();
            if total > MAX_UPLOAD_BYTES {
                return Err(ApiError::BadRequest("Upload is too large".to_string()));
            }
            data.extend_from_slice(&chunk);
        }
        fields.insert(name, FormField { filename, data });
    }

    Ok(fields)
}

#[derive(Serialize)]
struct UploadResponse {
    analysis: AnalysisResult,
    charts: ExpressionCharts,
    enrichment: EnrichmentView,
    network: NetworkView,
}

#[derive(Deserialize)]
struct DownloadQuery {
    #[serde(default)]
    format: ExportFormat,
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

#[post("/analyze")]
async fn analyze(state: Data<AppState>, payload: Multipart) -> Result<HttpResponse, ApiError> {
    let form = read_form(payload).await?;

    let disease = form
        .get("disease_name")
        .map(FormField::text)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::BadRequest("disease_name is required".to_string()))?;

    let limits = match form.get("preset").map(FormField::text).filter(|name| !name.is_empty()) {
        Some(preset) => {
            let name = preset.clone();
            with_stores(&state, move |state| state.presets.get(&name))
                .await?
                .map(|config| config.limits())
                .ok_or_else(|| ApiError::NotFound(format!("Preset '{}' not found", preset)))?
        }
        None => ReportLimits::default(),
    };

    let csv_bytes = form
        .get("csv_file")
        .map(|field| field.data.as_slice())
        .filter(|data| !data.is_empty());

    info!("Building report for '{}'", disease);
    let report = state.reports.run(&disease, csv_bytes, &limits).await;
    let entry = HistoryEntry::new(report.clone());
    with_stores(&state, move |state| state.history.append(entry)).await?;

    Ok(HttpResponse::Ok().json(report))
}

#[post("/upload")]
async fn upload(state: Data<AppState>, payload: Multipart) -> Result<HttpResponse, ApiError> {
    let form = read_form(payload).await?;

    let file = form
        .get("file")
        .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;
    let is_csv = file
        .filename
        .as_deref()
        .map(|name| name.to_lowercase().ends_with(".csv"))
        .unwrap_or(false);
    if !is_csv {
        return Err(ApiError::BadRequest("Please upload a .csv file".to_string()));
    }

    let (analysis, charts) = analyze_expression_csv_blocking(file.data.clone())
        .await
        .map_err(|e| {
            warn!("Rejected uploaded matrix: {}", e);
            ApiError::BadRequest(e.to_string())
        })?;

    let genes = &analysis.significant_genes;
    let limits = ReportLimits::default();
    let enrichment = state.reports.enrichment(genes, limits.max_terms).await;
    let network = state.reports.network(genes).await;

    Ok(HttpResponse::Ok().json(UploadResponse {
        analysis,
        charts,
        enrichment,
        network,
    }))
}

#[get("/analysis/{disease}")]
async fn disease_analysis(state: Data<AppState>, disease: Path<String>) -> HttpResponse {
    let report = state
        .reports
        .run(&disease, None, &ReportLimits::default())
        .await;
    HttpResponse::Ok().json(report)
}

#[get("/network/{disease}")]
async fn disease_network(state: Data<AppState>, disease: Path<String>) -> HttpResponse {
    let genes = state
        .reports
        .disease_genes(&disease, ReportLimits::default().max_genes)
        .await;
    let network = state.reports.network(&genes).await;
    HttpResponse::Ok().json(json!({
        "disease": disease.as_str(),
        "genes": genes,
        "network": network,
    }))
}

#[get("/enrichment/{disease}")]
async fn disease_enrichment(state: Data<AppState>, disease: Path<String>) -> HttpResponse {
    let limits = ReportLimits::default();
    let genes = state.reports.disease_genes(&disease, limits.max_genes).await;
    let enrichment = state.reports.enrichment(&genes, limits.max_terms).await;
    HttpResponse::Ok().json(json!({
        "disease": disease.as_str(),
        "genes": genes,
        "enrichment": enrichment,
    }))
}

#[get("/history")]
async fn list_history(state: Data<AppState>) -> Result<HttpResponse, ApiError> {
    let entries = with_stores(&state, |state| state.history.list()).await?;
    Ok(HttpResponse::Ok().json(entries))
}

#[get("/history/{index}")]
async fn get_history(state: Data<AppState>, index: Path<usize>) -> Result<HttpResponse, ApiError> {
    let index = index.into_inner();
    let entry = with_stores(&state, move |state| state.history.get(index)).await?;
    Ok(HttpResponse::Ok().json(entry))
}

#[delete("/history/{index}")]
async fn delete_history(state: Data<AppState>, index: Path<usize>) -> Result<HttpResponse, ApiError> {
    let index = index.into_inner();
    let removed = with_stores(&state, move |state| state.history.delete(index)).await?;
    info!("Deleted history entry for '{}'", removed.report.disease);
    Ok(HttpResponse::NoContent().finish())
}

#[get("/history/{index}/download")]
async fn download_history(
    state: Data<AppState>,
    index: Path<usize>,
    query: Query<DownloadQuery>,
) -> Result<HttpResponse, ApiError> {
    let index = index.into_inner();
    let entry = with_stores(&state, move |state| state.history.get(index)).await?;
    let result = entry
        .report
        .analysis
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("History entry has no expression analysis".to_string()))?;

    let (filename, content) = DownloadManager::new(&entry.report.disease)
        .generate_file_content(result, query.format)?;
    let content_type = match query.format {
        ExportFormat::Csv => "text/csv",
        ExportFormat::Tsv => "text/tab-separated-values",
        ExportFormat::Json => "application/json",
    };

    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(content))
}

#[get("/presets")]
async fn list_presets(state: Data<AppState>) -> Result<HttpResponse, ApiError> {
    let presets = with_stores(&state, |state| state.presets.load_all()).await?;
    Ok(HttpResponse::Ok().json(presets))
}

#[put("/presets/{name}")]
async fn save_preset(
    state: Data<AppState>,
    name: Path<String>,
    config: Json<PresetConfig>,
) -> Result<HttpResponse, ApiError> {
    let config = config.into_inner();
    let (name, saved) = (name.into_inner(), config.clone());
    with_stores(&state, move |state| state.presets.save(&name, saved)).await?;
    Ok(HttpResponse::Ok().json(config))
}

#[delete("/presets/{name}")]
async fn delete_preset(state: Data<AppState>, name: Path<String>) -> Result<HttpResponse, ApiError> {
    let name = name.into_inner();
    let preset = name.clone();
    if with_stores(&state, move |state| state.presets.delete(&preset)).await? {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(ApiError::NotFound(format!("Preset '{}' not found", name)))
    }
}

/// Registers every API route under `/api`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health)
            .service(analyze)
            .service(upload)
            .service(disease_analysis)
            .service(disease_network)
            .service(disease_enrichment)
            .service(list_history)
            .service(download_history)
            .service(get_history)
            .service(delete_history)
            .service(list_presets)
            .service(save_preset)
            .service(delete_preset),
    );
}
