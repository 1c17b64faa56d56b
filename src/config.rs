use std::path::PathBuf;
use std::time::Duration;
use clap::Parser;
use dirs::home_dir;
use lazy_static::lazy_static;
use crate::collaborators::client::{
    CollaboratorConfig, DEFAULT_GEMINI_MODEL, DEFAULT_GEMINI_URL, DEFAULT_GPROFILER_URL,
    DEFAULT_KEGG_URL, DEFAULT_STRING_URL, HUMAN_SPECIES,
};

fn data_path(filename: &str) -> String {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pathoscope")
        .join(filename)
        .to_string_lossy()
        .into_owned()
}

lazy_static! {
    pub static ref DEFAULT_HISTORY_PATH: String = data_path("history.json");
    pub static ref DEFAULT_PRESETS_PATH: String = data_path("presets.json");
}

#[derive(Parser, Debug, Clone)]
#[command(name = "pathoscope-server", about, version)]
pub struct ServerConfig {
    #[arg(
        long = "host",
        env = "PATHOSCOPE_HOST",
        value_name = "ADDRESS",
        help = "Address the web server binds to.",
        default_value = "127.0.0.1"
    )]
    pub host: String,

    #[arg(
        short = 'p',
        long = "port",
        env = "PATHOSCOPE_PORT",
        value_name = "PORT",
        help = "Port the web server listens on.",
        default_value_t = 8080
    )]
    pub port: u16,

    #[arg(
        long = "history",
        env = "PATHOSCOPE_HISTORY",
        value_name = "FILE",
        help = "JSON file holding the analysis history.",
        default_value_t = DEFAULT_HISTORY_PATH.to_string()
    )]
    pub history_file: String,

    #[arg(
        long = "presets",
        env = "PATHOSCOPE_PRESETS",
        value_name = "FILE",
        help = "JSON file holding the saved analysis presets.",
        default_value_t = DEFAULT_PRESETS_PATH.to_string()
    )]
    pub presets_file: String,

    #[arg(
        long = "static-dir",
        env = "PATHOSCOPE_STATIC_DIR",
        value_name = "DIRECTORY",
        help = "Directory with the front-end build served at '/'.",
        default_value = "frontend/build"
    )]
    pub static_dir: PathBuf,

    #[arg(
        long = "open-browser",
        help = "Open the front-end in the default browser once the server is up.",
        default_value_t = false
    )]
    pub open_browser: bool,

    #[arg(long = "kegg-url", env = "PATHOSCOPE_KEGG_URL", value_name = "URL", default_value = DEFAULT_KEGG_URL)]
    pub kegg_url: String,

    #[arg(long = "gprofiler-url", env = "PATHOSCOPE_GPROFILER_URL", value_name = "URL", default_value = DEFAULT_GPROFILER_URL)]
    pub gprofiler_url: String,

    #[arg(long = "string-url", env = "PATHOSCOPE_STRING_URL", value_name = "URL", default_value = DEFAULT_STRING_URL)]
    pub string_url: String,

    #[arg(long = "gemini-url", env = "PATHOSCOPE_GEMINI_URL", value_name = "URL", default_value = DEFAULT_GEMINI_URL)]
    pub gemini_url: String,

    #[arg(
        long = "gemini-model",
        env = "GEMINI_MODEL",
        value_name = "MODEL",
        help = "Model used for the AI disease explanation.",
        default_value = DEFAULT_GEMINI_MODEL
    )]
    pub gemini_model: String,

    #[arg(
        long = "gemini-api-key",
        env = "GEMINI_API_KEY",
        value_name = "KEY",
        help = "API key for the AI disease explanation. Without it a placeholder text is returned.",
        hide_env_values = true
    )]
    pub gemini_api_key: Option<String>,

    #[arg(long = "kegg-timeout", value_name = "SECONDS", default_value_t = 10)]
    pub kegg_timeout: u64,

    #[arg(long = "gprofiler-timeout", value_name = "SECONDS", default_value_t = 30)]
    pub gprofiler_timeout: u64,

    #[arg(long = "string-timeout", value_name = "SECONDS", default_value_t = 30)]
    pub string_timeout: u64,

    #[arg(long = "gemini-timeout", value_name = "SECONDS", default_value_t = 30)]
    pub gemini_timeout: u64,
}

impl ServerConfig {
    pub fn collaborator_config(&self) -> CollaboratorConfig {
        CollaboratorConfig {
            kegg_url: self.kegg_url.trim_end_matches('/').to_string(),
            gprofiler_url: self.gprofiler_url.clone(),
            string_url: self.string_url.trim_end_matches('/').to_string(),
            gemini_url: self.gemini_url.trim_end_matches('/').to_string(),
            gemini_model: self.gemini_model.clone(),
            gemini_api_key: self.gemini_api_key.clone(),
            species: HUMAN_SPECIES,
            kegg_timeout: Duration::from_secs(self.kegg_timeout),
            gprofiler_timeout: Duration::from_secs(self.gprofiler_timeout),
            string_timeout: Duration::from_secs(self.string_timeout),
            gemini_timeout: Duration::from_secs(self.gemini_timeout),
        }
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
