use std::env;
use std::path::PathBuf;

/// Where the state file lands when `TENDERDESK_STATE_PATH` is not set,
/// relative to the platform data directory.
const DEFAULT_STATE_FILE: &str = "tenderdesk/state.json";

const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_base_url: String,
    pub state_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let backend_base_url =
            env::var("TENDERDESK_BACKEND_URL").unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());

        let state_path = match env::var("TENDERDESK_STATE_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => dirs::data_dir()
                .ok_or_else(|| "No platform data directory available".to_string())?
                .join(DEFAULT_STATE_FILE),
        };

        Ok(Self {
            backend_base_url,
            state_path,
        })
    }
}
