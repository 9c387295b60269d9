use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all};
use std::path::PathBuf;

const CONFIG_DIR: &str = "fishfarm-dashboard";
const CONFIG_FILE: &str = "dashboard_config.json";

#[derive(Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_farm_id")]
    pub farm_id: i64,
    #[serde(default = "default_latest_refresh")]
    pub latest_refresh_secs: u64,
    #[serde(default = "default_history_refresh")]
    pub history_refresh_secs: u64,
    #[serde(default = "default_history_window")]
    pub history_window_hours: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            farm_id: default_farm_id(),
            latest_refresh_secs: default_latest_refresh(),
            history_refresh_secs: default_history_refresh(),
            history_window_hours: default_history_window(),
        }
    }
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:8000/api".to_string()
}

fn default_farm_id() -> i64 {
    1
}

fn default_latest_refresh() -> u64 {
    30
}

fn default_history_refresh() -> u64 {
    300
}

fn default_history_window() -> i64 {
    24
}

fn get_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        let config_dir = home.join(CONFIG_DIR);
        let _ = create_dir_all(&config_dir);
        config_dir.join(CONFIG_FILE)
    })
}

pub fn load_config() -> AppConfig {
    if let Some(config_path) = get_config_path() {
        if let Ok(contents) = fs::read_to_string(config_path) {
            if let Ok(config) = serde_json::from_str::<AppConfig>(&contents) {
                return config;
            }
        }
    }
    AppConfig::default()
}

pub fn save_config(config: &AppConfig) {
    if let Some(config_path) = get_config_path() {
        if let Ok(json) = serde_json::to_string_pretty(config) {
            let _ = fs::write(config_path, json);
        }
    }
}
