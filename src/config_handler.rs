use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Only update and set-liked re-read the storage file before mutating.
    #[default]
    MutationsOnly,
    /// Every operation re-reads the storage file first.
    Always,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default="default_port")]
    pub port: u16,

    #[serde(default="default_db_path")]
    pub db_path: String,

    #[serde(default="default_false")]
    pub atomic_writes: bool,

    #[serde(default)]
    pub refresh_policy: RefreshPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: default_port(),
            db_path: default_db_path(),
            atomic_writes: default_false(),
            refresh_policy: RefreshPolicy::default(),
        }
    }
}

fn default_port() -> u16 {
    3333
}

fn default_db_path() -> String {
    "./database.json".to_string()
}

fn default_false() -> bool {
    false
}

pub fn get_config() -> anyhow::Result<Config> {
    let path = std::env::var("CONFIG_PATH").ok()
        .unwrap_or_else(|| "./deployment/config.json".to_string());
    let mut result: Config = match fs::read_to_string(&path) {
        Ok(data) => serde_json::from_str(&data)
            .with_context(|| format!("Could not parse JSON at {path}!"))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("[CONFIG] No config at {path}, using defaults");
            Config::default()
        },
        Err(e) => return Err(e).with_context(|| format!("Unable to read {path}")),
    };
    if let Ok(port) = std::env::var("PORT") {
        result.port = port.parse().with_context(|| format!("Invalid PORT {port}"))?;
        println!("[CONFIG] PORT {}", result.port);
    }
    if let Ok(db_path) = std::env::var("DB_PATH") {
        result.db_path = db_path;
        println!("[CONFIG] DB_PATH {}", result.db_path);
    }
    println!("[CONFIG] {:?}", result);
    Ok(result)
}
