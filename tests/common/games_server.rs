use std::process::{Command, Child};

use assert_cmd::prelude::CommandCargoExt;
use games_server::{config_handler::{Config, RefreshPolicy}, models::Game};
use reqwest::Response;
use serde_json::Value;

pub struct GamesServer {
    port: u16,
    child_process: Option<Child>,
}

impl Drop for GamesServer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl GamesServer {
    pub fn new(port: u16) -> GamesServer {
        GamesServer { port, child_process: None }
    }

    pub fn start(&mut self, path: &str, refresh_policy: RefreshPolicy) {
        let config = Config {
            port: self.port,
            db_path: format!("{path}/database.json"),
            refresh_policy,
            ..Default::default()
        };

        let config_str = serde_json::to_string(&config).unwrap();
        let config_path = format!("{path}/config.json");
        std::fs::write(config_path.clone(), config_str).unwrap();
        let child_process = Command::cargo_bin("games-server")
            .unwrap()
            .env("CONFIG_PATH", config_path)
            .spawn()
            .expect("should start");

        self.child_process = Some(child_process);
    }

    pub fn stop(&mut self) {
        if let Some(mut child) = self.child_process.take() {
            child.kill().expect("Should kill");
            _ = child.wait();
        }
    }

    pub async fn retry_until_up(&self) {
        let mut nr_loops = 0;
        while reqwest::get(self.url("/")).await.is_err() {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            nr_loops += 1;
            if nr_loops > 100 {
                panic!("server never came up");
            }
        }
    }

    pub async fn get_games(&self) -> Result<Vec<Game>, Box<dyn std::error::Error>> {
        Ok(reqwest::get(self.url("/games")).await?.json().await?)
    }

    pub async fn get_game(&self, id: &str) -> Result<Response, Box<dyn std::error::Error>> {
        Ok(reqwest::get(self.url(&format!("/games/{id}"))).await?)
    }

    pub async fn create_game(&self) -> Result<Response, Box<dyn std::error::Error>> {
        Ok(reqwest::Client::new()
            .post(self.url("/games"))
            .send()
            .await?)
    }

    pub async fn update_game(&self, id: &str, fields: &Value) -> Result<Response, Box<dyn std::error::Error>> {
        Ok(reqwest::Client::new()
            .put(self.url(&format!("/games/{id}")))
            .json(fields)
            .send()
            .await?)
    }

    pub async fn set_liked(&self, id: &str, liked: bool) -> Result<Response, Box<dyn std::error::Error>> {
        Ok(reqwest::Client::new()
            .patch(self.url(&format!("/games/{id}/liked")))
            .json(&serde_json::json!({ "liked": liked }))
            .send()
            .await?)
    }

    pub async fn delete_game(&self, id: &str) -> Result<Response, Box<dyn std::error::Error>> {
        Ok(reqwest::Client::new()
            .delete(self.url(&format!("/games/{id}")))
            .send()
            .await?)
    }

    fn url(&self, path: &str) -> String {
        format!("http://localhost:{}{path}", self.port)
    }
}
