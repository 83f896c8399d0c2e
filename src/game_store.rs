use std::{sync::Arc, time::Instant};

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::log;

use crate::{config_handler::{Config, RefreshPolicy}, db::{DbError, JsonFileDb}, models::{Game, LikedBody}};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("game {0} not found")]
    NotFound(String),
    #[error("invalid fields: {0}")]
    InvalidFields(serde_json::Error),
    #[error("persistence failed: {0}")]
    Persistence(#[from] DbError),
}

/// In-memory mirror of the storage file. Mutations are applied to a copy of the
/// cache and only committed once the write to storage succeeded.
pub struct GameStore {
    games_in_mem: Vec<Game>,
    refresh_policy: RefreshPolicy,
    pub db: JsonFileDb<Game>,
}
pub type SafeGameStore = Arc<RwLock<GameStore>>;
impl GameStore {
    pub fn new(config: &Config) -> SafeGameStore {
        Arc::new(RwLock::new(GameStore {
            games_in_mem: vec!(),
            refresh_policy: config.refresh_policy,
            db: JsonFileDb::new(&config.db_path, config.atomic_writes),
        }))
    }

    pub async fn load(&mut self) -> Result<usize, StoreError> {
        self.db.ensure_exists().await?;
        self.refresh().await?;
        log::info!("[STORE] Loaded {} games from {}", self.games_in_mem.len(), self.db.path.display());
        Ok(self.games_in_mem.len())
    }

    pub async fn refresh(&mut self) -> Result<(), StoreError> {
        self.games_in_mem = self.db.read_all().await?;
        Ok(())
    }

    /// Refresh when the policy asks for it on every operation.
    async fn refresh_if_always(&mut self) -> Result<(), StoreError> {
        if self.refresh_policy == RefreshPolicy::Always {
            self.refresh().await?;
        }
        Ok(())
    }

    pub fn needs_refresh_on_read(&self) -> bool {
        self.refresh_policy == RefreshPolicy::Always
    }

    pub fn list(&self) -> Vec<Game> {
        self.games_in_mem.clone()
    }

    pub fn get(&self, id: &str) -> Result<Game, StoreError> {
        self.games_in_mem
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub async fn create(&mut self) -> Result<Game, StoreError> {
        self.refresh_if_always().await?;
        let game = Game::new(self.games_in_mem.len() + 1);
        let mut games = self.games_in_mem.clone();
        games.push(game.clone());
        self.commit(games).await?;
        log::info!("[STORE] Created {} {}", game.name, game.id);
        Ok(game)
    }

    pub async fn update(&mut self, id: &str, fields: Map<String, Value>) -> Result<Game, StoreError> {
        self.refresh().await?;
        let pos = self.position(id)?;
        let updated = self.games_in_mem[pos].merge(fields).map_err(StoreError::InvalidFields)?;
        let mut games = self.games_in_mem.clone();
        games[pos] = updated.clone();
        self.commit(games).await?;
        log::info!("[STORE] Updated {id}");
        Ok(updated)
    }

    pub async fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        self.refresh_if_always().await?;
        let pos = self.position(id)?;
        let mut games = self.games_in_mem.clone();
        games.remove(pos);
        self.commit(games).await?;
        log::info!("[STORE] Deleted {id}");
        Ok(())
    }

    /// The body is only checked for `liked` once the game is found, so an unknown id
    /// is reported as such whatever the body holds.
    pub async fn set_liked(&mut self, id: &str, body: Map<String, Value>) -> Result<Game, StoreError> {
        self.refresh().await?;
        let pos = self.position(id)?;
        let LikedBody { liked } = serde_json::from_value(Value::Object(body))
            .map_err(StoreError::InvalidFields)?;
        let mut games = self.games_in_mem.clone();
        games[pos].liked = liked;
        let updated = games[pos].clone();
        self.commit(games).await?;
        log::info!("[STORE] Set liked={liked} on {id}");
        Ok(updated)
    }

    fn position(&self, id: &str) -> Result<usize, StoreError> {
        self.games_in_mem
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn commit(&mut self, games: Vec<Game>) -> Result<(), StoreError> {
        let before = Instant::now();
        self.db.write_all(&games).await?;
        self.games_in_mem = games;
        log::debug!("[STORE] Committed {} games {:.2?}", self.games_in_mem.len(), before.elapsed());
        Ok(())
    }
}
