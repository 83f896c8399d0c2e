use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::log;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A JSON array of `V` stored as a single file. Every write replaces the whole file.
pub struct JsonFileDb<V: DeserializeOwned + Serialize> {
    pub path: PathBuf,
    pub atomic_writes: bool,
    value_type: std::marker::PhantomData<V>,
}

impl<V: DeserializeOwned + Serialize> JsonFileDb<V> {
    pub fn new(path: impl Into<PathBuf>, atomic_writes: bool) -> JsonFileDb<V> {
        JsonFileDb {
            path: path.into(),
            atomic_writes,
            value_type: std::marker::PhantomData,
        }
    }

    pub async fn ensure_exists(&self) -> Result<(), DbError> {
        if tokio::fs::try_exists(&self.path).await? {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, "[]").await?;
        log::info!("[DB] Created {}", self.path.display());
        Ok(())
    }

    pub async fn read_all(&self) -> Result<Vec<V>, DbError> {
        let before = Instant::now();
        self.ensure_exists().await?;
        let data = tokio::fs::read_to_string(&self.path).await?;
        let result: Vec<V> = serde_json::from_str(&data).map_err(|e| {
            log::error!("[DB] Read failed {} {}", self.path.display(), e);
            e
        })?;
        log::debug!("[DB] Read all {} {} {:.2?}", self.path.display(), result.len(), before.elapsed());
        Ok(result)
    }

    pub async fn write_all(&self, values: &[V]) -> Result<(), DbError> {
        let before = Instant::now();
        let json = serde_json::to_string_pretty(values)?;
        let result = if self.atomic_writes {
            let tmp = tmp_path(&self.path);
            match tokio::fs::write(&tmp, json).await {
                Ok(()) => tokio::fs::rename(&tmp, &self.path).await,
                Err(e) => Err(e),
            }
        } else {
            tokio::fs::write(&self.path, json).await
        };

        match result {
            Ok(()) => {
                log::debug!("[DB] Wrote {} {} {:.2?}", self.path.display(), values.len(), before.elapsed());
                Ok(())
            },
            Err(e) => {
                log::error!("[DB] Write failed {} {}", self.path.display(), e);
                Err(e.into())
            }
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::{DbError, JsonFileDb};
    use crate::models::Game;

    fn game(id: &str, name: &str) -> Game {
        Game { id: id.to_string(), name: name.to_string(), liked: false, extra: Default::default() }
    }

    #[tokio::test]
    async fn creates_missing_file_with_empty_list() {
        let dir = TempDir::new("db").expect("dir to be created");
        let path = dir.path().join("nested").join("database.json");
        let db: JsonFileDb<Game> = JsonFileDb::new(&path, false);

        assert!(db.read_all().await.unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[tokio::test]
    async fn ensure_exists_keeps_content() {
        let dir = TempDir::new("db").expect("dir to be created");
        let path = dir.path().join("database.json");
        std::fs::write(&path, r#"[{"id":"a","name":"Game 1","liked":true}]"#).unwrap();
        let db: JsonFileDb<Game> = JsonFileDb::new(&path, false);

        db.ensure_exists().await.unwrap();
        let games = db.read_all().await.unwrap();
        assert_eq!(games.len(), 1);
        assert!(games[0].liked);
    }

    #[tokio::test]
    async fn writes_pretty_json() {
        let dir = TempDir::new("db").expect("dir to be created");
        let path = dir.path().join("database.json");
        let db: JsonFileDb<Game> = JsonFileDb::new(&path, false);

        db.write_all(&[game("a", "Game 1")]).await.unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "[\n  {\n    \"id\": \"a\",\n    \"name\": \"Game 1\",\n    \"liked\": false\n  }\n]");
    }

    #[tokio::test]
    async fn atomic_write_leaves_no_tmp_file() {
        let dir = TempDir::new("db").expect("dir to be created");
        let path = dir.path().join("database.json");
        let db: JsonFileDb<Game> = JsonFileDb::new(&path, true);

        db.write_all(&[game("a", "Game 1"), game("b", "Game 2")]).await.unwrap();
        assert_eq!(db.read_all().await.unwrap().len(), 2);
        assert!(!dir.path().join("database.json.tmp").exists());
    }

    #[tokio::test]
    async fn invalid_json_is_parse_error() {
        let dir = TempDir::new("db").expect("dir to be created");
        let path = dir.path().join("database.json");
        std::fs::write(&path, "not json").unwrap();
        let db: JsonFileDb<Game> = JsonFileDb::new(&path, false);

        assert!(matches!(db.read_all().await, Err(DbError::Parse(_))));
    }

    #[tokio::test]
    async fn unwritable_path_is_io_error() {
        let dir = TempDir::new("db").expect("dir to be created");
        // a directory can't be written as a file
        let db: JsonFileDb<Game> = JsonFileDb::new(dir.path(), false);

        assert!(matches!(db.write_all(&[]).await, Err(DbError::Io(_))));
    }
}
