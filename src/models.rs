use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Game {
    pub id: String,
    pub name: String,
    pub liked: bool,

    /// Fields merged in by an update that aren't part of the fixed record.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Game {
    /// `nr` is the 1-based position the game is created at.
    pub fn new(nr: usize) -> Game {
        Game {
            id: Uuid::new_v4().to_string(),
            name: format!("Game {nr}"),
            liked: false,
            extra: Map::new(),
        }
    }

    /// Shallow merge of `fields` over the record. `id` is never overwritten.
    /// Returns an error if a fixed field gets a value of the wrong type.
    pub fn merge(&self, fields: Map<String, Value>) -> Result<Game, serde_json::Error> {
        let mut merged = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in fields {
            if key != "id" {
                merged.insert(key, value);
            }
        }
        serde_json::from_value(Value::Object(merged))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LikedBody {
    pub liked: bool,
}
