use std::net::SocketAddr;

use axum::{Router, body::Bytes, extract::{Path, State}, http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::{Map, Value};
use tokio::sync::RwLockReadGuard;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::log;

use crate::{game_store::{GameStore, SafeGameStore, StoreError}, models::Game};

const NOT_FOUND_GET: &str = "Game not found";
const NOT_FOUND: &str = "Game not found.";
const WRITE_FAILED: &str = "Failed to write to database.";
const UPDATE_FAILED: &str = "Failed to update game.";
const READ_FAILED: &str = "Failed to read database.";

#[derive(Clone)]
pub struct ApiState {
    pub store: SafeGameStore,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

impl ApiError {
    /// Not-found status differs per route: get-one answers 400, mutations 404.
    fn from_store(err: StoreError, not_found: (StatusCode, &str), failure: &str) -> ApiError {
        let (status, message) = match &err {
            StoreError::NotFound(_) => not_found,
            StoreError::InvalidFields(_) => (StatusCode::BAD_REQUEST, "Invalid game fields."),
            StoreError::Persistence(e) => {
                log::error!("[API] {failure} {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, failure)
            },
        };
        ApiError { status, message: message.to_string() }
    }

    fn mutation(failure: &str) -> impl Fn(StoreError) -> ApiError + '_ {
        move |e| ApiError::from_store(e, (StatusCode::NOT_FOUND, NOT_FOUND), failure)
    }

    fn read_failed(err: StoreError) -> ApiError {
        log::error!("[API] {READ_FAILED} {err}");
        ApiError { status: StatusCode::INTERNAL_SERVER_ERROR, message: READ_FAILED.to_string() }
    }
}

/// Request body as a field map. Bodies that are empty, not JSON or not an object
/// carry no fields, whatever their content type.
fn body_fields(body: &Bytes) -> Map<String, Value> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(fields)) => fields,
        _ => Map::new(),
    }
}

pub struct Api;
impl Api {
    pub async fn serve(port: u16, store: SafeGameStore) -> anyhow::Result<()> {
        let app = Api::router(ApiState { store });
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let server = axum::Server::try_bind(&addr)?;
        log::info!("[API] Server running on http://localhost:{port} (bound to {addr})");
        server.serve(app.into_make_service()).await?;
        Ok(())
    }

    pub fn router(state: ApiState) -> Router {
        Router::new()
            .route("/games", axum::routing::get(Api::list_games).post(Api::create_game))
            .route("/games/:id", axum::routing::get(Api::get_game).put(Api::update_game).delete(Api::delete_game))
            .route("/games/:id/liked", axum::routing::patch(Api::set_liked))

            .route("/", axum::routing::get(Api::root))
            .with_state(state)
            .layer(ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
            )
    }

    async fn root() -> &'static str {
        "Game on"
    }

    /// Read guard over the store, refreshed first if the policy wants fresh reads.
    async fn read_store(state: &ApiState) -> Result<RwLockReadGuard<'_, GameStore>, StoreError> {
        let needs_refresh = state.store.read().await.needs_refresh_on_read();
        if needs_refresh {
            state.store.write().await.refresh().await?;
        }
        Ok(state.store.read().await)
    }

    async fn list_games(State(state): State<ApiState>) -> Result<Json<Vec<Game>>, ApiError> {
        let store = Api::read_store(&state).await
            .map_err(ApiError::read_failed)?;
        log::info!("[API] GET /games");
        Ok(Json(store.list()))
    }

    async fn get_game(Path(id): Path<String>, State(state): State<ApiState>) -> Result<Json<Game>, ApiError> {
        let not_found = (StatusCode::BAD_REQUEST, NOT_FOUND_GET);
        let store = Api::read_store(&state).await
            .map_err(ApiError::read_failed)?;
        log::info!("[API] GET /games/{id}");
        store.get(&id)
            .map(Json)
            .map_err(|e| ApiError::from_store(e, not_found, READ_FAILED))
    }

    async fn create_game(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
        let game = state.store.write().await.create().await
            .map_err(ApiError::mutation(WRITE_FAILED))?;
        log::info!("[API] POST /games {}", game.id);
        Ok((StatusCode::CREATED, Json(game)))
    }

    async fn update_game(
        Path(id): Path<String>,
        State(state): State<ApiState>,
        body: Bytes) -> Result<Json<Game>, ApiError> {

        log::info!("[API] PUT /games/{id}");
        state.store.write().await.update(&id, body_fields(&body)).await
            .map(Json)
            .map_err(ApiError::mutation(UPDATE_FAILED))
    }

    async fn delete_game(Path(id): Path<String>, State(state): State<ApiState>) -> Result<StatusCode, ApiError> {
        log::info!("[API] DELETE /games/{id}");
        state.store.write().await.delete(&id).await
            .map(|_| StatusCode::NO_CONTENT)
            .map_err(ApiError::mutation(WRITE_FAILED))
    }

    async fn set_liked(
        Path(id): Path<String>,
        State(state): State<ApiState>,
        body: Bytes) -> Result<Json<Game>, ApiError> {

        log::info!("[API] PATCH /games/{id}/liked");
        state.store.write().await.set_liked(&id, body_fields(&body)).await
            .map(Json)
            .map_err(ApiError::mutation(UPDATE_FAILED))
    }
}
