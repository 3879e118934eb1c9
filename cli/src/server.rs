use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use nutricoach_core::models::{
    FieldError, MealPlanEntry, NewRecipe, NutritionTotals, PlannedMeal, Recipe, ValidationErrors,
    normalize_meal_type, parse_plan_date, summarize_planned_meals, validate_new_recipe,
};
use nutricoach_core::service::RecipeService;
use nutricoach_core::transfer::{ImportError, ImportSummary, export_file_name};

const BODY_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

#[derive(Clone)]
struct AppState {
    service: Arc<Mutex<RecipeService>>,
    api_key: Option<String>,
}

impl AppState {
    fn service(&self) -> MutexGuard<'_, RecipeService> {
        self.service.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct RecipeQuery {
    q: Option<String>,
    category: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanMealRequest {
    recipe_id: String,
}

#[derive(Serialize)]
struct SavedStatus {
    id: String,
    saved: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DayPlan {
    date: String,
    meals: Vec<PlannedMeal>,
    totals: NutritionTotals,
}

#[derive(Serialize)]
struct FieldErrorBody {
    field: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<FieldErrorBody>,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Invalid(ValidationErrors),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, fields) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg, Vec::new()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, Vec::new()),
            Self::Invalid(invalid) => {
                let fields = invalid
                    .errors
                    .into_iter()
                    .map(|FieldError { field, message }| FieldErrorBody { field, message })
                    .collect();
                (StatusCode::BAD_REQUEST, "invalid recipe".to_string(), fields)
            }
            Self::Internal(err) => {
                tracing::error!("internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    Vec::new(),
                )
            }
        };
        (status, Json(ErrorResponse { error, fields })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<ImportError>() {
            Some(import) => Self::BadRequest(import.to_string()),
            None => Self::Internal(err),
        }
    }
}

fn bad_request(err: &anyhow::Error) -> ApiError {
    ApiError::BadRequest(format!("{err}"))
}

fn plan_slot(date: &str, meal_type: &str) -> Result<(String, String), ApiError> {
    let date = parse_plan_date(date).map_err(|e| bad_request(&e))?;
    let meal_type = normalize_meal_type(meal_type).map_err(|e| bad_request(&e))?;
    Ok((date.format("%Y-%m-%d").to_string(), meal_type))
}

fn ensure_not_builtin(service: &RecipeService, id: &str) -> Result<(), ApiError> {
    if service.get_builtin_recipe(id).is_some() {
        return Err(ApiError::BadRequest(format!(
            "Recipe {id} is built in and cannot be changed"
        )));
    }
    Ok(())
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                    fields: Vec::new(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Recipe handlers ---

async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<RecipeQuery>,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    let service = state.service();
    let recipes = match (query.q, query.category) {
        (Some(term), _) => service.search_recipes(&term),
        (None, Some(category)) => service.get_recipes_by_category(&category),
        (None, None) => service.list_all_recipes().context("failed to list recipes")?,
    };
    Ok(Json(recipes))
}

async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Recipe>, ApiError> {
    let service = state.service();
    service
        .get_recipe_by_id(&id)
        .context("failed to load recipe")?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Recipe {id} not found")))
}

async fn create_recipe(
    State(state): State<AppState>,
    Json(data): Json<NewRecipe>,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    validate_new_recipe(&data).map_err(ApiError::Invalid)?;
    let service = state.service();
    let recipe = service
        .create_recipe(data)
        .context("failed to create recipe")?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn create_recipe_batch(
    State(state): State<AppState>,
    Json(batch): Json<Vec<NewRecipe>>,
) -> Result<(StatusCode, Json<Vec<Recipe>>), ApiError> {
    if batch.is_empty() {
        return Err(ApiError::BadRequest("batch must not be empty".to_string()));
    }
    for (index, data) in batch.iter().enumerate() {
        validate_new_recipe(data).map_err(|invalid| {
            tracing::debug!(index, "rejected recipe batch");
            ApiError::Invalid(invalid)
        })?;
    }
    let service = state.service();
    let recipes = service
        .create_recipes(batch)
        .context("failed to create recipes")?;
    Ok((StatusCode::CREATED, Json(recipes)))
}

async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(data): Json<NewRecipe>,
) -> Result<Json<Recipe>, ApiError> {
    let service = state.service();
    ensure_not_builtin(&service, &id)?;
    validate_new_recipe(&data).map_err(ApiError::Invalid)?;
    service
        .update_recipe(&id, data)
        .context("failed to update recipe")?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Recipe {id} not found")))
}

async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let service = state.service();
    ensure_not_builtin(&service, &id)?;
    if service
        .delete_recipe(&id)
        .context("failed to delete recipe")?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Recipe {id} not found")))
    }
}

// --- Saved handlers ---

async fn list_saved(State(state): State<AppState>) -> Result<Json<Vec<Recipe>>, ApiError> {
    let service = state.service();
    let recipes = service
        .get_all_saved_recipes()
        .context("failed to load saved recipes")?;
    Ok(Json(recipes))
}

async fn get_saved_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SavedStatus>, ApiError> {
    let service = state.service();
    let saved = service
        .is_recipe_saved(&id)
        .context("failed to load saved recipes")?;
    Ok(Json(SavedStatus { id, saved }))
}

async fn toggle_saved(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SavedStatus>, ApiError> {
    let service = state.service();
    if service
        .get_recipe_by_id(&id)
        .context("failed to load recipe")?
        .is_none()
    {
        return Err(ApiError::NotFound(format!("Recipe {id} not found")));
    }
    let saved = service
        .toggle_save_recipe(&id)
        .context("failed to update saved recipes")?;
    Ok(Json(SavedStatus { id, saved }))
}

// --- Meal plan handlers ---

async fn get_meal_plan(
    State(state): State<AppState>,
) -> Result<Json<Vec<MealPlanEntry>>, ApiError> {
    let service = state.service();
    let plan = service.get_meal_plan().context("failed to load meal plan")?;
    Ok(Json(plan))
}

async fn get_day_plan(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<DayPlan>, ApiError> {
    let date = parse_plan_date(&date)
        .map_err(|e| bad_request(&e))?
        .format("%Y-%m-%d")
        .to_string();
    let service = state.service();
    let meals = service
        .get_meal_plan_for_date(&date)
        .context("failed to load meal plan")?;
    let totals = summarize_planned_meals(&meals);
    Ok(Json(DayPlan {
        date,
        meals,
        totals,
    }))
}

async fn set_plan_meal(
    State(state): State<AppState>,
    Path((date, meal_type)): Path<(String, String)>,
    Json(req): Json<PlanMealRequest>,
) -> Result<Json<MealPlanEntry>, ApiError> {
    let (date, meal_type) = plan_slot(&date, &meal_type)?;
    let service = state.service();
    if service
        .get_recipe_by_id(&req.recipe_id)
        .context("failed to load recipe")?
        .is_none()
    {
        return Err(ApiError::NotFound(format!(
            "Recipe {} not found",
            req.recipe_id
        )));
    }
    let entry = service
        .add_to_meal_plan(&req.recipe_id, &date, &meal_type)
        .context("failed to update meal plan")?;
    Ok(Json(entry))
}

async fn delete_plan_meal(
    State(state): State<AppState>,
    Path((date, meal_type)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let (date, meal_type) = plan_slot(&date, &meal_type)?;
    let service = state.service();
    if service
        .remove_from_meal_plan(&date, &meal_type)
        .context("failed to update meal plan")?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "Nothing planned for {meal_type} on {date}"
        )))
    }
}

// --- Export / Import / Reset ---

async fn export_recipes(State(state): State<AppState>) -> Result<Response, ApiError> {
    let payload = state
        .service()
        .export_user_recipes()
        .context("failed to export recipes")?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_file_name(Local::now().date_naive())
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        payload,
    )
        .into_response())
}

async fn import_recipes(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<ImportSummary>, ApiError> {
    let summary = state.service().import_recipes(&body)?;
    Ok(Json(summary))
}

async fn reset_recipes(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let removed = state
        .service()
        .reset_user_recipes()
        .context("failed to reset recipes")?;
    Ok(Json(serde_json::json!({ "reset": removed })))
}

// --- Router builder ---

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/recipes", get(list_recipes).post(create_recipe))
        .route("/api/recipes/batch", post(create_recipe_batch))
        .route(
            "/api/recipes/{id}",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route("/api/saved", get(list_saved))
        .route("/api/saved/{id}", get(get_saved_status))
        .route("/api/saved/{id}/toggle", post(toggle_saved))
        .route("/api/plan", get(get_meal_plan))
        .route("/api/plan/{date}", get(get_day_plan))
        .route(
            "/api/plan/{date}/{meal_type}",
            put(set_plan_meal).delete(delete_plan_meal),
        )
        .route("/api/export", get(export_recipes))
        .route("/api/import", post(import_recipes))
        .route("/api/reset", post(reset_recipes))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Server startup ---

/// First and last four characters of the key. Short keys are fully masked.
fn key_hint(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 12 {
        return "*".repeat(chars.len().max(4));
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

pub async fn start_server(
    service: RecipeService,
    port: u16,
    bind: &str,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let state = AppState {
        service: Arc::new(Mutex::new(service)),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        eprintln!(
            "API key: {} (see api_key file in data directory)",
            key_hint(key)
        );
    } else {
        tracing::warn!("authentication disabled (--no-auth), API is open to anyone");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        tracing::warn!(
            bind,
            "listening with no authentication, any device on your network can access this API"
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    tracing::info!("listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
