use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info};

use crate::ai_client::PlanGenerator;
use crate::models::{DailyWorkout, UserProfile, WeeklyWorkoutPlan};
use crate::plan_parser::parse_workout_plan;
use crate::planner::{PlanError, WeeklyPlanner};

pub struct ApiState<G> {
    pub planner: Arc<WeeklyPlanner<G>>,
    pub profile: Arc<UserProfile>,
}

impl<G> Clone for ApiState<G> {
    fn clone(&self) -> Self {
        Self {
            planner: self.planner.clone(),
            profile: self.profile.clone(),
        }
    }
}

impl IntoResponse for PlanError {
    fn into_response(self) -> Response {
        let status = match &self {
            PlanError::Unparsable => StatusCode::UNPROCESSABLE_ENTITY,
            PlanError::Generation(_) => StatusCode::BAD_GATEWAY,
            PlanError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "status": "error", "message": self.to_string() }));
        (status, body).into_response()
    }
}

pub fn router<G>(state: ApiState<G>, allowed_origins: &str) -> Router
where
    G: PlanGenerator + Send + Sync + 'static,
{
    Router::new()
        .route("/api/workouts/week", get(get_week::<G>))
        .route("/api/workouts/regenerate", post(regenerate_week::<G>))
        .route("/api/workouts/parse", post(parse_plan))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &str) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty() && *o != "*")
        .filter_map(|o| o.parse().ok())
        .collect();

    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

pub async fn run_server<G>(
    state: ApiState<G>,
    bind_addr: &str,
    allowed_origins: &str,
) -> anyhow::Result<()>
where
    G: PlanGenerator + Send + Sync + 'static,
{
    let app = router(state, allowed_origins);

    let addr: SocketAddr = bind_addr.parse()?;
    info!("API Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn get_week<G>(State(state): State<ApiState<G>>) -> Result<Json<WeeklyWorkoutPlan>, PlanError>
where
    G: PlanGenerator + Send + Sync + 'static,
{
    let today = chrono::Local::now().date_naive();
    match state.planner.load_week(&state.profile, today).await {
        Ok(plan) => Ok(Json(plan)),
        Err(e) => {
            error!("Failed to load weekly plan: {}", e);
            Err(e)
        }
    }
}

async fn regenerate_week<G>(
    State(state): State<ApiState<G>>,
) -> Result<Json<WeeklyWorkoutPlan>, PlanError>
where
    G: PlanGenerator + Send + Sync + 'static,
{
    let today = chrono::Local::now().date_naive();
    match state.planner.regenerate(&state.profile, today).await {
        Ok(plan) => Ok(Json(plan)),
        Err(e) => {
            error!("Failed to regenerate weekly plan: {}", e);
            Err(e)
        }
    }
}

async fn parse_plan(body: String) -> Json<Vec<DailyWorkout>> {
    Json(parse_workout_plan(&body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai_client::GenerationError;
    use crate::plan_cache::PlanCache;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    struct FixedGenerator(Result<String, GenerationError>);

    impl PlanGenerator for FixedGenerator {
        async fn generate_weekly_plan(
            &self,
            _profile: &UserProfile,
        ) -> Result<String, GenerationError> {
            self.0.clone()
        }
    }

    fn app(response: Result<String, GenerationError>) -> Router {
        let cache = PlanCache::open_in_memory().expect("cache should open");
        let planner = WeeklyPlanner::new(FixedGenerator(response), Arc::new(Mutex::new(cache)));
        router(
            ApiState {
                planner: Arc::new(planner),
                profile: Arc::new(UserProfile::default()),
            },
            "*",
        )
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        serde_json::from_slice(&bytes).expect("body should be json")
    }

    #[tokio::test]
    async fn parse_endpoint_returns_days() {
        let response = app(Ok(String::new()))
            .oneshot(
                Request::post("/api/workouts/parse")
                    .body(Body::from("DAY: Monday\nTYPE: Rest\n---\nnothing here"))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body.as_array().map(Vec::len), Some(1));
        assert_eq!(body[0]["day_of_week"], "Monday");
        assert_eq!(body[0]["is_rest_day"], true);
    }

    #[tokio::test]
    async fn week_endpoint_returns_generated_plan() {
        let response = app(Ok("DAY: Monday\nTYPE: Yoga\nDURATION: 30".to_string()))
            .oneshot(
                Request::get("/api/workouts/week")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["workouts"][0]["duration_minutes"], 30);
    }

    #[tokio::test]
    async fn unparsable_plan_maps_to_422() {
        let response = app(Ok("no plan".to_string()))
            .oneshot(
                Request::post("/api/workouts/regenerate")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn generation_failure_maps_to_502() {
        let response = app(Err(GenerationError::QuotaExceeded))
            .oneshot(
                Request::get("/api/workouts/week")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn cache_failure_maps_to_500() {
        let response = PlanError::Cache(rusqlite::Error::QueryReturnedNoRows).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn transport_failure_body_omits_api_key() {
        let err = reqwest::Client::new()
            .post("http://127.0.0.1:1/v1beta/models/m:generateContent?key=SECRET-KEY-123")
            .send()
            .await
            .expect_err("nothing listens on port 1");

        let response = PlanError::from(GenerationError::from(err)).into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["status"], "error");
        let message = body["message"].as_str().expect("message should be a string");
        assert!(message.starts_with("Error generating workout plan:"));
        assert!(!message.contains("SECRET-KEY-123"));
    }
}
