// 🌐 HTTP API - JSON surface over the stores and page view models
//
// Every response uses the {success, data, error} envelope. NotFound maps to
// 404, unparseable query values to 400.

use crate::app::CrmApp;
use crate::entities::{Contact, ContactStatus, Deal, Entity, EntityId, SalesRep};
use crate::error::CrmError;
use crate::query::{ContactField, ContactQuery, SortDirection, SortSpec};
use crate::store::SharedRepository;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, MethodRouter},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::warn;

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Store(CrmError),
    BadRequest(String),
}

impl From<CrmError> for ApiError {
    fn from(error: CrmError) -> Self {
        ApiError::Store(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Store(error @ CrmError::NotFound { .. }) => (StatusCode::NOT_FOUND, error.to_string()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
        };
        warn!(status = status.as_u16(), %message, "request failed");
        (status, Json(ApiResponse::failure(message))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// GENERIC CRUD
// ============================================================================

/// Entities served under /api/<collection>
pub trait Routed: Entity {
    fn repository(app: &CrmApp) -> &SharedRepository<Self>;
}

impl Routed for Contact {
    fn repository(app: &CrmApp) -> &SharedRepository<Self> {
        app.contacts()
    }
}

impl Routed for Deal {
    fn repository(app: &CrmApp) -> &SharedRepository<Self> {
        app.deals()
    }
}

impl Routed for SalesRep {
    fn repository(app: &CrmApp) -> &SharedRepository<Self> {
        app.sales_reps()
    }
}

async fn list_all<E: Routed>(State(app): State<CrmApp>) -> ApiResult<Vec<E>> {
    Ok(Json(ApiResponse::ok(E::repository(&app).get_all().await)))
}

async fn fetch<E: Routed>(State(app): State<CrmApp>, Path(id): Path<EntityId>) -> ApiResult<E> {
    Ok(Json(ApiResponse::ok(E::repository(&app).get_by_id(id).await?)))
}

async fn create<E: Routed>(
    State(app): State<CrmApp>,
    Json(draft): Json<E::Draft>,
) -> Result<(StatusCode, Json<ApiResponse<E>>), ApiError> {
    let created = E::repository(&app).create(draft).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

async fn update<E: Routed>(
    State(app): State<CrmApp>,
    Path(id): Path<EntityId>,
    Json(patch): Json<E::Patch>,
) -> ApiResult<E> {
    Ok(Json(ApiResponse::ok(E::repository(&app).update(id, patch).await?)))
}

async fn remove<E: Routed>(State(app): State<CrmApp>, Path(id): Path<EntityId>) -> ApiResult<bool> {
    Ok(Json(ApiResponse::ok(E::repository(&app).delete(id).await?)))
}

fn collection<E: Routed>(list: MethodRouter<CrmApp>) -> Router<CrmApp> {
    Router::new()
        .route("/", list.post(create::<E>))
        .route("/:id", get(fetch::<E>).patch(update::<E>).delete(remove::<E>))
}

// ============================================================================
// PAGES
// ============================================================================

/// GET /api/contacts query string
#[derive(Debug, Default, Deserialize)]
pub struct ContactParams {
    pub search: Option<String>,
    pub status: Option<String>,
    pub rep: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
}

impl ContactParams {
    fn parse(self) -> Result<(ContactQuery, SortSpec<ContactField>), ApiError> {
        let bad = |e: crate::entities::ParseValueError| ApiError::BadRequest(e.to_string());

        let mut query = ContactQuery::default();
        if let Some(search) = self.search {
            query = query.with_search(search);
        }
        if let Some(status) = self.status.filter(|s| !s.is_empty()) {
            query = query.with_status(status.parse::<ContactStatus>().map_err(bad)?);
        }
        if let Some(rep) = self.rep {
            query = query.with_rep(rep);
        }

        let field = match self.sort {
            Some(field) => field.parse::<ContactField>().map_err(bad)?,
            None => ContactField::default(),
        };
        let direction = match self.dir {
            Some(dir) => dir.parse::<SortDirection>().map_err(bad)?,
            None => SortDirection::default(),
        };

        Ok((query, SortSpec { field, direction }))
    }
}

async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

async fn list_contacts(
    State(app): State<CrmApp>,
    Query(params): Query<ContactParams>,
) -> ApiResult<crate::app::ContactsPage> {
    let (query, sort) = params.parse()?;
    Ok(Json(ApiResponse::ok(app.contacts_page(query, sort).await)))
}

async fn dashboard(State(app): State<CrmApp>) -> ApiResult<crate::app::DashboardPage> {
    Ok(Json(ApiResponse::ok(app.dashboard().await)))
}

async fn pipeline(State(app): State<CrmApp>) -> ApiResult<crate::app::PipelinePage> {
    Ok(Json(ApiResponse::ok(app.pipeline().await)))
}

async fn timeline(State(app): State<CrmApp>) -> ApiResult<crate::app::TimelinePage> {
    Ok(Json(ApiResponse::ok(app.timeline().await)))
}

async fn leaderboard(State(app): State<CrmApp>) -> ApiResult<crate::app::LeaderboardPage> {
    Ok(Json(ApiResponse::ok(app.leaderboard().await)))
}

/// Full router, CORS included
pub fn router(app: CrmApp) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/dashboard", get(dashboard))
        .route("/pipeline", get(pipeline))
        .route("/timeline", get(timeline))
        .route("/leaderboard", get(leaderboard))
        .nest("/contacts", collection::<Contact>(get(list_contacts)))
        .nest("/deals", collection::<Deal>(get(list_all::<Deal>)))
        .nest("/reps", collection::<SalesRep>(get(list_all::<SalesRep>)))
        .with_state(app);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Fixtures;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> CrmApp {
        CrmApp::from_fixtures(Fixtures::embedded().unwrap(), 0.0)
    }

    async fn call(router: Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(router(app()), Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_contacts_filter_and_sort() {
        let (status, body) = call(
            router(app()),
            Method::GET,
            "/api/contacts?status=contacted&sort=name&dir=desc",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let rows = body["data"]["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["name"], "James Thompson");
        assert_eq!(body["data"]["total"], 8);
    }

    #[tokio::test]
    async fn test_bad_status_is_400() {
        let (status, body) = call(router(app()), Method::GET, "/api/contacts?status=hot", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_missing_deal_is_404() {
        let (status, body) = call(router(app()), Method::GET, "/api/deals/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Deal with ID 999 not found");
    }

    #[tokio::test]
    async fn test_deal_crud() {
        let app = app();

        let (status, body) = call(
            router(app.clone()),
            Method::POST,
            "/api/deals",
            Some(r#"{"name": "Pilot", "value": 5000, "startMonth": 2, "endMonth": 4}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["Id"], 11);

        let (status, body) = call(
            router(app.clone()),
            Method::PATCH,
            "/api/deals/11",
            Some(r#"{"stage": "closed"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["stage"], "closed");
        assert_eq!(body["data"]["value"], 5000.0);

        let (status, _) = call(router(app.clone()), Method::DELETE, "/api/deals/11", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(router(app), Method::DELETE, "/api/deals/11", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_patch_with_unknown_field_is_rejected() {
        let (status, _) = call(
            router(app()),
            Method::PATCH,
            "/api/reps/1",
            Some(r#"{"nickname": "Mikey"}"#),
        )
        .await;
        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn test_leaderboard() {
        let (status, body) = call(router(app()), Method::GET, "/api/leaderboard", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["entries"][0]["rep"]["name"], "Lisa Park");
        assert_eq!(body["data"]["hunterOfMonth"]["name"], "Lisa Park");
    }
}
