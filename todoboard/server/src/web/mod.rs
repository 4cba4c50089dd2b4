use axum::Router;
use axum::http::HeaderValue;
use axum::response::Json;
use axum::routing::get;
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::{OpenApi, ToSchema};

use crate::config::Config;
use crate::todo::api::{TodoState, create_todo_router};

/// JSON body carrying a human-readable status message.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// JSON response for unexpected server-side failures.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServerErrorResponse {
    pub error: String,
    pub message: String,
}

impl ServerErrorResponse {
    pub fn new(message: String) -> Self {
        Self {
            error: "INTERNAL_SERVER_ERROR".to_string(),
            message,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        root_handler,
        crate::todo::api::get_todos_handler,
        crate::todo::api::create_todo_handler,
        crate::todo::api::update_todo_handler,
        crate::todo::api::delete_todo_handler,
    ),
    tags(
        (name = "Todos", description = "Create, list, update and delete todos")
    )
)]
pub struct ApiDoc;

/// Liveness check for GET /.
#[tracing::instrument]
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "The API is up", body = MessageResponse)
    )
)]
pub async fn root_handler() -> Json<MessageResponse> {
    Json(MessageResponse::new("API is running"))
}

/// Serves the generated OpenAPI document.
#[tracing::instrument]
pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Builds the CORS policy admitting exactly one origin, with credentials.
///
/// Methods and headers are mirrored from the request, since wildcards are not
/// allowed alongside credentials.
pub fn cors_layer(allowed_origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

/// Assembles the full application router around an already connected database.
pub fn create_app(config: &Config, db: Arc<DatabaseConnection>) -> anyhow::Result<Router> {
    let allowed_origin = HeaderValue::from_str(&config.web_url)?;
    let todo_state = Arc::new(TodoState { db });

    let app = Router::new()
        .route("/", get(root_handler))
        .route("/openapi.json", get(openapi_handler))
        .merge(create_todo_router(todo_state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(allowed_origin)),
        );
    Ok(app)
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let db = Database::connect(&config.database_url).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database schema is up to date");

    let app = create_app(&config, Arc::new(db))?;
    tracing::info!("Accepting cross-origin requests from {}", config.web_url);

    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use insta::assert_json_snapshot;
    use tower::ServiceExt;

    const ALLOWED_ORIGIN: &str = "http://localhost:3000";

    fn cors_test_router() -> Router {
        Router::new()
            .route("/", get(root_handler))
            .layer(cors_layer(HeaderValue::from_static(ALLOWED_ORIGIN)))
    }

    #[tokio::test]
    async fn can_report_api_is_running() {
        let response = cors_test_router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_json_snapshot!(json, @r#"
        {
          "message": "API is running"
        }
        "#);
    }

    #[tokio::test]
    async fn can_allow_configured_origin_with_credentials() {
        let response = cors_test_router()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("origin", ALLOWED_ORIGIN)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(
            headers.get("access-control-allow-origin"),
            Some(&HeaderValue::from_static(ALLOWED_ORIGIN))
        );
        assert_eq!(
            headers.get("access-control-allow-credentials"),
            Some(&HeaderValue::from_static("true"))
        );
    }

    #[tokio::test]
    async fn does_not_allow_other_origins() {
        let response = cors_test_router()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("origin", "http://evil.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(
            response
                .headers()
                .get("access-control-allow-origin")
                .is_none()
        );
    }

    #[tokio::test]
    async fn can_answer_preflight_for_any_method_and_header() {
        let response = cors_test_router()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/")
                    .header("origin", ALLOWED_ORIGIN)
                    .header("access-control-request-method", "DELETE")
                    .header("access-control-request-headers", "x-custom-header")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(
            headers.get("access-control-allow-origin"),
            Some(&HeaderValue::from_static(ALLOWED_ORIGIN))
        );
        assert_eq!(
            headers.get("access-control-allow-methods"),
            Some(&HeaderValue::from_static("DELETE"))
        );
        assert_eq!(
            headers.get("access-control-allow-headers"),
            Some(&HeaderValue::from_static("x-custom-header"))
        );
    }

    #[test]
    fn can_describe_every_route_in_openapi_document() {
        let document = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let paths = document["paths"].as_object().unwrap();

        assert!(paths.contains_key("/"));
        assert!(paths.contains_key("/todos"));
        assert!(paths.contains_key("/todos/{id}"));
        assert!(document["paths"]["/todos/{id}"]["put"].is_object());
        assert!(document["paths"]["/todos/{id}"]["delete"].is_object());
    }

    #[test]
    fn can_describe_internal_server_error() {
        let response = ServerErrorResponse::new("Failed to create todo".to_string());

        assert_json_snapshot!(response, @r#"
        {
          "error": "INTERNAL_SERVER_ERROR",
          "message": "Failed to create todo"
        }
        "#);
    }
}
