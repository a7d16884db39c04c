use crate::config::ApiConfig;
use crate::schema::{build_schema, ApiContext, ApiSchema};
use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::State,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// GraphQL API Server
pub struct ApiServer {
    config: ApiConfig,
    schema: ApiSchema,
}

impl ApiServer {
    pub fn new(config: ApiConfig, ctx: ApiContext) -> Self {
        Self {
            config,
            schema: build_schema(ctx),
        }
    }

    pub fn router(&self) -> Router {
        let cors = if self.config.cors_enabled {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            CorsLayer::new()
        };

        Router::new()
            .route("/", get(graphiql).post(graphql_handler))
            .route("/graphql", get(graphiql).post(graphql_handler))
            .route("/health", get(health_check))
            .with_state(self.schema.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until the shutdown signal fires
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> crate::Result<()> {
        let addr = self.config.address();
        let app = self.router();

        info!(address = %addr, "Starting GraphQL API server");

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::ApiError::Server(e.to_string()))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await
            .map_err(|e| crate::ApiError::Server(e.to_string()))?;

        info!("GraphQL API server stopped");
        Ok(())
    }
}

/// GraphQL handler
async fn graphql_handler(
    State(schema): State<ApiSchema>,
    req: GraphQLRequest,
) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

/// GraphiQL playground
async fn graphiql() -> impl IntoResponse {
    Html(
        GraphiQLSource::build()
            .endpoint("/graphql")
            .finish(),
    )
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    "OK"
}
