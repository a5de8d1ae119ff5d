//! `OpenAPI` documentation generation and Swagger UI setup

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// `OpenAPI` documentation for the Agent Brain API
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::index::index,
        crate::routes::index::index_add,
        crate::routes::query::query,
        crate::routes::query::count,
    ),
    components(
        schemas(
            crate::routes::index::IndexBody,
            crate::routes::index::IndexAccepted,

            agent_brain_query::QueryRequest,
            agent_brain_query::QueryResponse,
            agent_brain_query::QueryFilter,
            agent_brain_query::QueryMode,
            agent_brain_query::ScoredResult,
            agent_brain_query::CountResponse,

            agent_brain_indexing::JobRecord,
            agent_brain_indexing::JobProgress,
            agent_brain_indexing::JobStatus,
            agent_brain_indexing::Operation,
            agent_brain_indexing::IndexRequest,

            agent_brain_storage::DocumentMetadata,
            agent_brain_storage::SearchResult,
            agent_brain_storage::PoolDiagnostics,
        )
    ),
    tags(
        (name = "index", description = "Indexing job submission and reset"),
        (name = "jobs", description = "Job queue inspection and cancellation"),
        (name = "query", description = "Hybrid retrieval over indexed chunks"),
        (name = "health", description = "Liveness, readiness, backend diagnostics"),
    ),
    info(
        title = "Agent Brain API",
        version = "0.1.0",
        description = "Document and source-code retrieval service: indexing, hybrid search, and job queue management",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://127.0.0.1:8000", description = "Local development server"),
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at `/swagger-ui`, backed by `/api-docs/openapi.json`.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
