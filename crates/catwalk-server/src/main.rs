use actix_cors::Cors;
use actix_web::{
    get, post, web, App, HttpResponse, HttpServer, Responder, Result as ActixResult,
};
use catwalk_core::{schema::validate_flow, CatwalkError, FlowDocument};
use catwalk_runtime::{compile, FunctionRegistry, Graph, RunOptions, Runtime, RuntimeConfig};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Application state shared across handlers
struct AppState {
    runtime: Arc<Runtime>,
}

/// Success response for a run
#[derive(Debug, Serialize)]
struct RunResponse {
    status: &'static str,
    context: serde_json::Value,
}

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: &'static str,
    detail: String,
}

impl ErrorResponse {
    fn new(detail: impl ToString) -> Self {
        Self {
            status: "error",
            detail: detail.to_string(),
        }
    }
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "catwalk"
    }))
}

/// Execute a flow document posted as JSON
#[post("/run")]
async fn run_flow(
    data: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> ActixResult<impl Responder> {
    let raw = body.into_inner();

    if let Err(e) = validate_flow(&raw) {
        return Ok(HttpResponse::BadRequest().json(ErrorResponse::new(e)));
    }
    let document: FlowDocument = match serde_json::from_value(raw) {
        Ok(document) => document,
        Err(e) => return Ok(HttpResponse::BadRequest().json(ErrorResponse::new(e))),
    };

    info!(
        "running flow: {} nodes, {} edges",
        document.nodes.len(),
        document.edges.len()
    );

    let graph = match Graph::new(document.nodes, &document.edges) {
        Ok(graph) => graph,
        Err(e) => return Ok(HttpResponse::BadRequest().json(ErrorResponse::new(e))),
    };
    let order = compile(&graph);

    match data
        .runtime
        .run(&order, graph.nodes_by_id(), RunOptions::default())
        .await
    {
        Ok(ctx) => {
            info!("run completed with {} context entries", ctx.len());
            Ok(HttpResponse::Ok().json(RunResponse {
                status: "ok",
                context: serde_json::to_value(&ctx).unwrap_or_default(),
            }))
        }
        Err(e @ CatwalkError::Execution { .. }) => {
            error!("run failed: {}", e);
            Ok(HttpResponse::BadRequest().json(ErrorResponse::new(e)))
        }
        Err(e) => {
            error!("run failed: {}", e);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse::new(e)))
        }
    }
}

/// List registered function paths
#[get("/functions")]
async fn list_functions(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    Ok(HttpResponse::Ok().json(data.runtime.registry().list_functions()))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("🚀 Starting CatWalk server");

    let mut registry = FunctionRegistry::new();
    catwalk_functions::register_all(&mut registry);

    let runtime = Runtime::with_registry(Arc::new(registry), RuntimeConfig::default());

    let app_state = web::Data::new(AppState {
        runtime: Arc::new(runtime),
    });

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".to_string());

    info!("🌐 Server starting on http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .service(health_check)
            .service(run_flow)
            .service(list_functions)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
