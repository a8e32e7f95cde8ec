use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use log::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

mod api;
mod blockchain;

use api::handlers::NodeState;

/// Command line options for the node
#[derive(Parser, Debug)]
#[command(name = "nodechain", about = "A proof-of-work blockchain node")]
struct Args {
    /// Port for the HTTP server
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Address to bind the HTTP server to
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::node_info,
        api::handlers::get_chain,
        api::handlers::get_pending_transactions,
        api::handlers::new_transaction,
        api::handlers::mine,
        api::handlers::register_nodes,
        api::handlers::resolve_consensus
    ),
    components(
        schemas(
            blockchain::Block,
            blockchain::Transaction,
            api::handlers::ChainResponse,
            api::handlers::TransactionRequest,
            api::handlers::TransactionResponse,
            api::handlers::MineResponse,
            api::handlers::RegisterNodesRequest,
            api::handlers::RegisterNodesResponse,
            api::handlers::ResolveResponse
        )
    ),
    tags(
        (name = "blockchain", description = "Blockchain node API endpoints")
    ),
    info(
        title = "Blockchain Node API",
        version = "1.0.0",
        description = "A proof-of-work blockchain node with longest-chain consensus",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = Args::parse();

    // Generate an identifier for this node, fixed for the process lifetime
    let node_id = Uuid::new_v4().simple().to_string();
    info!("Node identifier: {}", node_id);

    let state = web::Data::new(NodeState {
        blockchain: blockchain::Blockchain::new(),
        node_id,
    });

    info!("Starting HTTP server at http://{}:{}", args.bind, args.port);

    // Start HTTP server
    HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        // Configure OpenAPI documentation
        let openapi = ApiDoc::openapi();

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(state.clone())
            // API routes
            .configure(api::configure_routes)
            // Swagger UI
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((args.bind.as_str(), args.port))?
    .run()
    .await
}
