use typed_jsonrpc::{build_app, config::Config, domain, logging, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let server = domain::build_server()?;
    let bind_socket = config.bind_socket()?;

    info!(methods = ?server.methods(), "rpc methods registered");

    let app = build_app(AppState::new(server));
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        "server starting"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
