mod routes;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use spellbee_core::{Config, ContestService};
use tower_http::cors::{Any, CorsLayer};

const PRUNE_EVERY: Duration = Duration::from_secs(300);

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Blocking HTTP clients must be built outside the async runtime.
    let store = match config.open_store() {
        Ok(store) => store,
        Err(e) => {
            log::error!("could not open missed-word store: {e}");
            return ExitCode::FAILURE;
        }
    };
    let pronouncer = match config.pronouncer() {
        Ok(pronouncer) => pronouncer,
        Err(e) => {
            log::error!("could not set up pronunciation: {e}");
            return ExitCode::FAILURE;
        }
    };

    let service = Arc::new(ContestService::new(
        config.catalog(),
        store,
        pronouncer,
        config.max_word_id,
    ));

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("could not start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(serve(config, service)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("server error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: Config, service: Arc<ContestService>) -> std::io::Result<()> {
    let pruner = Arc::clone(&service);
    let ttl = config.session_ttl;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PRUNE_EVERY);
        loop {
            interval.tick().await;
            pruner.prune_sessions(ttl);
        }
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router(service).layer(cors);

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    log::info!("listening on http://{}", config.bind);
    axum::serve(listener, app).await
}
