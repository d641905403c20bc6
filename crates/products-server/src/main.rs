use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod config;
mod db;
mod routes;

#[derive(Clone)]
pub struct AppState {
    pub db: db::Database,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "products_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env();

    let database = db::Database::new(&config.database_url, config.max_connections)
        .await
        .expect("failed to initialize database");

    if config.seed {
        database.seed().await.expect("failed to seed database");
    }

    let app = routes::app(AppState { db: database });

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");
    tracing::info!(
        address = %addr,
        database_url = %config.database_url,
        "products server listening"
    );
    axum::serve(listener, app).await.expect("server error");
}
