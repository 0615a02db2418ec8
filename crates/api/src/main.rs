use akademi_api::app::{build_app, AppServices};
use akademi_api::config::ApiConfig;

#[tokio::main]
async fn main() {
    akademi_observability::init();

    let config = ApiConfig::from_env();

    let services = match &config.database_url {
        Some(url) => {
            let store = akademi_infra::PostgresStore::connect(url)
                .await
                .expect("failed to connect to database");
            AppServices::postgres(store, &config.jwt_secret)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            AppServices::in_memory(&config.jwt_secret)
        }
    };

    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {e}", config.bind_addr));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
