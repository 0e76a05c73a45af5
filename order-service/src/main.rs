use anyhow::Result;
use clap::Parser;
use diesel_async::{pooled_connection::bb8::Pool, pooled_connection::AsyncDieselConnectionManager, AsyncPgConnection};
use tracing::info;
use tracing_subscriber::EnvFilter;

use order_service::api::{self, AppState};
use order_service::config::Config;
use order_service::uploads::ProofStore;
use order_service::workflow::OrderWorkflow;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let config = Config::parse();

    // Migrations run on a blocking connection before the pool exists
    order_service::run_migrations(&config.database_url)?;

    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);
    let pool = Pool::builder().build(manager).await?;

    let app_state = AppState {
        workflow: OrderWorkflow::new(pool, config.shipping_cost.clone()),
        proofs: ProofStore::new(&config.upload_dir, config.max_proof_bytes),
    };

    let app = api::create_router(app_state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    info!(
        "Order service started on port {} (uploads in {}, shipping cost {})",
        config.port,
        config.upload_dir.display(),
        config.shipping_cost
    );
    info!("Ready to accept HTTP requests at http://0.0.0.0:{}/orders", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
