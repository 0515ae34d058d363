use anyhow::Context;

use prodreview_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    prodreview_observability::init();

    let config = ApiConfig::from_env()?;
    let app = prodreview_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        review_create_rate = %config.review_create_rate,
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
