use std::sync::Arc;

use log::*;
use tokio::{
    net::TcpListener,
    signal::{self, ctrl_c},
};

use fruver_shipping::{
    config::Config,
    routes,
    services::{
        estimator::ShippingEstimator, geocoding::OpenRouteServiceGeocoder, routing::OsrmRouter,
    },
    GenericError,
};

#[tokio::main]
async fn main() -> Result<(), GenericError> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("fruver_shipping=info"),
    )
    .init();
    trace!("Logger initialized.");

    let config = Config::from_env()?;

    let client = reqwest::Client::builder()
        .timeout(config.upstream_timeout)
        .build()?;
    let geocoder = OpenRouteServiceGeocoder::new(
        client.clone(),
        &config.ors_base_url,
        &config.ors_api_key,
    );
    let router = OsrmRouter::new(client, &config.osrm_base_url);

    let estimator = ShippingEstimator::new(
        Arc::new(geocoder),
        Arc::new(router),
        config.origin,
        config.price_table.clone(),
    )
    .with_search_radius(config.search_radius_meters)
    .with_free_shipping_threshold(config.free_shipping_threshold)
    .with_retry(config.retry);
    info!(
        "Origin {}, search radius {} m, {} price tiers.",
        estimator.origin(),
        config.search_radius_meters,
        config.price_table.tiers().len()
    );

    let app = routes::router(Arc::new(estimator));

    let address = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(why) = ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {:?}", why);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(why) => {
                warn!("Failed to install SIGTERM handler: {:?}", why);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
