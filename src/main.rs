use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use bus_booking::{
    config::Settings,
    route_handler::{
        breakdown_handler, bus_catalog_handler, close_session_handler, command_handler,
        list_routes, notifications_handler, open_session_handler, query_handler,
        receipt_handler, route_catalog_handler, update_fare_handler,
    },
    state::new_application_state,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::from_env()?;
    let state = new_application_state(&settings)?;
    // Sessions live under /booking: POST opens one, GET reads its view, a
    // POST to the session id applies the next wizard action and DELETE ends it.
    let router = Router::new()
        .route("/routes", get(list_routes))
        .route("/routes/{route_id}/breakdown", get(breakdown_handler))
        .route("/admin/fares/{route_id}", post(update_fare_handler))
        .route("/admin/routes", post(route_catalog_handler))
        .route("/admin/buses", post(bus_catalog_handler))
        .route("/booking", post(open_session_handler))
        .route(
            "/booking/{session_id}",
            get(query_handler)
                .post(command_handler)
                .delete(close_session_handler),
        )
        .route(
            "/booking/{session_id}/notifications",
            get(notifications_handler),
        )
        .route("/booking/{session_id}/receipt", get(receipt_handler))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    tracing::info!(%addr, language = settings.language.code(), "listening");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;
    Ok(())
}
