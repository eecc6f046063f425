use std::net::SocketAddr;
use std::sync::Arc;

use authhub_auth::{InMemoryDirectory, PipelineStores, TracingAuditEmitter};

#[tokio::main]
async fn main() {
    authhub_observability::init();

    let config = authhub_api::config::AuthConfig::from_env();

    // Demo wiring: an in-memory directory. Real deployments implement the
    // store traits against their own persistence.
    let directory = Arc::new(InMemoryDirectory::new());
    let stores = PipelineStores {
        users: directory.clone(),
        roles: directory.clone(),
        role_permissions: directory.clone(),
        catalog: directory,
    };

    let app = authhub_api::app::build_app(&config, stores, Arc::new(TracingAuditEmitter))
        .expect("failed to build app");

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080")
        .await
        .expect("failed to bind 0.0.0.0:8080");

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    // ConnectInfo feeds the peer-address fallback in the audit middleware.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
