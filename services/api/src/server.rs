use crate::cli::ServeArgs;
use crate::infra::{seed_catalog, AppState};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use civil_registry::config::AppConfig;
use civil_registry::error::AppError;
use civil_registry::registry::{
    InMemoryRegistryStore, LocalBlobStore, RegistryService, ServiceError, SmsClient,
};
use civil_registry::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryRegistryStore::default());
    seed_catalog(&store).map_err(ServiceError::from)?;

    std::fs::create_dir_all(&config.storage.media_root)?;
    let blobs = Arc::new(LocalBlobStore::from_config(&config.storage));
    let sms = Arc::new(SmsClient::from_config(&config.sms)?);
    let registry_service = Arc::new(RegistryService::new(
        store,
        blobs,
        sms,
        &config.sms,
        config.registry,
    ));

    let app = with_operational_routes(registry_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        media_root = %config.storage.media_root.display(),
        sms_enabled = config.sms.is_configured(),
        "civil registry service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
