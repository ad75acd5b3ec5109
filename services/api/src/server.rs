use crate::cli::ServeArgs;
use crate::demo;
use crate::infra::{AppState, InMemoryBackends};
use crate::routes::with_compliance_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use remit_compliance::config::AppConfig;
use remit_compliance::error::AppError;
use remit_compliance::telemetry;
use remit_compliance::workflows::remittance::RemittanceComplianceService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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

    let backends = InMemoryBackends::new();
    if args.seed_demo {
        demo::seed(&backends, Utc::now().date_naive());
        info!("seeded in-memory marketplace with demo lawyers");
    }

    let mut service = RemittanceComplianceService::new(backends.collaborators(), &config.compliance);
    if args.exactly_once {
        service = service.with_reminder_ledger(Arc::new(backends.ledger.clone()));
    }
    if config.compliance.cron_secret.is_none() {
        warn!("REMITTANCE_CRON_SECRET is not set; every run trigger will be rejected");
    }

    let app = with_compliance_routes(Arc::new(service), config.compliance.cron_secret.clone())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        cadence = ?config.compliance.cadence_mode,
        "remittance compliance service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
