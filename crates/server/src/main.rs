//! campus-access server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware};
use campus_api::{middleware::AppState, router as api_router};
use campus_common::{AuditMode, Config};
use campus_core::{
    AccessService, AuditLogger, AuditService, AuditSinkService, DatabaseAuditSink,
    PaymentApprovalService, RegistrationPolicy, RegistrationReviewService, RegistrationService,
    SemesterPeriodService, SystemClock, audit_channel,
};
use campus_db::repositories::{
    AccessControlLogRepository, FinancialRecordRepository, PaymentApprovalRepository,
    RegistrationRepository, SemesterPeriodRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_access=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting campus-access server...");

    // Load configuration
    let config = Config::load()?;
    let tz = config.policy.tz()?;
    info!(timezone = %tz, "Access windows evaluated in institution time zone");

    // Connect to database
    let db = Arc::new(campus_db::init(&config).await?);
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    campus_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let payment_approval_repo = PaymentApprovalRepository::new(Arc::clone(&db));
    let registration_repo = RegistrationRepository::new(Arc::clone(&db));
    let semester_period_repo = SemesterPeriodRepository::new(Arc::clone(&db));
    let financial_record_repo = FinancialRecordRepository::new(Arc::clone(&db));
    let access_log_repo = AccessControlLogRepository::new(Arc::clone(&db));

    // Audit trail
    let database_sink: AuditSinkService = Arc::new(DatabaseAuditSink::new(access_log_repo.clone()));
    let (audit_sink, audit_writer) = match config.audit.mode {
        AuditMode::Direct => (database_sink, None),
        AuditMode::Channel => {
            let (sink, writer) = audit_channel(config.audit.buffer_size, database_sink);
            let sink: AuditSinkService = Arc::new(sink);
            info!(buffer = config.audit.buffer_size, "Audit writer started");
            (sink, Some(writer.spawn()))
        }
    };
    let audit = AuditLogger::new(audit_sink);

    let clock = Arc::new(SystemClock::new(tz));

    // Initialize services
    let access_service = AccessService::new(
        payment_approval_repo.clone(),
        registration_repo.clone(),
        semester_period_repo.clone(),
        financial_record_repo,
        audit.clone(),
        clock.clone(),
    );
    let registration_service = RegistrationService::new(
        Arc::clone(&db),
        audit.clone(),
        clock.clone(),
        RegistrationPolicy::from_config(&config.policy),
    );
    let payment_approval_service =
        PaymentApprovalService::new(payment_approval_repo, audit.clone(), clock.clone());
    let registration_review_service = RegistrationReviewService::new(registration_repo, audit);
    let semester_period_service = SemesterPeriodService::new(semester_period_repo, clock);
    let audit_service = AuditService::new(access_log_repo);

    let state = AppState {
        access_service,
        registration_service,
        payment_approval_service,
        registration_review_service,
        semester_period_service,
        audit_service,
    };

    // Build router
    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn(campus_api::middleware::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router held the last senders; the writer exits once the backlog is written.
    if let Some(handle) = audit_writer {
        info!("Flushing audit entries");
        if let Err(e) = handle.await {
            error!(error = %e, "Audit writer terminated abnormally");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}
