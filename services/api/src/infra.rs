use crate::routes::with_student_routes;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use student_management::config::DatabaseConfig;
use student_management::error::AppError;
use student_management::students::postgres::{connect, run_migrations};
use student_management::students::{
    MemoryStudentRepository, PgStudentRepository, StudentService,
};
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Persistence backend selected from configuration.
pub(crate) enum Store {
    Memory(Arc<MemoryStudentRepository>),
    Postgres(Arc<PgStudentRepository>),
}

impl Store {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Postgres(_) => "postgres",
        }
    }

    /// Builds the student routes on top of a service bound to this store.
    pub(crate) fn router(self) -> axum::Router {
        match self {
            Store::Memory(repository) => {
                with_student_routes(Arc::new(StudentService::new(repository)))
            }
            Store::Postgres(repository) => {
                with_student_routes(Arc::new(StudentService::new(repository)))
            }
        }
    }
}

/// Connects to PostgreSQL when `DATABASE_URL` is set, otherwise falls back to memory.
pub(crate) async fn open_store(config: &DatabaseConfig) -> Result<Store, AppError> {
    if config.url.is_none() {
        warn!("DATABASE_URL is not set; student data will only live in memory");
        return Ok(Store::Memory(Arc::new(MemoryStudentRepository::new())));
    }

    let pool = connect(config).await?;
    if config.run_migrations {
        run_migrations(&pool).await?;
        info!("database migrations applied");
    }

    Ok(Store::Postgres(Arc::new(PgStudentRepository::new(pool))))
}
