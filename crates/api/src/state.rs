use std::sync::Arc;

use kb_core::DocumentService;
use sqlx::PgPool;

use crate::config::AppConfig;

/// Shared application state, passed to all handlers via Axum's `State` extractor.
/// Wrapped in `Arc` so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    service: DocumentService,
    config: AppConfig,
    /// Present when the service runs on Postgres.
    pool: Option<PgPool>,
}

impl AppState {
    pub fn new(service: DocumentService, config: AppConfig, pool: Option<PgPool>) -> Self {
        Self {
            inner: Arc::new(InnerState {
                service,
                config,
                pool,
            }),
        }
    }

    pub fn service(&self) -> &DocumentService {
        &self.inner.service
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }
}
