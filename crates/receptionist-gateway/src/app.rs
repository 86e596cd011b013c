use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use receptionist_audit::SqliteAuditStore;
use receptionist_booking::{NoopCalendarClient, NoopSmsClient, SqliteBookingStore};
use receptionist_core::config::AppConfig;
use receptionist_customers::CustomerManager;
use receptionist_llm::FallbackLlmClient;
use receptionist_orchestrator::TurnOrchestrator;
use receptionist_scenarios::StaticScenarioRetriever;
use receptionist_scheduler::SchedulerHandle;
use receptionist_sessions::SqliteSessionStore;

use crate::company_store::{CachedCompanyStore, CompanyStore, StaticCompanyStore, DEFAULT_TTL};

/// Central shared state passed as `Arc<AppState>` to every Axum handler —
/// config plus one field per subsystem manager.
pub struct AppState {
    pub config: AppConfig,
    pub companies: CachedCompanyStore<StaticCompanyStore>,
    pub orchestrator: TurnOrchestrator,
    pub customers: CustomerManager,
    #[allow(dead_code)]
    pub scheduler: SchedulerHandle,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        // One SQLite connection per owning store — each manager wraps its
        // own `Mutex<Connection>`, so they all open the same file
        // independently rather than sharing a handle.
        let sessions_conn = rusqlite::Connection::open(&config.database.path)?;
        receptionist_sessions::db::init_db(&sessions_conn)?;
        let session_store = Arc::new(SqliteSessionStore::new(sessions_conn));

        let booking_conn = rusqlite::Connection::open(&config.database.path)?;
        receptionist_booking::db::init_db(&booking_conn)?;
        let booking_store = Arc::new(SqliteBookingStore::new(booking_conn));

        let audit_conn = rusqlite::Connection::open(&config.database.path)?;
        let audit_store = Arc::new(SqliteAuditStore::new(audit_conn)?);

        let customers_conn = rusqlite::Connection::open(&config.database.path)?;
        receptionist_customers::db::init_db(&customers_conn)?;
        let customers = CustomerManager::new(customers_conn);

        let scheduler_conn = rusqlite::Connection::open(&config.database.path)?;
        let scheduler = SchedulerHandle::new(scheduler_conn)?;

        let scenario_retriever = Arc::new(StaticScenarioRetriever::empty());
        let llm_client = Arc::new(FallbackLlmClient::new());
        let calendar_client = Arc::new(NoopCalendarClient);
        let sms_client = Arc::new(NoopSmsClient);

        let tier1_threshold = config.global.thresholds.tier1;
        let orchestrator = TurnOrchestrator::new(
            session_store,
            scenario_retriever,
            llm_client,
            booking_store,
            calendar_client,
            sms_client,
            audit_store,
            tier1_threshold,
        );

        let companies = CachedCompanyStore::new(StaticCompanyStore::with_demo_tenant(), DEFAULT_TTL);

        Ok(Self {
            config,
            companies,
            orchestrator,
            customers,
            scheduler,
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/turn", post(crate::http::turn::turn_handler))
        .route("/webhooks/{source}", post(crate::http::webhooks::webhook_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
