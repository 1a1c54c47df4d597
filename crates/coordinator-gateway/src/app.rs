use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use coordinator_adapters::{
    Adapter, CalendarMailAdapter, LlmAdapter, TabularStoreAdapter, TransportAdapter,
    WebhookTargetAdapter,
};
use coordinator_classify::IntentClassifier;
use coordinator_core::config::CoordinatorConfig;
use coordinator_db::{
    AuditRepo, ConversationRepo, OutboxRepo, Pool, ProcessedUpdateRepo, TaskRepo, TeamRepo,
};
use coordinator_sessions::SessionStore;
use coordinator_tasks::StaticAssigneeDirectory;
use tokio::sync::Semaphore;

use crate::ratelimit::RateLimiters;

/// Caps concurrently in-flight webhook-dialog handoffs.
const MAX_CONCURRENT_DIALOGS: usize = 32;

/// Shared state for every Axum handler. Holds owned repositories (each a
/// thin wrapper over a cloned [`Pool`]) and owned adapters/engines rather
/// than references, so it can live behind a single `Arc` for the life of
/// the process.
pub struct AppState {
    pub config: CoordinatorConfig,
    pub pool: Pool,
    pub conversation_repo: ConversationRepo,
    pub task_repo: TaskRepo,
    pub team_repo: TeamRepo,
    pub audit_repo: AuditRepo,
    pub outbox_repo: OutboxRepo,
    pub processed_update_repo: ProcessedUpdateRepo,
    pub session_store: Arc<SessionStore>,
    pub classifier: IntentClassifier,
    pub tabular_store_adapter: Option<Arc<TabularStoreAdapter>>,
    pub static_assignee_directory: StaticAssigneeDirectory,
    pub dialog_semaphore: Arc<Semaphore>,
    pub rate_limiters: RateLimiters,
}

impl AppState {
    pub fn new(
        config: CoordinatorConfig,
        pool: Pool,
        session_store: Arc<SessionStore>,
        llm: LlmAdapter,
        tabular_store_adapter: Option<Arc<TabularStoreAdapter>>,
    ) -> Self {
        let rate_limiters =
            RateLimiters::new(config.rate_limit.authenticated, config.rate_limit.public);
        Self {
            conversation_repo: ConversationRepo::new(pool.clone()),
            task_repo: TaskRepo::new(pool.clone()),
            team_repo: TeamRepo::new(pool.clone()),
            audit_repo: AuditRepo::new(pool.clone()),
            outbox_repo: OutboxRepo::new(pool.clone()),
            processed_update_repo: ProcessedUpdateRepo::new(pool.clone()),
            pool,
            session_store,
            classifier: IntentClassifier::new(llm),
            tabular_store_adapter,
            static_assignee_directory: StaticAssigneeDirectory::default(),
            dialog_semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_DIALOGS)),
            rate_limiters,
            config,
        }
    }

    /// Fresh task processor borrowing this request's `AppState`. Cheap:
    /// every field is a reference into already-owned state.
    pub fn task_processor(&self) -> coordinator_tasks::TaskProcessor<'_> {
        coordinator_tasks::TaskProcessor {
            task_repo: &self.task_repo,
            team_repo: &self.team_repo,
            audit_repo: &self.audit_repo,
            outbox_repo: &self.outbox_repo,
            assignee_resolver: coordinator_tasks::AssigneeResolver {
                team_repo: &self.team_repo,
                tabular_store: self.tabular_store_adapter.as_deref(),
                static_directory: &self.static_assignee_directory,
            },
        }
    }
}

/// Builds the five adapters from config, returning `(outbox_adapters,
/// tabular_store_adapter, llm)` — the outbox gets a boxed trait object for
/// every configured collaborator; the gateway keeps its own typed handle to
/// the tabular store and the LLM for the dialog/task layers.
pub fn build_adapters(
    config: &CoordinatorConfig,
) -> (Vec<Arc<dyn Adapter>>, Option<Arc<TabularStoreAdapter>>, LlmAdapter) {
    let mut adapters: Vec<Arc<dyn Adapter>> = Vec::new();

    let transport = Arc::new(TransportAdapter::new(
        config.transport.base_url.clone(),
        config.transport.token.clone(),
    ));
    adapters.push(transport);

    adapters.push(Arc::new(WebhookTargetAdapter::new()));

    // Two independent clients: one boxed for the outbox's own completion
    // calls, one owned by the classifier. Neither holds mutable state, so
    // running two connections to the same endpoint costs nothing but a
    // socket.
    adapters.push(Arc::new(LlmAdapter::new(
        config.llm.base_url.clone(),
        config.llm.api_key.clone(),
        config.llm.model.clone(),
    )));
    let llm = LlmAdapter::new(
        config.llm.base_url.clone(),
        config.llm.api_key.clone(),
        config.llm.model.clone(),
    );

    let tabular_store_adapter = config.tabular_store.base_url.as_ref().map(|base_url| {
        let adapter = Arc::new(TabularStoreAdapter::new(
            base_url.clone(),
            config.tabular_store.api_key.clone().unwrap_or_default(),
        ));
        adapters.push(adapter.clone() as Arc<dyn Adapter>);
        adapter
    });

    if let Some(base_url) = &config.calendar_mail.base_url {
        adapters.push(Arc::new(CalendarMailAdapter::new(base_url.clone())));
    }

    (adapters, tabular_store_adapter, llm)
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/health/db", get(crate::http::health::health_db_handler))
        .route(
            "/webhook/{transport}",
            post(crate::http::webhooks::webhook_handler),
        )
        .route(
            "/admin/{action}",
            post(crate::http::admin::admin_handler),
        )
        .route(
            "/api/tasks",
            get(crate::http::api::list_tasks).post(crate::http::api::create_task),
        )
        .route(
            "/api/tasks/{task_id}",
            get(crate::http::api::get_task)
                .put(crate::http::api::update_task)
                .delete(crate::http::api::delete_task),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::ratelimit::rate_limit_middleware,
        ))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
