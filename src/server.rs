//! # Server Configuration
//!
//! Router assembly, OpenAPI document and the serve loop.

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use tower_http::trace::TraceLayer;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{auth_middleware, license_middleware};
use crate::config::AppConfig;
use crate::handlers::{self, licenses, obligations, parties, reports, users};
use crate::telemetry::trace_id_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    // Tenant data: requires a valid license unless the caller is a superadmin
    let tenant_routes = Router::new()
        .route(
            "/parties",
            get(parties::list_parties).post(parties::create_party),
        )
        .route("/parties/counts", get(parties::party_counts))
        .route(
            "/parties/{id}",
            get(parties::get_party)
                .patch(parties::update_party)
                .delete(parties::delete_party),
        )
        .route("/parties/{id}/deactivate", post(parties::deactivate_party))
        .route(
            "/obligations",
            get(obligations::list_obligations).post(obligations::create_obligation),
        )
        .route("/obligations/plans", post(obligations::create_plan))
        .route(
            "/obligations/{id}",
            get(obligations::get_obligation).patch(obligations::update_obligation),
        )
        .route("/obligations/{id}/settle", post(obligations::settle_obligation))
        .route("/obligations/{id}/cancel", post(obligations::cancel_obligation))
        .route("/obligations/{id}/split", post(obligations::split_obligation))
        .route("/obligations/groups/{group_id}", get(obligations::get_group))
        .route(
            "/obligations/groups/{group_id}/reschedule",
            post(obligations::reschedule_group),
        )
        .route("/reports/cash-flow", get(reports::cash_flow))
        .route("/reports/overdue", get(reports::overdue))
        .route("/reports/dashboard", get(reports::dashboard))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/{id}/admin", put(users::set_user_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            license_middleware,
        ));

    let license_routes = Router::new()
        .route(
            "/licenses",
            get(licenses::list_licenses).post(licenses::issue_license),
        )
        .route("/licenses/dashboard", get(licenses::license_dashboard))
        .route(
            "/licenses/{id}",
            get(licenses::get_license)
                .patch(licenses::update_license)
                .delete(licenses::delete_license),
        )
        .route("/licenses/{id}/renew", post(licenses::renew_license))
        .route("/licenses/{id}/activate", post(licenses::activate_license))
        .route(
            "/licenses/{id}/deactivate",
            post(licenses::deactivate_license),
        );

    let api = tenant_routes
        .merge(license_routes)
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state.config),
            auth_middleware,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .nest("/api/v1", api)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id_middleware))
}

/// Binds the configured address and serves until the process is stopped
pub async fn run_server(config: Arc<AppConfig>, db: DatabaseConnection) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let state = AppState {
        config: Arc::clone(&config),
        db,
    };
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, profile = %config.profile, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .description(Some("Gateway token"))
                    .build(),
            ),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::readyz,
        crate::handlers::parties::list_parties,
        crate::handlers::parties::create_party,
        crate::handlers::parties::party_counts,
        crate::handlers::parties::get_party,
        crate::handlers::parties::update_party,
        crate::handlers::parties::deactivate_party,
        crate::handlers::parties::delete_party,
        crate::handlers::obligations::list_obligations,
        crate::handlers::obligations::create_obligation,
        crate::handlers::obligations::create_plan,
        crate::handlers::obligations::get_obligation,
        crate::handlers::obligations::update_obligation,
        crate::handlers::obligations::settle_obligation,
        crate::handlers::obligations::cancel_obligation,
        crate::handlers::obligations::split_obligation,
        crate::handlers::obligations::get_group,
        crate::handlers::obligations::reschedule_group,
        crate::handlers::reports::cash_flow,
        crate::handlers::reports::overdue,
        crate::handlers::reports::dashboard,
        crate::handlers::licenses::list_licenses,
        crate::handlers::licenses::issue_license,
        crate::handlers::licenses::license_dashboard,
        crate::handlers::licenses::get_license,
        crate::handlers::licenses::update_license,
        crate::handlers::licenses::delete_license,
        crate::handlers::licenses::renew_license,
        crate::handlers::licenses::activate_license,
        crate::handlers::licenses::deactivate_license,
        crate::handlers::users::list_users,
        crate::handlers::users::create_user,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::set_user_admin,
        crate::handlers::users::delete_user,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::tenant::TenantId,
            crate::handlers::types::HealthStatus,
            crate::handlers::types::CreateObligationRequest,
            crate::handlers::types::CreatePlanRequest,
            crate::handlers::types::CancelRequest,
            crate::handlers::types::ObligationView,
            crate::handlers::types::RenewRequest,
            crate::handlers::types::SetAdminRequest,
            crate::models::party::Model,
            crate::models::party::PartyKind,
            crate::models::party::PartyStatus,
            crate::models::obligation::Model,
            crate::models::obligation::Direction,
            crate::models::obligation::ObligationStatus,
            crate::models::license::Model,
            crate::models::license::PaymentStatus,
            crate::models::user::Model,
            crate::models::user::UserStatus,
            crate::repositories::party::NewParty,
            crate::repositories::party::PartyChanges,
            crate::repositories::party::PartyKindCount,
            crate::repositories::obligation::NewObligation,
            crate::repositories::obligation::NewInstallmentPlan,
            crate::repositories::obligation::Settlement,
            crate::repositories::obligation::Reschedule,
            crate::repositories::obligation::ObligationChanges,
            crate::repositories::license::IssueLicense,
            crate::repositories::license::LicenseChanges,
            crate::repositories::license::LicenseDashboard,
            crate::repositories::user::NewUser,
            crate::repositories::user::UserChanges,
            crate::reports::CashFlowReport,
            crate::reports::CashFlowSummary,
            crate::reports::CashFlowItem,
            crate::reports::OverdueReport,
            crate::reports::OverdueItem,
            crate::reports::Totals,
            crate::reports::DashboardSummary,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "root", description = "Service metadata and probes"),
        (name = "parties", description = "Customers, suppliers and other counterparties"),
        (name = "obligations", description = "Payables, receivables and installment groups"),
        (name = "reports", description = "Cash flow, overdue book and dashboard"),
        (name = "licenses", description = "Tenant entitlements"),
        (name = "users", description = "Tenant members"),
    ),
    info(
        title = "Bookkeeping Ledger API",
        description = "Multi-tenant accounts payable and receivable",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
