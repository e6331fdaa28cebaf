use axum::{
    Extension, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use handlebars::Handlebars;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};

use crate::config::Config;
use crate::downloader;
use crate::graph::{self, ChartError, GraphOptions};
use crate::login::{self, AccessGate, AuthSession, SessionStore};
use crate::record::Recommendation;
use crate::report::{self, ReportError};
use crate::service::{DataService, Dataset};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Shared application state
///
/// The data service is read-only after start-up; only the session store changes.
pub struct AppState {
    pub service: DataService,
    pub gate: AccessGate,
    pub sessions: SessionStore,
    pub templates: Handlebars<'static>,
}

impl AppState {
    /// Assemble the state from loaded data and configuration
    ///
    /// # Returns
    /// * `Result<AppState, Box<dyn std::error::Error>>` - Fails if the password cannot be
    ///   hashed or a template does not compile
    pub fn new(config: &Config, service: DataService) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(AppState {
            service,
            gate: AccessGate::new(&config.password)?,
            sessions: SessionStore::new(config.session_lifetime()),
            templates: templates()?,
        })
    }
}

fn templates() -> Result<Handlebars<'static>, handlebars::TemplateError> {
    let mut hb = Handlebars::new();
    hb.set_strict_mode(false);
    hb.register_partial("sidebar", include_str!("./static/sidebar.hbs"))?;
    hb.register_template_string("login", include_str!("./static/login.hbs"))?;
    hb.register_template_string("dashboard", include_str!("./static/dashboard.hbs"))?;
    hb.register_template_string("message", include_str!("./static/message.hbs"))?;
    Ok(hb)
}

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let dashboard = Router::new()
        .route("/dashboard", get(serve_dashboard))
        .route("/dashboard/details/:rank", post(toggle_details))
        .route("/dashboard/charts/final-scores.png", get(final_score_chart))
        .route("/dashboard/charts/score-profile.png", get(score_profile_chart))
        .route("/dashboard/export.csv", get(export_csv))
        .route("/dashboard/export.xlsx", get(export_xlsx))
        .route_layer(middleware::from_fn_with_state(state.clone(), login::require_auth));

    Router::new()
        .route("/", get(serve_root))
        .route(
            "/login",
            get(login::serve_login_page).post(login::handle_login),
        )
        .route("/logout", post(login::handle_logout))
        .merge(dashboard)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
        )
        .with_state(state)
}

/// Load the data, then serve until the process is stopped
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let service = DataService::load(&config);
    let state = Arc::new(AppState::new(&config, service)?);
    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind).await?;
    log::info!("Listening on http://{}", config.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Render a registered template, answering 500 if rendering fails
pub fn render(state: &AppState, name: &str, data: &serde_json::Value) -> Response {
    match state.templates.render(name, data) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            log::error!("failed to render {}: {}", name, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Rendering error").into_response()
        }
    }
}

fn render_message(state: &AppState, status: StatusCode, title: &str, data: serde_json::Value) -> Response {
    let mut data = data;
    data["title"] = json!(title);
    let mut response = render(state, "message", &data);
    if response.status() == StatusCode::OK {
        *response.status_mut() = status;
    }
    response
}

async fn serve_root(State(state): State<Arc<AppState>>, jar: CookieJar) -> Redirect {
    match login::current_session(&state, &jar) {
        Some(_) => Redirect::to("/dashboard"),
        None => Redirect::to("/login"),
    }
}

async fn serve_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
) -> Response {
    let dataset = match state.service.dataset() {
        Ok(dataset) => dataset,
        Err(e) => {
            return render_message(
                &state,
                StatusCode::OK,
                "Data could not be loaded",
                json!({
                    "message": e.to_string(),
                    "student_id": auth.student_id,
                }),
            );
        }
    };

    match report::build_report(dataset, state.service.links(), &auth.student_id, auth.expanded) {
        Ok(report) => {
            let has_profile = !graph::score_profile(&report::ranked_records(dataset, &auth.student_id))
                .is_empty();
            let data = json!({
                "report": report,
                "has_profile": has_profile,
                "notice": state.service.links_notice(),
                "student_id": report.student_id,
                "sidebar": {
                    "name": report.name,
                    "total": report.total,
                },
            });
            render(&state, "dashboard", &data)
        }
        Err(ReportError::UnknownStudent {
            student_id,
            total,
            sample,
            remaining,
        }) => render_message(
            &state,
            StatusCode::OK,
            "No data for this student",
            json!({
                "message": format!("No recommendations were found for student {}.", student_id),
                "student_id": student_id,
                "known": {
                    "total": total,
                    "sample": sample,
                    "remaining": remaining,
                },
            }),
        ),
    }
}

async fn toggle_details(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
    Path(rank): Path<u32>,
) -> Redirect {
    state.sessions.toggle_expanded(&auth.session_id, rank);
    Redirect::to("/dashboard")
}

/// The logged-in student's recommendations by rank, or the status to answer with
fn student_records<'a>(state: &'a AppState, auth: &AuthSession) -> Result<(&'a Dataset, Vec<&'a Recommendation>), StatusCode> {
    let dataset = state
        .service
        .dataset()
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    let records = report::ranked_records(dataset, &auth.student_id);
    if records.is_empty() {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok((dataset, records))
}

fn png_response(result: Result<Vec<u8>, ChartError>) -> Response {
    match result {
        Ok(png) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        Err(ChartError::NoData) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            log::error!("chart rendering failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn final_score_chart(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
) -> Response {
    match student_records(&state, &auth) {
        Ok((_, records)) => png_response(graph::render_final_scores(
            &graph::final_score_bars(&records),
            &GraphOptions::final_scores(),
        )),
        Err(status) => status.into_response(),
    }
}

async fn score_profile_chart(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
) -> Response {
    match student_records(&state, &auth) {
        Ok((_, records)) => png_response(graph::render_score_profile(
            &graph::score_profile(&records),
            &GraphOptions::score_profile(),
        )),
        Err(status) => status.into_response(),
    }
}

async fn export_csv(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
) -> Response {
    let dataset = match student_records(&state, &auth) {
        Ok((dataset, _)) => dataset,
        Err(status) => return status.into_response(),
    };
    match downloader::to_csv(&dataset.student_table(&auth.student_id)) {
        Ok(bytes) => attachment(
            "text/csv; charset=utf-8",
            &downloader::export_file_name(&auth.student_id, "csv"),
            bytes,
        ),
        Err(e) => {
            log::error!("CSV export failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn export_xlsx(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthSession>,
) -> Response {
    let dataset = match student_records(&state, &auth) {
        Ok((dataset, _)) => dataset,
        Err(status) => return status.into_response(),
    };
    match downloader::to_xlsx(&dataset.student_table(&auth.student_id)) {
        Ok(bytes) => attachment(
            XLSX_MIME,
            &downloader::export_file_name(&auth.student_id, "xlsx"),
            bytes,
        ),
        Err(e) => {
            log::error!("XLSX export failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn attachment(content_type: &str, file_name: &str, bytes: Vec<u8>) -> Response {
    // Plain ASCII fallback for clients that ignore filename*
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    );
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}
