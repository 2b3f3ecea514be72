//! HTTP route layer for a single prospecting tool.
//!
//! Every mutating handler follows the same path: take the tool's write lock,
//! load the store, apply the change, save (with backup), then answer with JSON.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::activity::{ActivityEntry, ActivityLog};
use crate::config::{Config, SegmentConfig};
use crate::engage;
use crate::error::TrackerError;
use crate::export;
use crate::import::{self, ImportRow, ManualEntry, UrlImport, MAX_ROWS, MAX_URLS};
use crate::models::{today, EngagementType, Prospect, SequenceType};
use crate::queue;
use crate::report;
use crate::sanitize::sanitize;
use crate::store::ProspectStore;
use crate::supervisor;
use crate::templates::{clean_templates, TemplateStore, Templates};
use crate::update::{self, BatchChanges, MAX_BATCH};

const DASHBOARD: &str = include_str!("../static/dashboard.html");
const DEFAULT_ACTIVITY_LIMIT: usize = 50;

/// Everything one tool instance needs: its segment and its files.
pub struct Tool {
    pub segment: SegmentConfig,
    pub store: ProspectStore,
    pub templates: TemplateStore,
    pub activity: ActivityLog,
    write_lock: Mutex<()>,
}

pub type SharedTool = Arc<Tool>;

impl Tool {
    pub fn new(config: &Config, segment: SegmentConfig) -> Self {
        let backups = config.backup_policy();
        Self {
            store: ProspectStore::new(segment.data_path(&config.data_dir), backups.clone()),
            templates: TemplateStore::new(segment.templates_path(&config.data_dir), backups),
            activity: ActivityLog::new(segment.activity_path(&config.data_dir), config.max_activity),
            segment,
            write_lock: Mutex::new(()),
        }
    }

    /// Activity is best effort; a failed write never fails the request.
    fn log_activity(&self, action: &str, prospect_name: &str, prospect_id: &str) {
        if let Err(e) = self.activity.record(action, prospect_name, prospect_id) {
            warn!(tool = %self.segment.key, error = %e, "failed to record activity");
        }
    }
}

pub fn create_router(tool: SharedTool, config: &Config) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/prospects", get(list_prospects).post(add_prospects))
        .route("/api/prospects/batch", post(batch_update))
        .route(
            "/api/prospects/:id",
            put(update_prospect).delete(delete_prospect),
        )
        .route("/api/prospects/:id/engage", post(engage_prospect))
        .route("/api/prospects/:id/skip", post(skip_prospect))
        .route("/api/queue", get(todays_queue))
        .route("/api/followups", get(follow_ups))
        .route("/api/alerts", get(alerts))
        .route("/api/stats", get(stats))
        .route("/api/reports", get(reports))
        .route("/api/import/urls", post(import_urls))
        .route("/api/import/csv", post(import_csv))
        .route("/api/export/csv", get(export_csv))
        .route("/api/templates", get(get_templates).put(put_templates))
        .route("/api/activity", get(activity))
        .nest_service("/static", ServeDir::new(&config.static_dir))
        .with_state(tool)
}

/// Binds the tool's port and serves until SIGINT/SIGTERM.
pub async fn serve(config: &Config, segment: SegmentConfig) -> anyhow::Result<()> {
    let addr = SocketAddr::new(config.bind, segment.port);
    let label = segment.label.clone();
    let tool = Arc::new(Tool::new(config, segment));

    // Create the data file up front so a bad data_dir fails at startup.
    let prospects = tool.store.load()?;
    info!(
        tool = %tool.segment.key,
        prospects = prospects.len(),
        data_file = %tool.store.path().display(),
        backups = tool.store.backup_count(),
        backup_dir = %tool.store.backups().dir.display(),
        "loaded prospect store"
    );

    let app = create_router(tool, config);
    let listener = TcpListener::bind(addr).await?;
    info!("{label} running at http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let signal = supervisor::shutdown_signal().await;
            info!("received {signal}, shutting down");
        })
        .await?;
    Ok(())
}

fn array_field<'a>(body: &'a Value, field: &str) -> Option<&'a Vec<Value>> {
    body.get(field).and_then(Value::as_array)
}

fn find(prospects: &[Prospect], id: &str) -> Result<usize, TrackerError> {
    prospects
        .iter()
        .position(|p| p.id == id)
        .ok_or_else(TrackerError::not_found)
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

pub async fn index(State(tool): State<SharedTool>) -> Html<String> {
    Html(DASHBOARD.replace("{{label}}", &sanitize(&tool.segment.label)))
}

pub async fn health() -> &'static str {
    "OK"
}

// ---------------------------------------------------------------------------
// Prospects
// ---------------------------------------------------------------------------

pub async fn list_prospects(
    State(tool): State<SharedTool>,
) -> Result<Json<Vec<Prospect>>, TrackerError> {
    Ok(Json(tool.store.load()?))
}

pub async fn add_prospects(
    State(tool): State<SharedTool>,
    Json(body): Json<Value>,
) -> Result<Json<import::AddSummary>, TrackerError> {
    let entries = match array_field(&body, "prospects") {
        Some(entries) if !entries.is_empty() => entries,
        _ => return Err(TrackerError::invalid("prospects array required")),
    };
    let entries: Vec<ManualEntry> = entries
        .iter()
        .map(|e| serde_json::from_value(e.clone()).unwrap_or_default())
        .collect();

    let _guard = tool.write_lock.lock().await;
    let mut prospects = tool.store.load()?;
    let summary = import::add_manual(&mut prospects, entries, tool.segment.audience, today());
    if summary.added > 0 {
        tool.store.save(&prospects)?;
        for id in &summary.added_ids {
            if let Some(p) = prospects.iter().find(|p| &p.id == id) {
                tool.log_activity("Added prospect", &p.name, &p.id);
            }
        }
    }
    Ok(Json(summary))
}

pub async fn update_prospect(
    State(tool): State<SharedTool>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Prospect>, TrackerError> {
    let patch = body
        .as_object()
        .ok_or_else(|| TrackerError::invalid("body must be an object"))?;

    let _guard = tool.write_lock.lock().await;
    let mut prospects = tool.store.load()?;
    let idx = find(&prospects, &id)?;

    let before = prospects[idx].status;
    update::apply_patch(&mut prospects[idx], patch)?;
    tool.store.save(&prospects)?;

    let prospect = prospects.swap_remove(idx);
    let action = if prospect.status != before {
        format!("Status changed to {}", prospect.status)
    } else {
        "Updated prospect".to_string()
    };
    tool.log_activity(&action, &prospect.name, &prospect.id);
    Ok(Json(prospect))
}

pub async fn batch_update(
    State(tool): State<SharedTool>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, TrackerError> {
    let ids = array_field(&body, "ids").ok_or_else(|| TrackerError::invalid("ids must be an array"))?;
    if ids.len() > MAX_BATCH {
        return Err(TrackerError::invalid(format!(
            "Maximum {MAX_BATCH} prospects per batch"
        )));
    }
    let updates = body
        .get("updates")
        .and_then(Value::as_object)
        .ok_or_else(|| TrackerError::invalid("updates must be an object"))?;

    let ids: Vec<String> = ids
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    let changes = BatchChanges::from_map(updates);

    let _guard = tool.write_lock.lock().await;
    let mut prospects = tool.store.load()?;
    let updated = update::batch_update(&mut prospects, &ids, &changes, today());
    if updated > 0 {
        tool.store.save(&prospects)?;
        tool.log_activity(&format!("Batch updated {updated} prospects"), "", "");
    }
    Ok(Json(json!({ "updated": updated })))
}

pub async fn engage_prospect(
    State(tool): State<SharedTool>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Prospect>, TrackerError> {
    let _guard = tool.write_lock.lock().await;
    let mut prospects = tool.store.load()?;
    let idx = find(&prospects, &id)?;

    let kind = body
        .get("type")
        .and_then(Value::as_str)
        .and_then(EngagementType::parse)
        .ok_or_else(|| {
            TrackerError::invalid(format!(
                "Invalid engagement type. Allowed: {}",
                EngagementType::allowed_list()
            ))
        })?;
    let note = body.get("note").and_then(Value::as_str);
    let sequence_override = body
        .get("sequence_type")
        .and_then(Value::as_str)
        .and_then(SequenceType::parse);

    engage::record(&mut prospects[idx], kind, note, sequence_override, today());
    tool.store.save(&prospects)?;

    let prospect = prospects.swap_remove(idx);
    tool.log_activity(&format!("Logged {kind}"), &prospect.name, &prospect.id);
    Ok(Json(prospect))
}

pub async fn skip_prospect(
    State(tool): State<SharedTool>,
    Path(id): Path<String>,
) -> Result<Json<Prospect>, TrackerError> {
    let _guard = tool.write_lock.lock().await;
    let mut prospects = tool.store.load()?;
    let idx = find(&prospects, &id)?;

    engage::snooze(&mut prospects[idx], today());
    tool.store.save(&prospects)?;
    Ok(Json(prospects.swap_remove(idx)))
}

pub async fn delete_prospect(
    State(tool): State<SharedTool>,
    Path(id): Path<String>,
) -> Result<Json<Value>, TrackerError> {
    let _guard = tool.write_lock.lock().await;
    let mut prospects = tool.store.load()?;
    // Not found must leave the file and the backup directory untouched.
    let idx = find(&prospects, &id)?;

    let removed = prospects.remove(idx);
    tool.store.save(&prospects)?;
    tool.log_activity("Removed prospect", &removed.name, &removed.id);
    Ok(Json(json!({ "ok": true })))
}

// ---------------------------------------------------------------------------
// Selectors and reports
// ---------------------------------------------------------------------------

pub async fn todays_queue(State(tool): State<SharedTool>) -> Result<Response, TrackerError> {
    let prospects = tool.store.load()?;
    Ok(Json(queue::todays_queue(&prospects, today())).into_response())
}

pub async fn follow_ups(State(tool): State<SharedTool>) -> Result<Response, TrackerError> {
    let prospects = tool.store.load()?;
    Ok(Json(queue::follow_ups(&prospects, today())).into_response())
}

pub async fn alerts(State(tool): State<SharedTool>) -> Result<Response, TrackerError> {
    let prospects = tool.store.load()?;
    Ok(Json(queue::alerts(&prospects, today())).into_response())
}

pub async fn stats(
    State(tool): State<SharedTool>,
) -> Result<Json<report::DashboardStats>, TrackerError> {
    let prospects = tool.store.load()?;
    Ok(Json(report::dashboard_stats(&prospects, today())))
}

pub async fn reports(
    State(tool): State<SharedTool>,
) -> Result<Json<report::PipelineReport>, TrackerError> {
    let prospects = tool.store.load()?;
    Ok(Json(report::build_report(&prospects, today())))
}

// ---------------------------------------------------------------------------
// Import / export
// ---------------------------------------------------------------------------

pub async fn import_urls(
    State(tool): State<SharedTool>,
    Json(body): Json<Value>,
) -> Result<Json<import::UrlImportSummary>, TrackerError> {
    let urls = array_field(&body, "urls").ok_or_else(|| TrackerError::invalid("urls must be an array"))?;
    if urls.len() > MAX_URLS {
        return Err(TrackerError::invalid(format!(
            "Maximum {MAX_URLS} URLs per import"
        )));
    }
    let request = UrlImport {
        urls: urls.clone(),
        segment: body.get("segment").cloned(),
        tier: body.get("tier").cloned(),
        tags: body.get("tags").cloned(),
        check_in_days: body.get("check_in_days").cloned(),
    };

    let _guard = tool.write_lock.lock().await;
    let mut prospects = tool.store.load()?;
    let summary = import::import_urls(&mut prospects, &request, tool.segment.audience, today());
    if summary.added > 0 {
        tool.store.save(&prospects)?;
        tool.log_activity(&format!("Imported {} profile URLs", summary.added), "", "");
    }
    Ok(Json(summary))
}

pub async fn import_csv(
    State(tool): State<SharedTool>,
    Json(body): Json<Value>,
) -> Result<Json<import::RowImportSummary>, TrackerError> {
    let rows = array_field(&body, "rows").ok_or_else(|| TrackerError::invalid("rows must be an array"))?;
    if rows.len() > MAX_ROWS {
        return Err(TrackerError::invalid(format!(
            "Maximum {MAX_ROWS} rows per CSV import"
        )));
    }
    let rows: Vec<ImportRow> = rows
        .iter()
        .map(|r| serde_json::from_value(r.clone()).unwrap_or_default())
        .collect();

    let _guard = tool.write_lock.lock().await;
    let mut prospects = tool.store.load()?;
    let summary = import::import_rows(&mut prospects, rows, tool.segment.audience, today());
    if summary.added > 0 {
        tool.store.save(&prospects)?;
        tool.log_activity(&format!("Imported {} CSV rows", summary.added), "", "");
    }
    Ok(Json(summary))
}

pub async fn export_csv(State(tool): State<SharedTool>) -> Result<Response, TrackerError> {
    let prospects = tool.store.load()?;
    let csv = export::to_csv_string(&prospects)?;
    let disposition = format!(
        "attachment; filename={}_prospects_export.csv",
        tool.segment.key
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// Templates and activity
// ---------------------------------------------------------------------------

pub async fn get_templates(State(tool): State<SharedTool>) -> Result<Json<Templates>, TrackerError> {
    Ok(Json(tool.templates.load()?))
}

pub async fn put_templates(
    State(tool): State<SharedTool>,
    Json(body): Json<Value>,
) -> Result<Json<Templates>, TrackerError> {
    let templates =
        clean_templates(&body).ok_or_else(|| TrackerError::invalid("Templates must be an object"))?;

    let _guard = tool.write_lock.lock().await;
    tool.templates.save(&templates)?;
    Ok(Json(templates))
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, serde::Serialize)]
pub struct ActivityPage {
    pub activity: Vec<ActivityEntry>,
    pub total: usize,
}

pub async fn activity(
    State(tool): State<SharedTool>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ActivityPage>, TrackerError> {
    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    let (activity, total) = tool.activity.recent(limit)?;
    Ok(Json(ActivityPage { activity, total }))
}
