//! Request handlers. Store, diff and merge calls are synchronous, so every
//! handler hands its work to [`blocking`].

use std::str::FromStr;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use scn_dag::ScenarioForest;
use scn_diff::{ComparisonResult, EntityClass};
use scn_merge::{MergeOptions, MergePreview};
use scn_types::{
    AssignmentDraft, AssignmentId, MergeRecord, NewScenario, OverrideDraft, PhaseDraft, Scenario,
    ScenarioAssignment, ScenarioId, ScenarioPhaseTimeline, ScenarioProjectOverride,
    ScenarioSnapshot,
};

use crate::error::{ServerError, ServerResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::{blocking, AppState};

fn parse_id<T: FromStr>(raw: &str, what: &str) -> ServerResult<T> {
    raw.parse()
        .map_err(|_| ServerError::BadRequest(format!("invalid {what} id: {raw}")))
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ---------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------

pub async fn create_scenario(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewScenario>,
) -> ServerResult<(StatusCode, Json<Scenario>)> {
    let scenario = blocking(move || Ok(state.store.create_scenario(request)?)).await?;
    tracing::info!(scenario = %scenario.id, kind = %scenario.scenario_type, "scenario created");
    Ok((StatusCode::CREATED, Json(scenario)))
}

pub async fn list_scenarios(State(state): State<AppState>) -> ServerResult<Json<Vec<Scenario>>> {
    let list = blocking(move || Ok(state.store.list_scenarios()?)).await?;
    Ok(Json(list))
}

pub async fn scenario_tree(State(state): State<AppState>) -> ServerResult<Json<ScenarioForest>> {
    let forest = blocking(move || Ok(state.store.tree()?)).await?;
    Ok(Json(forest))
}

pub async fn get_scenario(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Scenario>> {
    let id: ScenarioId = parse_id(&id, "scenario")?;
    let scenario = blocking(move || Ok(state.store.require_scenario(&id)?)).await?;
    Ok(Json(scenario))
}

pub async fn get_snapshot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<ScenarioSnapshot>> {
    let id: ScenarioId = parse_id(&id, "scenario")?;
    let snapshot = blocking(move || Ok(state.store.snapshot(&id)?)).await?;
    Ok(Json(snapshot))
}

pub async fn delete_scenario(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<StatusCode> {
    let id: ScenarioId = parse_id(&id, "scenario")?;
    blocking(move || Ok(state.store.delete_scenario(&id)?)).await?;
    tracing::info!(scenario = %id, "scenario deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn archive_scenario(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Scenario>> {
    let id: ScenarioId = parse_id(&id, "scenario")?;
    let scenario = blocking(move || Ok(state.store.archive_scenario(&id)?)).await?;
    Ok(Json(scenario))
}

// ---------------------------------------------------------------
// Merges
// ---------------------------------------------------------------

pub async fn merge_scenario(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(options): ApiJson<MergeOptions>,
) -> ServerResult<Json<Value>> {
    let id: ScenarioId = parse_id(&id, "scenario")?;
    let outcome = blocking(move || Ok(state.merges.merge(&id, options)?)).await?;
    let record = &outcome.record;
    Ok(Json(json!({
        "success": true,
        "message": format!(
            "merged {} change(s) into {}; {} conflict(s) resolved",
            record.changes_applied, record.target_scenario_id, record.conflicts_resolved
        ),
        "merge_record": record,
        "applied": outcome.applied,
        "superseded": outcome.superseded,
        "target_revision": outcome.target_revision,
    })))
}

pub async fn preview_merge(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(options): ApiJson<MergeOptions>,
) -> ServerResult<Json<MergePreview>> {
    let id: ScenarioId = parse_id(&id, "scenario")?;
    let preview = blocking(move || {
        Ok(state
            .merges
            .preview(&id, options.effective_strategy(), &options.resolutions)?)
    })
    .await?;
    Ok(Json(preview))
}

pub async fn merge_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Vec<MergeRecord>>> {
    let id: ScenarioId = parse_id(&id, "scenario")?;
    let records = blocking(move || Ok(state.store.merge_records(&id)?)).await?;
    Ok(Json(records))
}

// ---------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    /// Defaults to the scenario's parent.
    pub to: Option<String>,
}

/// Shape a comparison as `differences` plus grouped impact metrics.
fn comparison_body(result: &ComparisonResult) -> Value {
    let m = &result.metrics;
    json!({
        "from": result.from,
        "to": result.to,
        "differences": {
            "assignments": m.assignments,
            "project_overrides": m.project_overrides,
            "phase_timelines": m.phase_timelines,
        },
        "entries": result.diff.entries,
        "metrics": {
            "utilization_impact": {
                "total_allocation_delta": m.total_allocation_delta,
                "people_affected": m.people_affected,
            },
            "capacity_impact": {
                "assignment_count_delta": m.assignment_count_delta,
                "projects_touched": m.projects_touched,
            },
            "timeline_impact": {
                "phases_rescheduled": m.phases_rescheduled,
                "phase_changes": result.diff.counts(EntityClass::PhaseTimeline).total(),
            },
        },
    })
}

pub async fn compare_scenarios(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<CompareQuery>,
) -> ServerResult<Json<Value>> {
    let from: ScenarioId = parse_id(&id, "scenario")?;
    let to: Option<ScenarioId> = query.to.as_deref().map(|raw| parse_id(raw, "scenario")).transpose()?;
    let result = blocking(move || {
        let to = match to {
            Some(to) => to,
            None => state
                .store
                .require_scenario(&from)?
                .parent_scenario_id
                .ok_or_else(|| {
                    ServerError::BadRequest("`to` is required when comparing the baseline".into())
                })?,
        };
        Ok(state.comparisons.compare(&from, &to)?)
    })
    .await?;
    Ok(Json(comparison_body(&result)))
}

// ---------------------------------------------------------------
// Scoped rows
// ---------------------------------------------------------------

pub async fn list_assignments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Vec<ScenarioAssignment>>> {
    let id: ScenarioId = parse_id(&id, "scenario")?;
    let snapshot = blocking(move || Ok(state.store.snapshot(&id)?)).await?;
    Ok(Json(snapshot.assignments))
}

pub async fn upsert_assignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(draft): ApiJson<AssignmentDraft>,
) -> ServerResult<Json<ScenarioAssignment>> {
    let id: ScenarioId = parse_id(&id, "scenario")?;
    let row = blocking(move || Ok(state.store.upsert_assignment(&id, draft)?)).await?;
    Ok(Json(row))
}

pub async fn delete_assignment(
    State(state): State<AppState>,
    Path((id, assignment_id)): Path<(String, String)>,
) -> ServerResult<StatusCode> {
    let id: ScenarioId = parse_id(&id, "scenario")?;
    let assignment_id: AssignmentId = parse_id(&assignment_id, "assignment")?;
    blocking(move || Ok(state.store.delete_assignment(&id, &assignment_id)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn upsert_override(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(draft): ApiJson<OverrideDraft>,
) -> ServerResult<Json<ScenarioProjectOverride>> {
    let id: ScenarioId = parse_id(&id, "scenario")?;
    let row = blocking(move || Ok(state.store.upsert_override(&id, draft)?)).await?;
    Ok(Json(row))
}

pub async fn upsert_phase_timeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(draft): ApiJson<PhaseDraft>,
) -> ServerResult<Json<ScenarioPhaseTimeline>> {
    let id: ScenarioId = parse_id(&id, "scenario")?;
    let row = blocking(move || Ok(state.store.upsert_phase_timeline(&id, draft)?)).await?;
    Ok(Json(row))
}
