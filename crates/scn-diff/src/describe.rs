//! Human-readable descriptions of diff entries.
//!
//! Descriptions read "before → after", where *before* is the target's value
//! and *after* the source's: `"Alice → Apollo: 75% → 50%"`.

use std::fmt::Display;

use chrono::NaiveDate;

use scn_types::{
    AssignmentKey, AssignmentValue, Catalog, DateMode, OverrideKey, OverrideValue, PhaseKey,
    PhaseValue,
};

use crate::entry::{Change, ChangeKind};

pub(crate) fn assignment(change: &Change<AssignmentKey, AssignmentValue>, catalog: &Catalog) -> String {
    let subject = format!(
        "{} → {}",
        catalog.person_name(&change.key.person_id),
        catalog.project_name(&change.key.project_id)
    );
    let detail = describe(change, |v| pct(v.allocation_percentage), |before, after| {
        let mut parts = Vec::new();
        if before.allocation_percentage != after.allocation_percentage {
            parts.push(arrow(pct(before.allocation_percentage), pct(after.allocation_percentage)));
        }
        if before.assignment_date_mode != after.assignment_date_mode {
            parts.push(format!(
                "mode {}",
                arrow(before.assignment_date_mode, after.assignment_date_mode)
            ));
        }
        if before.phase_id != after.phase_id {
            let name = |v: &AssignmentValue| {
                v.phase_id
                    .map(|p| catalog.phase_name(&p))
                    .unwrap_or_else(|| "-".into())
            };
            parts.push(format!("phase {}", arrow(name(before), name(after))));
        }
        if after.assignment_date_mode == DateMode::Fixed
            && (before.start_date, before.end_date) != (after.start_date, after.end_date)
        {
            parts.push(format!(
                "dates {}",
                arrow(
                    span(before.start_date, before.end_date),
                    span(after.start_date, after.end_date)
                )
            ));
        }
        parts
    });
    format!("{subject}: {detail}")
}

pub(crate) fn project_override(change: &Change<OverrideKey, OverrideValue>, catalog: &Catalog) -> String {
    let subject = format!("{} override", catalog.project_name(&change.key.project_id));
    let summary = |v: &OverrideValue| {
        format!(
            "priority {}, {}",
            opt(v.priority),
            span(v.aspiration_start, v.aspiration_finish)
        )
    };
    let detail = describe(change, summary, |before, after| {
        let mut parts = Vec::new();
        if before.priority != after.priority {
            parts.push(format!("priority {}", arrow(opt(before.priority), opt(after.priority))));
        }
        if before.aspiration_start != after.aspiration_start {
            parts.push(format!(
                "start {}",
                arrow(opt(before.aspiration_start), opt(after.aspiration_start))
            ));
        }
        if before.aspiration_finish != after.aspiration_finish {
            parts.push(format!(
                "finish {}",
                arrow(opt(before.aspiration_finish), opt(after.aspiration_finish))
            ));
        }
        parts
    });
    format!("{subject}: {detail}")
}

pub(crate) fn phase_timeline(change: &Change<PhaseKey, PhaseValue>, catalog: &Catalog) -> String {
    let subject = format!(
        "{} / {}",
        catalog.project_name(&change.key.project_id),
        catalog.phase_name(&change.key.phase_id)
    );
    let summary = |v: &PhaseValue| format!("{}..{}", v.start_date, v.end_date);
    let detail = describe(change, summary, |before, after| {
        let mut parts = Vec::new();
        if (before.start_date, before.end_date) != (after.start_date, after.end_date) {
            parts.push(arrow(summary(before), summary(after)));
        }
        if before.predecessors != after.predecessors {
            let names = |v: &PhaseValue| {
                if v.predecessors.is_empty() {
                    return "none".to_string();
                }
                v.predecessors
                    .iter()
                    .map(|l| {
                        format!(
                            "{} {}+{}d",
                            catalog.phase_name(&l.predecessor_phase_id),
                            l.dependency_type,
                            l.lag_days
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            parts.push(format!("depends on {}", arrow(names(before), names(after))));
        }
        parts
    });
    format!("{subject}: {detail}")
}

/// Shared shape of every description.
fn describe<V>(
    change: &Change<impl Sized, V>,
    summary: impl Fn(&V) -> String,
    fields: impl Fn(&V, &V) -> Vec<String>,
) -> String {
    match (change.kind, &change.target, &change.source) {
        (ChangeKind::Added, _, Some(after)) => format!("added ({})", summary(after)),
        (ChangeKind::Removed, Some(before), _) => format!("removed (was {})", summary(before)),
        (ChangeKind::Modified, Some(before), Some(after)) => {
            let parts = fields(before, after);
            if parts.is_empty() {
                "changed".to_string()
            } else {
                parts.join(", ")
            }
        }
        (ChangeKind::Modified, None, Some(after)) => {
            format!("deleted in target, changed in source ({})", summary(after))
        }
        (kind, _, _) => kind.to_string(),
    }
}

fn arrow(before: impl Display, after: impl Display) -> String {
    format!("{before} → {after}")
}

fn pct(value: f64) -> String {
    format!("{value}%")
}

fn opt(value: Option<impl Display>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn span(start: Option<NaiveDate>, end: Option<NaiveDate>) -> String {
    format!("{}..{}", opt(start), opt(end))
}
