//! Derivation of an assignment's effective (computed) dates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::assignment::{AssignmentValue, DateMode};
use crate::catalog::Project;
use crate::error::TypeError;
use crate::project_override::OverrideValue;

/// An inclusive calendar range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }
}

/// Compute the effective dates of an assignment.
///
/// - `fixed`: the stored dates; `start == end` is a valid single-day
///   assignment.
/// - `phase`: the scenario's timeline for the assignment's phase; must span
///   at least one day boundary (`start < end`).
/// - `project`: the scenario override's aspiration dates, falling back field
///   by field to the catalog project; `start < end`.
pub fn derive_dates(
    value: &AssignmentValue,
    project: &Project,
    project_override: Option<&OverrideValue>,
    phase_range: Option<DateRange>,
) -> Result<DateRange, TypeError> {
    let range = match value.assignment_date_mode {
        DateMode::Fixed => {
            let (Some(start), Some(end)) = (value.start_date, value.end_date) else {
                return Err(TypeError::MissingDate(
                    "fixed assignments need start_date and end_date".into(),
                ));
            };
            if start > end {
                return Err(TypeError::InvalidDateRange {
                    start,
                    end,
                    reason: "start after end".into(),
                });
            }
            return Ok(DateRange::new(start, end));
        }
        DateMode::Phase => phase_range.ok_or_else(|| {
            TypeError::MissingDate(format!(
                "no timeline for the assigned phase of project {}",
                project.name
            ))
        })?,
        DateMode::Project => {
            let start = project_override
                .and_then(|o| o.aspiration_start)
                .or(project.aspiration_start);
            let end = project_override
                .and_then(|o| o.aspiration_finish)
                .or(project.aspiration_finish);
            match (start, end) {
                (Some(start), Some(end)) => DateRange::new(start, end),
                _ => {
                    return Err(TypeError::MissingDate(format!(
                        "project {} has no aspiration dates",
                        project.name
                    )))
                }
            }
        }
    };

    if range.start >= range.end {
        return Err(TypeError::InvalidDateRange {
            start: range.start,
            end: range.end,
            reason: format!("{} mode needs start before end", value.assignment_date_mode),
        });
    }
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{PhaseId, ProjectId};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    fn project() -> Project {
        Project {
            id: ProjectId::new(),
            name: "Apollo".into(),
            priority: 2,
            aspiration_start: Some(d(1, 1)),
            aspiration_finish: Some(d(12, 31)),
        }
    }

    #[test]
    fn fixed_uses_stored_dates() {
        let value = AssignmentValue::fixed(50.0, d(2, 1), d(2, 1));
        let range = derive_dates(&value, &project(), None, None).unwrap();
        assert_eq!(range, DateRange::new(d(2, 1), d(2, 1)));
    }

    #[test]
    fn phase_uses_timeline() {
        let value = AssignmentValue::phase(50.0, PhaseId::new());
        let timeline = DateRange::new(d(3, 1), d(4, 15));
        let range = derive_dates(&value, &project(), None, Some(timeline)).unwrap();
        assert_eq!(range, timeline);
    }

    #[test]
    fn phase_without_timeline_fails() {
        let value = AssignmentValue::phase(50.0, PhaseId::new());
        assert!(matches!(
            derive_dates(&value, &project(), None, None),
            Err(TypeError::MissingDate(_))
        ));
    }

    #[test]
    fn phase_single_day_rejected() {
        let value = AssignmentValue::phase(50.0, PhaseId::new());
        let timeline = DateRange::new(d(3, 1), d(3, 1));
        assert!(matches!(
            derive_dates(&value, &project(), None, Some(timeline)),
            Err(TypeError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn project_mode_prefers_override() {
        let value = AssignmentValue::project(25.0);
        let over = OverrideValue {
            priority: None,
            aspiration_start: Some(d(6, 1)),
            aspiration_finish: None,
        };
        let range = derive_dates(&value, &project(), Some(&over), None).unwrap();
        assert_eq!(range, DateRange::new(d(6, 1), d(12, 31)));
    }

    #[test]
    fn project_mode_without_dates_fails() {
        let mut p = project();
        p.aspiration_finish = None;
        let value = AssignmentValue::project(25.0);
        assert!(derive_dates(&value, &p, None, None).is_err());
    }
}
