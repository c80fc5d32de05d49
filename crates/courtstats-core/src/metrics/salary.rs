use super::{derive, MetricContext, MetricGroup};
use crate::table::{Table, TableError};

/// Salary joined on (year, nba_id). Players without a listed salary get 0
/// rather than a missing value.
pub(super) fn group() -> MetricGroup {
    MetricGroup::new("salary", &["year", "nba_id"], &["Salary"], salary)
}

fn salary(t: &mut Table, ctx: &MetricContext) -> Result<(), TableError> {
    derive(t, "Salary", |r| {
        let listed = r
            .year()
            .zip(r.get("nba_id").map(|id| id as i64))
            .and_then(|key| ctx.salaries.get(&key).copied());
        Some(listed.unwrap_or(0.0))
    })
}
