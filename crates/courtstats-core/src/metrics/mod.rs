// Derived-metric engine.
//
// Metrics are registered in groups. Each group declares the columns it reads
// and the columns it writes; the engine orders groups so producers run before
// consumers and skips any group whose inputs are unavailable. Every group
// overwrites its own columns, so applying the engine twice gives the same
// table as applying it once.

pub mod baseline;
mod defense;
mod offense;
pub mod position;
mod possession;
mod salary;
mod schedule;
mod shooting;

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::table::{Table, TableError};

pub use shooting::{NORMALIZED_FT_RATE, TECH_FT_POINTS};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("metric group `{group}` failed: {source}")]
    Group {
        group: String,
        #[source]
        source: TableError,
    },

    #[error("column `{column}` is produced by both `{first}` and `{second}`")]
    DuplicateProducer {
        column: String,
        first: String,
        second: String,
    },

    #[error("metric groups depend on each other in a cycle: {0:?}")]
    Cycle(Vec<String>),
}

// ---------------------------------------------------------------------------
// Per-run context
// ---------------------------------------------------------------------------

/// Baseline subtracted from `drtg_on` when computing `rdrtg_on`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefensiveBaseline {
    /// Yearly offensive-rating average, as historical outputs were built.
    #[default]
    OffensiveAverage,
    /// Yearly defensive-rating average.
    DefensiveAverage,
}

/// Inputs the metrics need beyond the season table itself.
#[derive(Debug, Clone, Default)]
pub struct MetricContext {
    /// League true-shooting baseline by season year.
    pub league_ts: HashMap<i32, f64>,
    /// Salary by (year, nba_id).
    pub salaries: HashMap<(i32, i64), f64>,
    pub defensive_baseline: DefensiveBaseline,
}

// ---------------------------------------------------------------------------
// Row access and arithmetic helpers
// ---------------------------------------------------------------------------

/// Read-only view of one table row.
#[derive(Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> Row<'a> {
    /// Raw counting stat: a missing cell or absent column reads as zero.
    pub fn raw(&self, name: &str) -> f64 {
        self.table.f64_at(self.index, name).unwrap_or(0.0)
    }

    /// Derived value: missing stays missing.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.table.f64_at(self.index, name)
    }

    pub fn year(&self) -> Option<i32> {
        year_of(self.table, self.index)
    }
}

pub(crate) fn year_of(table: &Table, row: usize) -> Option<i32> {
    table
        .f64_at(row, "year")
        .filter(|y| y.fract() == 0.0)
        .map(|y| y as i32)
}

/// Compute a column row by row and store it (non-finite results become missing).
pub(crate) fn derive<F>(table: &mut Table, name: &str, f: F) -> Result<(), TableError>
where
    F: Fn(Row<'_>) -> Option<f64>,
{
    let values: Vec<Option<f64>> = {
        let view: &Table = table;
        (0..view.len())
            .map(|index| f(Row { table: view, index }))
            .collect()
    };
    table.set_num(name, values)
}

/// Division that is missing when the denominator is zero.
pub(crate) fn ratio(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 {
        return None;
    }
    Some(num / den).filter(|v| v.is_finite())
}

/// Rate per 100 possessions.
pub(crate) fn per100(value: f64, poss: f64) -> Option<f64> {
    ratio(value * 100.0, poss)
}

// ---------------------------------------------------------------------------
// Metric groups
// ---------------------------------------------------------------------------

type ComputeFn = Box<dyn Fn(&mut Table, &MetricContext) -> Result<(), TableError> + Send + Sync>;

pub struct MetricGroup {
    name: String,
    requires: Vec<String>,
    produces: Vec<String>,
    compute: ComputeFn,
}

impl MetricGroup {
    pub fn new<F>(name: &str, requires: &[&str], produces: &[&str], compute: F) -> Self
    where
        F: Fn(&mut Table, &MetricContext) -> Result<(), TableError> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            requires: requires.iter().map(|s| s.to_string()).collect(),
            produces: produces.iter().map(|s| s.to_string()).collect(),
            compute: Box::new(compute),
        }
    }

    /// Same as [`MetricGroup::new`] with owned column names.
    pub fn with_columns<F>(name: String, requires: Vec<String>, produces: Vec<String>, compute: F) -> Self
    where
        F: Fn(&mut Table, &MetricContext) -> Result<(), TableError> + Send + Sync + 'static,
    {
        Self {
            name,
            requires,
            produces,
            compute: Box::new(compute),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    pub fn produces(&self) -> &[String] {
        &self.produces
    }

    /// Run the group directly, without checking its inputs.
    pub fn run(&self, table: &mut Table, ctx: &MetricContext) -> Result<(), TableError> {
        (self.compute)(table, ctx)
    }
}

impl std::fmt::Debug for MetricGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricGroup")
            .field("name", &self.name)
            .field("requires", &self.requires)
            .field("produces", &self.produces)
            .finish()
    }
}

/// Every built-in group, in registration order.
pub fn standard_groups() -> Vec<MetricGroup> {
    let mut groups = Vec::new();
    groups.extend(shooting::groups());
    groups.extend(possession::groups());
    groups.extend(defense::groups());
    groups.extend(offense::groups());
    groups.extend(position::groups());
    groups.push(salary::group());
    groups
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkippedGroup {
    pub group: String,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub applied: Vec<String>,
    pub skipped: Vec<SkippedGroup>,
}

#[derive(Debug)]
pub struct MetricsEngine {
    groups: Vec<MetricGroup>,
    order: Vec<usize>,
}

impl MetricsEngine {
    /// Build an engine, ordering the groups by their declared dependencies.
    pub fn new(groups: Vec<MetricGroup>) -> Result<Self, MetricsError> {
        let order = schedule::plan(&groups)?;
        Ok(Self { groups, order })
    }

    pub fn standard() -> Result<Self, MetricsError> {
        Self::new(standard_groups())
    }

    /// Group names in execution order.
    pub fn order(&self) -> Vec<&str> {
        self.order.iter().map(|&i| self.groups[i].name()).collect()
    }

    /// Run every group whose inputs are present, in dependency order.
    pub fn apply(&self, table: &mut Table, ctx: &MetricContext) -> Result<ApplyReport, MetricsError> {
        let mut report = ApplyReport::default();
        for &index in &self.order {
            let group = &self.groups[index];
            let missing: Vec<String> = group
                .requires
                .iter()
                .filter(|c| !table.has_column(c))
                .cloned()
                .collect();
            if !missing.is_empty() {
                debug!("skipping metric group {}: missing {:?}", group.name, missing);
                report.skipped.push(SkippedGroup {
                    group: group.name.clone(),
                    missing,
                });
                continue;
            }
            group.run(table, ctx).map_err(|source| MetricsError::Group {
                group: group.name.clone(),
                source,
            })?;
            report.applied.push(group.name.clone());
        }
        if !report.skipped.is_empty() {
            warn!(
                "{} of {} metric groups skipped for missing inputs",
                report.skipped.len(),
                self.order.len()
            );
        }
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
