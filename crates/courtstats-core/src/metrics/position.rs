// Position-adjusted added value.
//
// Each year gets a weighted league average per integer position bucket
// (1 = point guard .. 5 = center). A player's expected value is interpolated
// between the two buckets bracketing their continuous position number, and
// the adjusted metric is the raw value minus that expectation.

use std::collections::HashMap;

use super::{derive, year_of, MetricContext, MetricGroup};
use crate::table::{Table, TableError};

/// Position number used when a position string is missing or unknown.
pub const DEFAULT_POSITION_NUMBER: f64 = 3.0;

/// Continuous position number for a listed position. Hybrid listings such as
/// `G-F` average their parts.
pub fn position_number(pos: Option<&str>) -> f64 {
    let Some(pos) = pos else {
        return DEFAULT_POSITION_NUMBER;
    };
    let parts: Option<Vec<f64>> = pos
        .split('-')
        .map(|part| match part.trim().to_ascii_uppercase().as_str() {
            "G" | "PG" => Some(1.0),
            "SG" => Some(2.0),
            "F" | "SF" => Some(3.0),
            "PF" => Some(4.0),
            "C" => Some(5.0),
            _ => None,
        })
        .collect();
    match parts {
        Some(parts) if !parts.is_empty() => parts.iter().sum::<f64>() / parts.len() as f64,
        _ => DEFAULT_POSITION_NUMBER,
    }
}

/// Weighted average of one metric per (year, position bucket).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionBaseline {
    averages: HashMap<(i32, i32), f64>,
}

impl PositionBaseline {
    pub fn weighted(table: &Table, value: &str, weight: &str) -> Self {
        let mut sums: HashMap<(i32, i32), (f64, f64)> = HashMap::new();
        for row in 0..table.len() {
            let (Some(year), Some(pos), Some(v), Some(w)) = (
                year_of(table, row),
                table.f64_at(row, "Position_Number"),
                table.f64_at(row, value),
                table.f64_at(row, weight),
            ) else {
                continue;
            };
            if w <= 0.0 {
                continue;
            }
            let bucket = (pos.round() as i32).clamp(1, 5);
            let entry = sums.entry((year, bucket)).or_insert((0.0, 0.0));
            entry.0 += v * w;
            entry.1 += w;
        }
        let averages = sums
            .into_iter()
            .map(|(key, (num, den))| (key, num / den))
            .collect();
        Self { averages }
    }

    pub fn bucket(&self, year: i32, position: i32) -> Option<f64> {
        self.averages.get(&(year, position)).copied()
    }

    /// Expected value at a continuous position. A bucket with no data counts
    /// as zero.
    pub fn interpolate(&self, year: i32, position: f64) -> f64 {
        let lower = position.floor() as i32;
        let upper = (lower + 1).min(5);
        let fraction = position - position.floor();
        let lower_val = self.bucket(year, lower).unwrap_or(0.0);
        let upper_val = self.bucket(year, upper).unwrap_or(0.0);
        lower_val * (1.0 - fraction) + upper_val * fraction
    }
}

pub(super) fn groups() -> Vec<MetricGroup> {
    [
        ("TS_added_100", "OffPoss"),
        ("rim_points_saved_100", "DefPoss"),
        ("points_saved_100", "DefPoss"),
    ]
    .into_iter()
    .map(|(value, weight)| position_group(value, weight))
    .collect()
}

fn position_group(value: &'static str, weight: &'static str) -> MetricGroup {
    let output = format!("pos_{value}");
    MetricGroup::with_columns(
        format!("position_value:{value}"),
        vec![
            "year".into(),
            "Position_Number".into(),
            value.into(),
            weight.into(),
        ],
        vec![output.clone()],
        move |t: &mut Table, _ctx: &MetricContext| -> Result<(), TableError> {
            let baseline = PositionBaseline::weighted(t, value, weight);
            derive(t, &output, |r| {
                let expected = baseline.interpolate(r.year()?, r.get("Position_Number")?);
                Some(r.get(value)? - expected)
            })
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::tests::{approx_eq, table_from};

    const POOL: &str = "\
year,Position_Number,TS_added_100,OffPoss
2020,3,2.0,100
2020,3,4.0,300
2020,4,-1.0,200
2020,3.5,10.0,0
2020,,5.0,100";

    #[test]
    fn position_numbers_from_listings() {
        assert_eq!(position_number(Some("G")), 1.0);
        assert_eq!(position_number(Some("G-F")), 2.0);
        assert_eq!(position_number(Some("F-C")), 4.0);
        assert_eq!(position_number(Some("C")), 5.0);
        assert_eq!(position_number(Some("PG")), 1.0);
        assert_eq!(position_number(Some("xyz")), 3.0);
        assert_eq!(position_number(None), 3.0);
    }

    #[test]
    fn integer_position_returns_bucket_average() {
        let table = table_from(POOL);
        let baseline = PositionBaseline::weighted(&table, "TS_added_100", "OffPoss");
        // (2*100 + 4*300) / 400 = 3.5
        assert!(approx_eq(baseline.interpolate(2020, 3.0), 3.5, 1e-12));
        assert_eq!(baseline.interpolate(2020, 3.0), baseline.bucket(2020, 3).unwrap());
    }

    #[test]
    fn half_position_returns_midpoint() {
        let table = table_from(POOL);
        let baseline = PositionBaseline::weighted(&table, "TS_added_100", "OffPoss");
        assert!(approx_eq(baseline.interpolate(2020, 3.5), (3.5 + -1.0) / 2.0, 1e-12));
    }

    #[test]
    fn empty_bucket_counts_as_zero() {
        let table = table_from(POOL);
        let baseline = PositionBaseline::weighted(&table, "TS_added_100", "OffPoss");
        assert!(approx_eq(baseline.interpolate(2020, 1.5), 0.0, 1e-12));
        assert!(approx_eq(baseline.interpolate(2020, 5.0), 0.0, 1e-12));
    }

    #[test]
    fn adjusted_value_missing_without_position() {
        let mut table = table_from(POOL);
        position_group("TS_added_100", "OffPoss")
            .run(&mut table, &MetricContext::default())
            .unwrap();

        assert!(approx_eq(table.f64_at(0, "pos_TS_added_100").unwrap(), 2.0 - 3.5, 1e-12));
        assert!(approx_eq(table.f64_at(3, "pos_TS_added_100").unwrap(), 10.0 - 1.25, 1e-12));
        assert_eq!(table.f64_at(4, "pos_TS_added_100"), None);
    }
}
