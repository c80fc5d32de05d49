// Weighted season-year baselines for the r-prefixed metrics.

use std::collections::HashMap;

use super::year_of;
use crate::table::{Table, TableError};

/// `sum(value * weight) / sum(weight)` per season year, over rows with a
/// positive weight and a present value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearBaseline {
    by_year: HashMap<i32, f64>,
}

impl YearBaseline {
    pub fn weighted(table: &Table, value: &str, weight: &str) -> Self {
        let mut sums: HashMap<i32, (f64, f64)> = HashMap::new();
        for row in 0..table.len() {
            let (Some(year), Some(v), Some(w)) = (
                year_of(table, row),
                table.f64_at(row, value),
                table.f64_at(row, weight),
            ) else {
                continue;
            };
            if w <= 0.0 {
                continue;
            }
            let entry = sums.entry(year).or_insert((0.0, 0.0));
            entry.0 += v * w;
            entry.1 += w;
        }

        let by_year = sums
            .into_iter()
            .filter(|(_, (_, den))| *den > 0.0)
            .map(|(year, (num, den))| (year, num / den))
            .collect();
        Self { by_year }
    }

    pub fn get(&self, year: i32) -> Option<f64> {
        self.by_year.get(&year).copied()
    }

    /// Baseline value for each row's year.
    pub fn per_row(&self, table: &Table) -> Vec<Option<f64>> {
        (0..table.len())
            .map(|row| year_of(table, row).and_then(|y| self.get(y)))
            .collect()
    }
}

/// Write `avg_column` (the year baseline) and `rel_column`
/// (`(value - baseline) * scale`).
pub fn relative_to_year(
    table: &mut Table,
    value: &str,
    weight: &str,
    avg_column: &str,
    rel_column: &str,
    scale: f64,
) -> Result<(), TableError> {
    let baseline = YearBaseline::weighted(table, value, weight).per_row(table);
    let relative: Vec<Option<f64>> = (0..table.len())
        .map(|row| Some((table.f64_at(row, value)? - baseline[row]?) * scale))
        .collect();
    table.set_num(avg_column, baseline)?;
    table.set_num(rel_column, relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::tests::{approx_eq, table_from};

    #[test]
    fn weighted_average_matches_hand_computation() {
        let table = table_from(
            "\
year,v,w
2020,0.5,100
2020,0.6,300
2020,0.9,0
2020,,50
2021,0.4,10
2021,0.2,-5",
        );
        let baseline = YearBaseline::weighted(&table, "v", "w");

        // (0.5*100 + 0.6*300) / 400; the zero-weight, missing and negative rows are excluded.
        assert!(approx_eq(baseline.get(2020).unwrap(), 0.575, 1e-12));
        assert!(approx_eq(baseline.get(2021).unwrap(), 0.4, 1e-12));
        assert_eq!(baseline.get(2019), None);
    }

    #[test]
    fn relative_column_subtracts_and_scales() {
        let mut table = table_from(
            "\
year,v,w
2020,0.5,1
2020,0.7,1
2021,,1",
        );
        relative_to_year(&mut table, "v", "w", "v_avg", "rv", 100.0).unwrap();

        assert!(approx_eq(table.f64_at(0, "v_avg").unwrap(), 0.6, 1e-12));
        assert!(approx_eq(table.f64_at(0, "rv").unwrap(), -10.0, 1e-9));
        assert!(approx_eq(table.f64_at(1, "rv").unwrap(), 10.0, 1e-9));
        assert_eq!(table.f64_at(2, "v_avg"), None);
        assert_eq!(table.f64_at(2, "rv"), None);
    }
}
