// League-wide baselines: team ratings from team totals and the regular-season
// true-shooting baseline.

use courtstats_core::metrics::TECH_FT_POINTS;
use courtstats_core::table::Table;
use serde::{Deserialize, Serialize};

use crate::discovery::SeasonKey;
use crate::loader::TeamTotals;

/// League offensive and defensive rating (points per 100 possessions).
/// Either is `None` when the season has no possessions on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LeagueRatings {
    pub ortg: Option<f64>,
    pub drtg: Option<f64>,
}

impl LeagueRatings {
    pub fn from_team_totals(teams: &[TeamTotals]) -> Self {
        let points: f64 = teams.iter().map(|t| t.points).sum();
        let off_poss: f64 = teams.iter().map(|t| t.off_poss).sum();
        let opp_points: f64 = teams.iter().map(|t| t.opponent_points).sum();
        let def_poss: f64 = teams.iter().map(|t| t.def_poss).sum();
        Self {
            ortg: (off_poss > 0.0).then(|| points / off_poss * 100.0),
            drtg: (def_poss > 0.0).then(|| opp_points / def_poss * 100.0),
        }
    }
}

/// League true-shooting percentage from a season's play-by-play player rows:
/// technical-adjusted points over twice the true-shooting attempts. Missing
/// cells count as zero. `None` when the season has no attempts.
pub fn league_true_shooting(entities: &Table) -> Option<f64> {
    let cell = |row: usize, name: &str| entities.f64_at(row, name).unwrap_or(0.0);
    let mut points = 0.0;
    let mut attempts = 0.0;
    for row in 0..entities.len() {
        let shooting_trips = (cell(row, "TwoPtShootingFoulsDrawn")
            - cell(row, "2pt And 1 Free Throw Trips"))
            + (cell(row, "ThreePtShootingFoulsDrawn") - cell(row, "3pt And 1 Free Throw Trips"));
        attempts += cell(row, "FG2A")
            + cell(row, "FG3A")
            + shooting_trips
            + cell(row, "NonShootingFoulsDrawn");
        points += cell(row, "Points") - cell(row, "Technical Free Throw Trips") * TECH_FT_POINTS;
    }
    (attempts > 0.0).then(|| points / (2.0 * attempts))
}

/// One row of the shooting baseline table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShootingBaseline {
    /// `YYYY-YY`, e.g. `2009-10` for the 2010 season.
    #[serde(rename = "Season")]
    pub season: String,
    #[serde(rename = "TS%")]
    pub ts_pct: f64,
}

impl ShootingBaseline {
    pub fn new(key: SeasonKey, ts_pct: f64) -> Self {
        Self {
            season: key.baseline_label(),
            ts_pct,
        }
    }

    /// Season year the label refers to (`2009-10` -> 2010).
    pub fn year(&self) -> Option<i32> {
        let first = self.season.split('-').next()?;
        first.trim().parse::<i32>().ok().map(|y| y + 1)
    }
}
