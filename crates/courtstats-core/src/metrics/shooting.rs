// Shooting metrics: zone misses and rebounding, free-throw trips, true
// shooting attempts and the TS% family with their year-relative baselines.

use super::baseline::relative_to_year;
use super::{derive, per100, ratio, MetricContext, MetricGroup, Row};
use crate::table::{Table, TableError};

/// Points deducted per technical free-throw trip.
pub const TECH_FT_POINTS: f64 = 0.8;
/// Free-throw rate used by the normalised TS% variant.
pub const NORMALIZED_FT_RATE: f64 = 0.85;

const TWO_PT_ZONES: [(&str, &str, &str); 3] = [
    ("AtRimFGA", "AtRimFGM", "AtRimOffReboundedPct"),
    ("ShortMidRangeFGA", "ShortMidRangeFGM", "ShortMidRangeOffReboundedPct"),
    ("LongMidRangeFGA", "LongMidRangeFGM", "LongMidRangeOffReboundedPct"),
];

const TECH_TRIPS: &str = "Technical Free Throw Trips";
const AND1_2PT: &str = "2pt And 1 Free Throw Trips";
const AND1_3PT: &str = "3pt And 1 Free Throw Trips";

pub(super) fn groups() -> Vec<MetricGroup> {
    vec![
        MetricGroup::new(
            "zone_rebounding",
            &[
                "AtRimFGA",
                "AtRimFGM",
                "ShortMidRangeFGA",
                "ShortMidRangeFGM",
                "LongMidRangeFGA",
                "LongMidRangeFGM",
                "Corner3FGA",
                "Corner3FGM",
                "Arc3FGA",
                "Arc3FGM",
            ],
            &["TotalMisses", "TotalOffRebounds", "ProbabilityOffRebounded"],
            zone_rebounding,
        ),
        MetricGroup::new(
            "free_throw_trips",
            &[
                "TwoPtShootingFoulsDrawn",
                "ThreePtShootingFoulsDrawn",
                "NonShootingFoulsDrawn",
                "FtPoints",
                "FTA",
            ],
            &[
                "Shooting_FT_Possessions",
                "NonShooting_FT_Possessions",
                "FT_Possessions",
                "FT_PERC",
            ],
            free_throw_trips,
        ),
        MetricGroup::new(
            "field_goals",
            &["FG2A", "FG2M", "FG3A", "FG3M", "FTA", "OffPoss"],
            &[
                "FGA", "FGM", "2P_PERC", "3P_PERC", "FTA_100", "2PA_100", "3PA_100", "FG3A100",
            ],
            field_goals,
        ),
        MetricGroup::new(
            "split_true_shooting",
            &[
                "FG2A",
                "FG2M",
                "FG3A",
                "FG3M",
                "TwoPtShootingFoulsDrawn",
                "ThreePtShootingFoulsDrawn",
                "NonShootingFoulsDrawn",
                "FT_PERC",
            ],
            &[
                "2TSA",
                "2FTA",
                "3TSA",
                "3FTA",
                "2FTPoints",
                "3FTPoints",
                "2_Points",
                "3_Points",
                "2TS_percent",
                "3TS_percent",
            ],
            split_true_shooting,
        ),
        MetricGroup::new(
            "true_shooting_attempts",
            &["FGA", "FT_Possessions", "OffPoss"],
            &["TSA", "TSA100"],
            true_shooting_attempts,
        ),
        MetricGroup::new(
            "true_shooting",
            &["Points", "TSA"],
            &["TS_percent", "TS_pct", "mod_points", "mod_ts"],
            true_shooting,
        ),
        MetricGroup::new(
            "ft_normalized_ts",
            &["Points", "TSA", "FTA", "FT_PERC"],
            &["diff_in_points", "TS_eightyfive", "nontech_TS_percent"],
            ft_normalized_ts,
        ),
        MetricGroup::new(
            "relative_split_ts",
            &["year", "2TS_percent", "2TSA", "3TS_percent", "3TSA", "mod_ts", "TSA"],
            &["2ts_avg", "3ts_avg", "mod_ts_avg", "2rTS", "3rTS", "mod_rTS"],
            relative_split_ts,
        ),
        MetricGroup::new(
            "league_relative_ts",
            &["year", "TS_pct", "TSA100"],
            &["avg_ts", "rTS", "rTSPct", "TS_added_100"],
            league_relative_ts,
        ),
        MetricGroup::new(
            "zone_accuracy",
            &[
                "AtRimFGA",
                "AtRimFGM",
                "ShortMidRangeFGA",
                "ShortMidRangeFGM",
                "LongMidRangeFGA",
                "LongMidRangeFGM",
            ],
            &["RimFGPerc", "ShortMidFGPerc", "LongMidFGPerc"],
            zone_accuracy,
        ),
    ]
}

fn three_pt_misses(r: &Row<'_>) -> f64 {
    r.raw("Corner3FGA") + r.raw("Arc3FGA") - r.raw("Corner3FGM") - r.raw("Arc3FGM")
}

/// Free-throw points attributed to a share of trips. A player with no free
/// throws has no percentage, so the attributed points are missing too.
fn ft_points(trip_fta: f64, ft_pct: Option<f64>) -> Option<f64> {
    ft_pct.map(|p| trip_fta * p)
}

fn zone_rebounding(t: &mut Table, _ctx: &MetricContext) -> Result<(), TableError> {
    derive(t, "TotalMisses", |r| {
        let two: f64 = TWO_PT_ZONES.iter().map(|(a, m, _)| r.raw(a) - r.raw(m)).sum();
        Some(two + three_pt_misses(&r))
    })?;
    derive(t, "TotalOffRebounds", |r| {
        let two: f64 = TWO_PT_ZONES
            .iter()
            .map(|(a, m, pct)| (r.raw(a) - r.raw(m)) * r.raw(pct))
            .sum();
        Some(two + three_pt_misses(&r) * r.raw("ThreePtOffReboundedPct"))
    })?;
    derive(t, "ProbabilityOffRebounded", |r| {
        Some(ratio(r.get("TotalOffRebounds")?, r.get("TotalMisses")?)? * 100.0)
    })
}

fn free_throw_trips(t: &mut Table, _ctx: &MetricContext) -> Result<(), TableError> {
    derive(t, "Shooting_FT_Possessions", |r| {
        Some(
            (r.raw("TwoPtShootingFoulsDrawn") - r.raw(AND1_2PT))
                + (r.raw("ThreePtShootingFoulsDrawn") - r.raw(AND1_3PT)),
        )
    })?;
    derive(t, "NonShooting_FT_Possessions", |r| Some(r.raw("NonShootingFoulsDrawn")))?;
    derive(t, "FT_Possessions", |r| {
        Some(r.get("Shooting_FT_Possessions")? + r.get("NonShooting_FT_Possessions")?)
    })?;
    derive(t, "FT_PERC", |r| ratio(r.raw("FtPoints"), r.raw("FTA")))
}

fn field_goals(t: &mut Table, _ctx: &MetricContext) -> Result<(), TableError> {
    derive(t, "FGA", |r| Some(r.raw("FG2A") + r.raw("FG3A")))?;
    derive(t, "FGM", |r| Some(r.raw("FG2M") + r.raw("FG3M")))?;
    derive(t, "2P_PERC", |r| ratio(r.raw("FG2M"), r.raw("FG2A")))?;
    derive(t, "3P_PERC", |r| {
        Some(ratio(r.raw("FG3M"), r.raw("FG3A")).unwrap_or(0.0))
    })?;
    derive(t, "FTA_100", |r| per100(r.raw("FTA"), r.raw("OffPoss")))?;
    derive(t, "2PA_100", |r| per100(r.raw("FG2A"), r.raw("OffPoss")))?;
    derive(t, "3PA_100", |r| per100(r.raw("FG3A"), r.raw("OffPoss")))?;
    derive(t, "FG3A100", |r| per100(r.raw("FG3A"), r.raw("OffPoss")))
}

fn split_true_shooting(t: &mut Table, _ctx: &MetricContext) -> Result<(), TableError> {
    // Two-point attempts absorb non-and-one shooting trips plus non-shooting trips.
    derive(t, "2TSA", |r| {
        Some(
            r.raw("FG2A") + (r.raw("TwoPtShootingFoulsDrawn") - r.raw(AND1_2PT))
                + r.raw("NonShootingFoulsDrawn"),
        )
    })?;
    derive(t, "2FTA", |r| {
        Some(
            (r.raw("TwoPtShootingFoulsDrawn") - r.raw(AND1_2PT)) * 2.0
                + r.raw(AND1_2PT)
                + r.raw("NonShootingFoulsDrawn") * 2.0,
        )
    })?;
    derive(t, "3TSA", |r| {
        Some(r.raw("FG3A") + (r.raw("ThreePtShootingFoulsDrawn") - r.raw(AND1_3PT)))
    })?;
    derive(t, "3FTA", |r| {
        Some((r.raw("ThreePtShootingFoulsDrawn") - r.raw(AND1_3PT)) * 3.0 + r.raw(AND1_3PT))
    })?;
    derive(t, "2FTPoints", |r| ft_points(r.get("2FTA")?, r.get("FT_PERC")))?;
    derive(t, "3FTPoints", |r| ft_points(r.get("3FTA")?, r.get("FT_PERC")))?;
    derive(t, "2_Points", |r| Some(r.get("2FTPoints")? + r.raw("FG2M") * 2.0))?;
    derive(t, "3_Points", |r| Some(r.get("3FTPoints")? + r.raw("FG3M") * 3.0))?;
    derive(t, "2TS_percent", |r| ratio(r.get("2_Points")?, 2.0 * r.get("2TSA")?))?;
    derive(t, "3TS_percent", |r| ratio(r.get("3_Points")?, 2.0 * r.get("3TSA")?))
}

fn true_shooting_attempts(t: &mut Table, _ctx: &MetricContext) -> Result<(), TableError> {
    derive(t, "TSA", |r| Some(r.get("FGA")? + r.get("FT_Possessions")?))?;
    derive(t, "TSA100", |r| per100(r.get("TSA")?, r.raw("OffPoss")))
}

fn true_shooting(t: &mut Table, _ctx: &MetricContext) -> Result<(), TableError> {
    derive(t, "mod_points", |r| {
        Some(r.raw("Points") - r.raw(TECH_TRIPS) * TECH_FT_POINTS)
    })?;
    derive(t, "TS_percent", |r| ratio(r.get("mod_points")?, 2.0 * r.get("TSA")?))?;
    derive(t, "TS_pct", |r| ratio(r.get("mod_points")?, 2.0 * r.get("TSA")?))?;
    // Own offensive rebounds come out of the attempt denominator.
    derive(t, "mod_ts", |r| {
        ratio(r.get("mod_points")?, 2.0 * (r.get("TSA")? - r.raw("SelfOReb")))
    })
}

fn ft_normalized_ts(t: &mut Table, _ctx: &MetricContext) -> Result<(), TableError> {
    derive(t, "diff_in_points", |r| {
        let fta = r.raw("FTA");
        Some(fta * NORMALIZED_FT_RATE - ft_points(fta, r.get("FT_PERC"))?)
    })?;
    derive(t, "TS_eightyfive", |r| {
        let points = r.raw("Points") + r.get("diff_in_points")? - r.raw(TECH_TRIPS) * TECH_FT_POINTS;
        ratio(points, 2.0 * r.get("TSA")?)
    })?;
    derive(t, "nontech_TS_percent", |r| {
        let points = r.raw("Points") - ft_points(r.raw(TECH_TRIPS), r.get("FT_PERC"))?;
        ratio(points, 2.0 * r.get("TSA")?)
    })
}

fn relative_split_ts(t: &mut Table, _ctx: &MetricContext) -> Result<(), TableError> {
    relative_to_year(t, "2TS_percent", "2TSA", "2ts_avg", "2rTS", 1.0)?;
    relative_to_year(t, "3TS_percent", "3TSA", "3ts_avg", "3rTS", 1.0)?;
    relative_to_year(t, "mod_ts", "TSA", "mod_ts_avg", "mod_rTS", 100.0)
}

fn league_relative_ts(t: &mut Table, ctx: &MetricContext) -> Result<(), TableError> {
    derive(t, "avg_ts", |r| ctx.league_ts.get(&r.year()?).copied())?;
    derive(t, "rTS", |r| Some(r.get("TS_pct")? - r.get("avg_ts")?))?;
    derive(t, "rTSPct", |r| Some(r.get("rTS")? * 100.0))?;
    derive(t, "TS_added_100", |r| Some(r.get("rTS")? * 2.0 * r.get("TSA100")?))
}

fn zone_accuracy(t: &mut Table, _ctx: &MetricContext) -> Result<(), TableError> {
    derive(t, "RimFGPerc", |r| ratio(r.raw("AtRimFGM"), r.raw("AtRimFGA")))?;
    derive(t, "ShortMidFGPerc", |r| {
        ratio(r.raw("ShortMidRangeFGM"), r.raw("ShortMidRangeFGA"))
    })?;
    derive(t, "LongMidFGPerc", |r| {
        ratio(r.raw("LongMidRangeFGM"), r.raw("LongMidRangeFGA"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::tests::{approx_eq, table_from};
    use crate::metrics::{MetricContext, MetricsEngine};

    const SHOOTER: &str = "\
year,Points,FG2A,FG2M,FG3A,FG3M,FTA,FtPoints,TwoPtShootingFoulsDrawn,ThreePtShootingFoulsDrawn,NonShootingFoulsDrawn,2pt And 1 Free Throw Trips,3pt And 1 Free Throw Trips,Technical Free Throw Trips,OffPoss,SelfOReb
2020,100,80,30,20,10,10,10,0,0,0,0,0,0,200,0
2020,50,30,15,10,5,20,16,6,1,2,1,0,1,0,4";

    fn enriched() -> Table {
        let mut table = table_from(SHOOTER);
        let engine = MetricsEngine::standard().unwrap();
        engine.apply(&mut table, &MetricContext::default()).unwrap();
        table
    }

    #[test]
    fn ts_pct_of_even_scorer_is_half() {
        let table = enriched();
        assert!(approx_eq(table.f64_at(0, "TSA").unwrap(), 100.0, 1e-12));
        assert!(approx_eq(table.f64_at(0, "TS_pct").unwrap(), 0.5, 1e-12));
        assert!(approx_eq(table.f64_at(0, "TS_percent").unwrap(), 0.5, 1e-12));
    }

    #[test]
    fn free_throw_trips_exclude_and_ones() {
        let table = enriched();
        // (6 - 1) + (1 - 0) shooting trips, 2 non-shooting.
        assert_eq!(table.f64_at(1, "Shooting_FT_Possessions"), Some(6.0));
        assert_eq!(table.f64_at(1, "FT_Possessions"), Some(8.0));
        assert!(approx_eq(table.f64_at(1, "FT_PERC").unwrap(), 0.8, 1e-12));
        // 2FTA = 5*2 + 1 + 2*2.
        assert_eq!(table.f64_at(1, "2FTA"), Some(15.0));
        assert_eq!(table.f64_at(1, "2TSA"), Some(30.0 + 5.0 + 2.0));
    }

    #[test]
    fn technical_trips_are_discounted() {
        let table = enriched();
        // TSA = 40 + 8; mod_points = 50 - 0.8.
        assert!(approx_eq(table.f64_at(1, "mod_points").unwrap(), 49.2, 1e-12));
        assert!(approx_eq(table.f64_at(1, "TS_pct").unwrap(), 49.2 / 96.0, 1e-12));
        // Self rebounds leave the denominator: 49.2 / (2 * (48 - 4)).
        assert!(approx_eq(table.f64_at(1, "mod_ts").unwrap(), 49.2 / 88.0, 1e-12));
        // FTA*0.85 - FTA*0.8 = 1.0 extra point.
        assert!(approx_eq(table.f64_at(1, "diff_in_points").unwrap(), 1.0, 1e-12));
        assert!(approx_eq(
            table.f64_at(1, "TS_eightyfive").unwrap(),
            (50.0 + 1.0 - 0.8) / 96.0,
            1e-12
        ));
        assert!(approx_eq(
            table.f64_at(1, "nontech_TS_percent").unwrap(),
            (50.0 - 0.8) / 96.0,
            1e-12
        ));
    }

    #[test]
    fn no_free_throws_leave_ft_dependent_metrics_missing() {
        let mut table = table_from(
            "\
year,Points,FG2A,FG2M,FG3A,FG3M,FTA,FtPoints,TwoPtShootingFoulsDrawn,ThreePtShootingFoulsDrawn,NonShootingFoulsDrawn,2pt And 1 Free Throw Trips,3pt And 1 Free Throw Trips,Technical Free Throw Trips,OffPoss,SelfOReb
2020,40,30,14,10,4,0,0,0,0,0,0,0,0,80,0",
        );
        let engine = MetricsEngine::standard().unwrap();
        engine.apply(&mut table, &MetricContext::default()).unwrap();

        assert_eq!(table.f64_at(0, "FT_PERC"), None);
        for column in [
            "2FTPoints",
            "3FTPoints",
            "2TS_percent",
            "3TS_percent",
            "diff_in_points",
            "TS_eightyfive",
            "nontech_TS_percent",
        ] {
            assert_eq!(table.f64_at(0, column), None, "{column}");
        }
        // Plain true shooting does not depend on the free-throw rate.
        assert!(approx_eq(table.f64_at(0, "TS_pct").unwrap(), 40.0 / 80.0, 1e-12));
    }

    #[test]
    fn zero_possessions_leave_rates_missing() {
        let table = enriched();
        for column in ["TSA100", "FTA_100", "2PA_100", "3PA_100", "FG3A100"] {
            assert_eq!(table.f64_at(1, column), None, "{column}");
        }
        assert!(approx_eq(table.f64_at(0, "TSA100").unwrap(), 50.0, 1e-12));
    }

    #[test]
    fn three_point_pct_zero_fills() {
        let mut table = table_from(
            "\
FG2A,FG2M,FG3A,FG3M,FTA,OffPoss
10,5,0,0,0,20",
        );
        field_goals(&mut table, &MetricContext::default()).unwrap();
        assert_eq!(table.f64_at(0, "3P_PERC"), Some(0.0));
        assert_eq!(table.f64_at(0, "2P_PERC"), Some(0.5));
    }

    #[test]
    fn league_relative_ts_uses_context_baseline() {
        let mut table = enriched();
        let mut ctx = MetricContext::default();
        ctx.league_ts.insert(2020, 0.45);
        league_relative_ts(&mut table, &ctx).unwrap();

        assert!(approx_eq(table.f64_at(0, "rTS").unwrap(), 0.05, 1e-12));
        assert!(approx_eq(table.f64_at(0, "rTSPct").unwrap(), 5.0, 1e-9));
        // rTS * 2 * TSA100 = 0.05 * 2 * 50.
        assert!(approx_eq(table.f64_at(0, "TS_added_100").unwrap(), 5.0, 1e-9));
        // No baseline for the year leaves the relative metrics missing.
        assert_eq!(enriched().f64_at(0, "rTS"), None);
    }

    #[test]
    fn split_relative_ts_centres_on_weighted_year_average() {
        let table = enriched();
        let avg = table.f64_at(0, "2ts_avg").unwrap();
        let w0 = table.f64_at(0, "2TSA").unwrap();
        let w1 = table.f64_at(1, "2TSA").unwrap();
        let v0 = table.f64_at(0, "2TS_percent").unwrap();
        let v1 = table.f64_at(1, "2TS_percent").unwrap();
        assert!(approx_eq(avg, (v0 * w0 + v1 * w1) / (w0 + w1), 1e-12));
        assert!(approx_eq(table.f64_at(0, "2rTS").unwrap(), v0 - avg, 1e-12));
    }
}
