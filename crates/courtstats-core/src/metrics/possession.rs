// Possession-scaled metrics: turnovers, teammate rebounding, per-game lines,
// assist zones, the normalised per-100 / per-game rates and hustle stats.

use super::{derive, per100, ratio, MetricContext, MetricGroup};
use crate::table::{Table, TableError};

/// Counting stats that get `d_{field}_Per100` and `d_{field}_PerGame` columns.
pub const RATE_FIELDS: [&str; 20] = [
    "Points",
    "AssistPoints",
    "Assists",
    "OffRebounds",
    "DefRebounds",
    "Rebounds",
    "Turnovers",
    "AtRimAssists",
    "OFFD",
    "Blocks",
    "Steals",
    "DEFLECTIONS",
    "AtRimFGA",
    "ShortMidRangeFGA",
    "LongMidRangeFGA",
    "FG3A",
    "FTA",
    "FGA",
    "FTOVs",
    "DEF_LOOSE_BALLS_RECOVERED",
];

const ASSIST_ZONES: [&str; 4] = [
    "AtRimAssists",
    "ShortMidRangeAssists",
    "LongMidRangeAssists",
    "ThreePtAssists",
];

pub(super) fn groups() -> Vec<MetricGroup> {
    let mut groups = vec![
        MetricGroup::new(
            "turnovers",
            &["Turnovers", "BadPassTurnovers", "OffPoss", "Points", "TSA", "TSA100"],
            &[
                "Pts75",
                "tov_100",
                "TOV_100",
                "final_bp_tov_100",
                "scoring_tov_100",
                "scoring_tovs",
                "scoring_tovs_100",
                "true_badpass_tovs",
                "true_badpass_tovs_100",
                "nonPassTOVPct",
                "ScoringTOV%",
                "firstchanceperc",
            ],
            turnovers,
        ),
        MetricGroup::new(
            "teammate_rebounding",
            &[
                "OffThreePtRebounds",
                "OffTwoPtRebounds",
                "OffFGReboundPct",
                "FGA",
                "FGM",
                "OffPoss",
            ],
            &[
                "totalORB",
                "total_team_misses",
                "SelfOReb/100",
                "total_teammate_misses",
                "teammatemissorb",
                "TeammateMissORebPerc",
            ],
            teammate_rebounding,
        ),
        MetricGroup::new(
            "per_game",
            &["GamesPlayed", "Points", "Assists", "Minutes"],
            &[
                "PPG",
                "APG",
                "MPG",
                "basic_PPG",
                "basic_aPPG",
                "basic_APG",
                "basic_ORB",
                "basic_DRB",
                "basic_REB",
                "basic_TOVPG",
            ],
            per_game,
        ),
        MetricGroup::new(
            "assist_zones",
            &[
                "AtRimAssists",
                "ShortMidRangeAssists",
                "LongMidRangeAssists",
                "ThreePtAssists",
                "Assists",
                "OffPoss",
            ],
            &[
                "AtRimAssists/100",
                "ShortMidRangeAssists/100",
                "LongMidRangeAssists/100",
                "ThreePtAssists/100",
                "Assists/100",
                "AdjAssists/100",
                "AssistPoints/100",
            ],
            assist_zones,
        ),
        MetricGroup::new(
            "points_created",
            &["Points", "AssistPoints", "OffPoss", "GamesPlayed"],
            &[
                "Points_Created",
                "d_Points_Created_Per100",
                "d_Points_Created_PerGame",
            ],
            points_created,
        ),
        MetricGroup::new(
            "hustle",
            &[
                "DEFLECTIONS",
                "Steals",
                "SCREEN_ASSISTS",
                "SCREEN_AST_PTS",
                "OFF_LOOSE_BALLS_RECOVERED",
                "DEF_LOOSE_BALLS_RECOVERED",
                "OffPoss",
                "DefPoss",
            ],
            &[
                "Deflections/100",
                "StealDeflectionRatio",
                "SCREEN_ASSISTS_100",
                "SCREEN_AST_PTS_100",
                "OFF_LOOSE_BALLS_RECOVERED_100",
                "DEF_LOOSE_BALLS_RECOVERED_100",
            ],
            hustle,
        ),
    ];
    groups.extend(RATE_FIELDS.iter().copied().map(rate_group));
    groups
}

/// Every normalised rate is per 100 offensive possessions, defensive
/// counting stats included. The hustle rates below use `DefPoss`.
fn rate_group(field: &'static str) -> MetricGroup {
    let per100_column = format!("d_{field}_Per100");
    let per_game_column = format!("d_{field}_PerGame");
    MetricGroup::with_columns(
        format!("rate:{field}"),
        vec![field.to_string(), "OffPoss".to_string(), "GamesPlayed".to_string()],
        vec![per100_column.clone(), per_game_column.clone()],
        move |t, _ctx| {
            derive(t, &per100_column, |r| per100(r.raw(field), r.raw("OffPoss")))?;
            derive(t, &per_game_column, |r| ratio(r.raw(field), r.raw("GamesPlayed")))
        },
    )
}

fn turnovers(t: &mut Table, _ctx: &MetricContext) -> Result<(), TableError> {
    derive(t, "Pts75", |r| {
        ratio(r.raw("Points"), r.raw("OffPoss")).map(|v| (v * 75.0 * 1000.0).round() / 1000.0)
    })?;
    derive(t, "true_badpass_tovs", |r| {
        Some(r.raw("BadPassTurnovers") + r.raw("BadPassOutOfBoundsTurnovers"))
    })?;
    derive(t, "scoring_tovs", |r| Some(r.raw("Turnovers") - r.get("true_badpass_tovs")?))?;

    for (column, source) in [
        ("final_bp_tov_100", "true_badpass_tovs"),
        ("true_badpass_tovs_100", "true_badpass_tovs"),
        ("scoring_tov_100", "scoring_tovs"),
        ("scoring_tovs_100", "scoring_tovs"),
        ("tov_100", "Turnovers"),
        ("TOV_100", "Turnovers"),
    ] {
        derive(t, column, |r| per100(r.get(source)?, r.raw("OffPoss")))?;
    }

    derive(t, "nonPassTOVPct", |r| {
        Some(ratio(r.get("scoring_tovs")?, r.get("TSA")?)? * 100.0)
    })?;
    derive(t, "ScoringTOV%", |r| ratio(r.get("scoring_tovs")?, r.get("TSA100")?))?;
    derive(t, "firstchanceperc", |r| {
        let first = r.raw("FirstChancePoints");
        ratio(first, first + r.raw("SecondChancePoints"))
    })
}

fn teammate_rebounding(t: &mut Table, _ctx: &MetricContext) -> Result<(), TableError> {
    derive(t, "totalORB", |r| {
        Some(r.raw("OffThreePtRebounds") + r.raw("OffTwoPtRebounds"))
    })?;
    derive(t, "total_team_misses", |r| {
        ratio(r.get("totalORB")?, r.raw("OffFGReboundPct"))
    })?;
    derive(t, "SelfOReb/100", |r| Some(r.raw("SelfOReb") / 100.0 * r.raw("OffPoss")))?;
    derive(t, "total_teammate_misses", |r| {
        Some(r.get("total_team_misses")? - (r.get("FGA")? - r.get("FGM")?))
    })?;
    derive(t, "teammatemissorb", |r| Some(r.get("totalORB")? - r.raw("SelfOReb")))?;
    derive(t, "TeammateMissORebPerc", |r| {
        let pct = r
            .get("teammatemissorb")
            .zip(r.get("total_teammate_misses"))
            .and_then(|(n, d)| ratio(n, d));
        Some(pct.unwrap_or(0.0))
    })
}

fn per_game(t: &mut Table, _ctx: &MetricContext) -> Result<(), TableError> {
    for (column, source) in [
        ("PPG", "Points"),
        ("APG", "Assists"),
        ("MPG", "Minutes"),
        ("basic_PPG", "Points"),
        ("basic_aPPG", "AssistPoints"),
        ("basic_APG", "Assists"),
        ("basic_ORB", "OffRebounds"),
        ("basic_DRB", "DefRebounds"),
        ("basic_TOVPG", "Turnovers"),
    ] {
        derive(t, column, |r| ratio(r.raw(source), r.raw("GamesPlayed")))?;
    }
    derive(t, "basic_REB", |r| {
        ratio(r.raw("DefRebounds") + r.raw("OffRebounds"), r.raw("GamesPlayed"))
    })
}

fn assist_zones(t: &mut Table, _ctx: &MetricContext) -> Result<(), TableError> {
    for zone in ASSIST_ZONES.iter().chain(std::iter::once(&"Assists")) {
        derive(t, &format!("{zone}/100"), |r| per100(r.raw(zone), r.raw("OffPoss")))?;
    }
    derive(t, "AdjAssists/100", |r| {
        Some(
            r.get("AtRimAssists/100")?
                + r.get("ShortMidRangeAssists/100")?
                + r.get("LongMidRangeAssists/100")?
                + r.get("ThreePtAssists/100")? * 1.5,
        )
    })?;
    derive(t, "AssistPoints/100", |r| {
        Some(
            r.get("AtRimAssists/100")? * 2.0
                + r.get("ShortMidRangeAssists/100")? * 2.0
                + r.get("LongMidRangeAssists/100")? * 2.0
                + r.get("ThreePtAssists/100")? * 3.0,
        )
    })
}

fn points_created(t: &mut Table, _ctx: &MetricContext) -> Result<(), TableError> {
    derive(t, "Points_Created", |r| Some(r.raw("Points") + r.raw("AssistPoints")))?;
    derive(t, "d_Points_Created_Per100", |r| {
        per100(r.get("Points_Created")?, r.raw("OffPoss"))
    })?;
    derive(t, "d_Points_Created_PerGame", |r| {
        ratio(r.get("Points_Created")?, r.raw("GamesPlayed"))
    })
}

fn hustle(t: &mut Table, _ctx: &MetricContext) -> Result<(), TableError> {
    derive(t, "Deflections/100", |r| per100(r.raw("DEFLECTIONS"), r.raw("DefPoss")))?;
    derive(t, "StealDeflectionRatio", |r| {
        ratio(r.raw("Steals"), r.raw("DEFLECTIONS"))
    })?;
    for (column, source, poss) in [
        ("SCREEN_ASSISTS_100", "SCREEN_ASSISTS", "OffPoss"),
        ("SCREEN_AST_PTS_100", "SCREEN_AST_PTS", "OffPoss"),
        ("OFF_LOOSE_BALLS_RECOVERED_100", "OFF_LOOSE_BALLS_RECOVERED", "OffPoss"),
        ("DEF_LOOSE_BALLS_RECOVERED_100", "DEF_LOOSE_BALLS_RECOVERED", "DefPoss"),
    ] {
        derive(t, column, |r| per100(r.raw(source), r.raw(poss)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::tests::{approx_eq, table_from};

    #[test]
    fn turnover_split() {
        let mut table = table_from(
            "\
Turnovers,BadPassTurnovers,BadPassOutOfBoundsTurnovers,OffPoss,Points,TSA,TSA100,FirstChancePoints,SecondChancePoints
20,6,2,400,300,250,62.5,270,30",
        );
        turnovers(&mut table, &MetricContext::default()).unwrap();

        assert_eq!(table.f64_at(0, "true_badpass_tovs"), Some(8.0));
        assert_eq!(table.f64_at(0, "scoring_tovs"), Some(12.0));
        assert!(approx_eq(table.f64_at(0, "final_bp_tov_100").unwrap(), 2.0, 1e-12));
        assert!(approx_eq(table.f64_at(0, "scoring_tov_100").unwrap(), 3.0, 1e-12));
        assert!(approx_eq(table.f64_at(0, "TOV_100").unwrap(), 5.0, 1e-12));
        assert!(approx_eq(table.f64_at(0, "nonPassTOVPct").unwrap(), 4.8, 1e-12));
        assert!(approx_eq(table.f64_at(0, "Pts75").unwrap(), 56.25, 1e-12));
        assert!(approx_eq(table.f64_at(0, "firstchanceperc").unwrap(), 0.9, 1e-12));
    }

    #[test]
    fn teammate_rebound_share_zero_fills() {
        let mut table = table_from(
            "\
OffThreePtRebounds,OffTwoPtRebounds,OffFGReboundPct,FGA,FGM,OffPoss,SelfOReb
10,30,0.25,100,45,500,5
0,0,0,10,5,50,0",
        );
        teammate_rebounding(&mut table, &MetricContext::default()).unwrap();

        // 40 / 0.25 = 160 team misses, minus 55 own misses.
        assert_eq!(table.f64_at(0, "total_team_misses"), Some(160.0));
        assert_eq!(table.f64_at(0, "total_teammate_misses"), Some(105.0));
        assert!(approx_eq(
            table.f64_at(0, "TeammateMissORebPerc").unwrap(),
            35.0 / 105.0,
            1e-12
        ));
        assert_eq!(table.f64_at(1, "total_team_misses"), None);
        assert_eq!(table.f64_at(1, "TeammateMissORebPerc"), Some(0.0));
    }

    #[test]
    fn defensive_rates_scale_by_offensive_possessions() {
        let mut table = table_from(
            "\
Points,Steals,OffPoss,DefPoss,GamesPlayed
200,10,400,500,20
10,1,0,0,0",
        );
        let ctx = MetricContext::default();
        rate_group("Points").run(&mut table, &ctx).unwrap();
        rate_group("Steals").run(&mut table, &ctx).unwrap();

        assert!(approx_eq(table.f64_at(0, "d_Points_Per100").unwrap(), 50.0, 1e-12));
        assert!(approx_eq(table.f64_at(0, "d_Points_PerGame").unwrap(), 10.0, 1e-12));
        // 10 * 100 / 400, not / 500.
        assert!(approx_eq(table.f64_at(0, "d_Steals_Per100").unwrap(), 2.5, 1e-12));
        assert_eq!(table.f64_at(1, "d_Points_Per100"), None);
        assert_eq!(table.f64_at(1, "d_Steals_PerGame"), None);
    }

    #[test]
    fn assist_zone_weights() {
        let mut table = table_from(
            "\
AtRimAssists,ShortMidRangeAssists,LongMidRangeAssists,ThreePtAssists,Assists,OffPoss
10,5,5,20,40,100",
        );
        assist_zones(&mut table, &MetricContext::default()).unwrap();
        assert!(approx_eq(table.f64_at(0, "AdjAssists/100").unwrap(), 50.0, 1e-12));
        assert!(approx_eq(table.f64_at(0, "AssistPoints/100").unwrap(), 100.0, 1e-12));
        assert!(approx_eq(table.f64_at(0, "Assists/100").unwrap(), 40.0, 1e-12));
    }

    #[test]
    fn steal_deflection_ratio_missing_without_deflections() {
        let mut table = table_from(
            "\
DEFLECTIONS,Steals,SCREEN_ASSISTS,SCREEN_AST_PTS,OFF_LOOSE_BALLS_RECOVERED,DEF_LOOSE_BALLS_RECOVERED,OffPoss,DefPoss
0,3,1,2,1,1,100,100",
        );
        hustle(&mut table, &MetricContext::default()).unwrap();
        assert_eq!(table.f64_at(0, "StealDeflectionRatio"), None);
        assert_eq!(table.f64_at(0, "SCREEN_AST_PTS_100"), Some(2.0));
    }
}
