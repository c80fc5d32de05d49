// Defensive metrics: takeaways and stops, foul rates, shots-defended impact
// and the on/off-court breakdown.

use super::baseline::{relative_to_year, YearBaseline};
use super::{derive, per100, ratio, DefensiveBaseline, MetricContext, MetricGroup};
use crate::table::{Table, TableError};

pub(super) fn groups() -> Vec<MetricGroup> {
    vec![
        MetricGroup::new(
            "defense",
            &["Steals", "Blocks", "RecoveredBlocks", "DefPoss", "GamesPlayed"],
            &[
                "OFFD",
                "OFFD_100",
                "Steals_100",
                "FTOVs",
                "FTOVS_PG",
                "FTOV_100",
                "STOPS",
                "STOPS_100",
                "block_recov_percent",
                "Blocks_100",
                "Blocks_PG",
                "RecoveredBlocks_100",
            ],
            defense,
        ),
        MetricGroup::new(
            "fouls",
            &["ShootingFouls", "DefPoss"],
            &[
                "SFC_100",
                "DumbPenaltyFouls",
                "DumbPenaltyFouls_100",
                "PenaltyDefPossPct",
            ],
            fouls,
        ),
        MetricGroup::new(
            "relative_defense",
            &["year", "FTOV_100", "STOPS_100", "DefPoss"],
            &["year_avg_ftov", "rFTOV_100", "year_avg_stops", "rSTOPS_100"],
            relative_defense,
        ),
        MetricGroup::new(
            "relative_fouls",
            &["year", "SFC_100", "DumbPenaltyFouls_100", "DefPoss"],
            &["year_avg_sfc", "rSFC_100", "year_avg_dpf", "rDumbPenaltyFouls_100"],
            relative_fouls,
        ),
        MetricGroup::new(
            "defensive_impact",
            &["all_dfga", "dif%", "rim_dfga", "rim_dif%", "DefPoss"],
            &[
                "points_saved",
                "rim_points_saved",
                "points_saved_100",
                "rim_points_saved_100",
                "dfga/100",
                "rimdfga/100",
            ],
            defensive_impact,
        ),
        MetricGroup::new(
            "on_off",
            &[
                "year",
                "rim_acc_on",
                "rim_acc_off",
                "rim_freq_on",
                "rim_freq_off",
                "ortg_on",
                "ortg_off",
                "drtg_on",
                "drtg_off",
                "netrtg_on",
                "netrtg_off",
                "OffPoss",
                "DefPoss",
            ],
            &[
                "rim_acc_onoff",
                "rim_freq_onoff",
                "rortg_on_off",
                "rdrtg_on_off",
                "netrtg_on_off",
                "r_rim_acc_on",
                "r_rim_freq_on",
                "rortg_on",
                "rdrtg_on",
            ],
            on_off,
        ),
    ]
}

fn defense(t: &mut Table, _ctx: &MetricContext) -> Result<(), TableError> {
    derive(t, "OFFD", |r| {
        Some(r.raw("Offensive Fouls Drawn") + r.raw("Charge Fouls Drawn"))
    })?;
    derive(t, "OFFD_100", |r| per100(r.get("OFFD")?, r.raw("DefPoss")))?;
    derive(t, "Steals_100", |r| per100(r.raw("Steals"), r.raw("DefPoss")))?;
    derive(t, "FTOVs", |r| Some(r.raw("Steals") + r.get("OFFD")?))?;
    derive(t, "FTOVS_PG", |r| ratio(r.get("FTOVs")?, r.raw("GamesPlayed")))?;
    derive(t, "FTOV_100", |r| Some(r.get("OFFD_100")? + r.get("Steals_100")?))?;
    derive(t, "STOPS", |r| Some(r.get("FTOVs")? + r.raw("RecoveredBlocks")))?;
    derive(t, "STOPS_100", |r| per100(r.get("STOPS")?, r.raw("DefPoss")))?;
    derive(t, "block_recov_percent", |r| {
        Some(ratio(r.raw("RecoveredBlocks"), r.raw("Blocks")).unwrap_or(0.0))
    })?;
    derive(t, "Blocks_100", |r| per100(r.raw("Blocks"), r.raw("DefPoss")))?;
    derive(t, "Blocks_PG", |r| ratio(r.raw("Blocks"), r.raw("GamesPlayed")))?;
    derive(t, "RecoveredBlocks_100", |r| {
        per100(r.raw("RecoveredBlocks"), r.raw("DefPoss"))
    })
}

fn fouls(t: &mut Table, _ctx: &MetricContext) -> Result<(), TableError> {
    derive(t, "SFC_100", |r| per100(r.raw("ShootingFouls"), r.raw("DefPoss")))?;
    derive(t, "DumbPenaltyFouls", |r| Some(r.raw("NonShootingPenaltyNonTakeFouls")))?;
    derive(t, "DumbPenaltyFouls_100", |r| {
        per100(r.get("DumbPenaltyFouls")?, r.raw("PenaltyDefPoss"))
    })?;
    derive(t, "PenaltyDefPossPct", |r| {
        ratio(r.raw("PenaltyDefPoss"), r.raw("DefPoss"))
    })
}

fn relative_defense(t: &mut Table, _ctx: &MetricContext) -> Result<(), TableError> {
    relative_to_year(t, "FTOV_100", "DefPoss", "year_avg_ftov", "rFTOV_100", 1.0)?;
    relative_to_year(t, "STOPS_100", "DefPoss", "year_avg_stops", "rSTOPS_100", 1.0)
}

fn relative_fouls(t: &mut Table, _ctx: &MetricContext) -> Result<(), TableError> {
    relative_to_year(t, "SFC_100", "DefPoss", "year_avg_sfc", "rSFC_100", 1.0)?;
    relative_to_year(
        t,
        "DumbPenaltyFouls_100",
        "PenaltyDefPoss",
        "year_avg_dpf",
        "rDumbPenaltyFouls_100",
        1.0,
    )
}

fn defensive_impact(t: &mut Table, _ctx: &MetricContext) -> Result<(), TableError> {
    derive(t, "points_saved", |r| Some(r.get("all_dfga")? * r.get("dif%")? * -2.0 / 100.0))?;
    derive(t, "rim_points_saved", |r| {
        Some(r.get("rim_dfga")? * r.get("rim_dif%")? * -2.0 / 100.0)
    })?;
    derive(t, "points_saved_100", |r| per100(r.get("points_saved")?, r.get("DefPoss")?))?;
    derive(t, "rim_points_saved_100", |r| {
        per100(r.get("rim_points_saved")?, r.get("DefPoss")?)
    })?;
    derive(t, "dfga/100", |r| per100(r.get("all_dfga")?, r.get("DefPoss")?))?;
    derive(t, "rimdfga/100", |r| per100(r.get("rim_dfga")?, r.get("DefPoss")?))
}

fn on_off(t: &mut Table, ctx: &MetricContext) -> Result<(), TableError> {
    let rim_acc = YearBaseline::weighted(t, "rim_acc_on", "DefPoss");
    let rim_freq = YearBaseline::weighted(t, "rim_freq_on", "DefPoss");
    let ortg = YearBaseline::weighted(t, "ortg_on", "OffPoss");
    let drtg_baseline = match ctx.defensive_baseline {
        DefensiveBaseline::OffensiveAverage => ortg.clone(),
        DefensiveBaseline::DefensiveAverage => YearBaseline::weighted(t, "drtg_on", "DefPoss"),
    };

    derive(t, "rim_acc_onoff", |r| {
        Some((r.get("rim_acc_on")? - r.get("rim_acc_off")?) * 100.0)
    })?;
    derive(t, "rim_freq_onoff", |r| {
        Some((r.get("rim_freq_on")? - r.get("rim_freq_off")?) * 100.0)
    })?;
    derive(t, "rortg_on_off", |r| Some(r.get("ortg_on")? - r.get("ortg_off")?))?;
    // A lower defensive rating on court is better, so the sign flips.
    derive(t, "rdrtg_on_off", |r| Some(-(r.get("drtg_on")? - r.get("drtg_off")?)))?;
    derive(t, "netrtg_on_off", |r| Some(r.get("netrtg_on")? - r.get("netrtg_off")?))?;

    derive(t, "r_rim_acc_on", |r| {
        Some((r.get("rim_acc_on")? - rim_acc.get(r.year()?)?) * 100.0)
    })?;
    derive(t, "r_rim_freq_on", |r| {
        Some((r.get("rim_freq_on")? - rim_freq.get(r.year()?)?) * 100.0)
    })?;
    derive(t, "rortg_on", |r| Some(r.get("ortg_on")? - ortg.get(r.year()?)?))?;
    derive(t, "rdrtg_on", |r| {
        Some(-(r.get("drtg_on")? - drtg_baseline.get(r.year()?)?))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::tests::{approx_eq, table_from};

    #[test]
    fn takeaways_and_stops() {
        let mut table = table_from(
            "\
Steals,Blocks,RecoveredBlocks,DefPoss,GamesPlayed,Offensive Fouls Drawn,Charge Fouls Drawn
10,8,2,200,10,3,1
0,0,0,0,0,,",
        );
        defense(&mut table, &MetricContext::default()).unwrap();

        assert_eq!(table.f64_at(0, "OFFD"), Some(4.0));
        assert_eq!(table.f64_at(0, "FTOVs"), Some(14.0));
        assert_eq!(table.f64_at(0, "STOPS"), Some(16.0));
        assert!(approx_eq(table.f64_at(0, "FTOV_100").unwrap(), 7.0, 1e-12));
        assert!(approx_eq(table.f64_at(0, "STOPS_100").unwrap(), 8.0, 1e-12));
        assert!(approx_eq(table.f64_at(0, "block_recov_percent").unwrap(), 0.25, 1e-12));

        assert_eq!(table.f64_at(1, "OFFD"), Some(0.0));
        assert_eq!(table.f64_at(1, "STOPS_100"), None);
        assert_eq!(table.f64_at(1, "block_recov_percent"), Some(0.0));
    }

    #[test]
    fn points_saved_sign_and_scale() {
        let mut table = table_from(
            "\
all_dfga,dif%,rim_dfga,rim_dif%,DefPoss
200,-5,80,-10,1000
100,,50,2,0",
        );
        defensive_impact(&mut table, &MetricContext::default()).unwrap();

        // 200 * -5 * -2 / 100 = 20 points saved.
        assert!(approx_eq(table.f64_at(0, "points_saved").unwrap(), 20.0, 1e-12));
        assert!(approx_eq(table.f64_at(0, "rim_points_saved").unwrap(), 16.0, 1e-12));
        assert!(approx_eq(table.f64_at(0, "points_saved_100").unwrap(), 2.0, 1e-12));
        assert!(approx_eq(table.f64_at(0, "dfga/100").unwrap(), 20.0, 1e-12));

        assert_eq!(table.f64_at(1, "points_saved"), None);
        assert_eq!(table.f64_at(1, "rim_points_saved_100"), None);
    }

    const ON_OFF: &str = "\
year,rim_acc_on,rim_acc_off,rim_freq_on,rim_freq_off,ortg_on,ortg_off,drtg_on,drtg_off,netrtg_on,netrtg_off,OffPoss,DefPoss
2020,0.60,0.55,0.30,0.32,110,100,100,104,10,-4,100,100
2020,0.50,0.52,0.20,0.25,100,102,90,95,10,7,100,300";

    #[test]
    fn on_off_differences() {
        let mut table = table_from(ON_OFF);
        on_off(&mut table, &MetricContext::default()).unwrap();

        assert!(approx_eq(table.f64_at(0, "rim_acc_onoff").unwrap(), 5.0, 1e-9));
        assert!(approx_eq(table.f64_at(0, "rortg_on_off").unwrap(), 10.0, 1e-12));
        assert!(approx_eq(table.f64_at(0, "rdrtg_on_off").unwrap(), 4.0, 1e-12));
        assert!(approx_eq(table.f64_at(0, "netrtg_on_off").unwrap(), 14.0, 1e-12));
        // DefPoss-weighted rim accuracy: (0.6*100 + 0.5*300) / 400 = 0.525.
        assert!(approx_eq(table.f64_at(0, "r_rim_acc_on").unwrap(), 7.5, 1e-9));
        // Inputs are left untouched.
        assert_eq!(table.f64_at(0, "rim_acc_on"), Some(0.60));
    }

    #[test]
    fn rdrtg_baseline_modes() {
        // Yearly ortg average (OffPoss-weighted) is 105; drtg average (DefPoss) is 92.5.
        let mut legacy = table_from(ON_OFF);
        on_off(&mut legacy, &MetricContext::default()).unwrap();
        assert!(approx_eq(legacy.f64_at(0, "rdrtg_on").unwrap(), 5.0, 1e-9));

        let mut corrected = table_from(ON_OFF);
        let ctx = MetricContext {
            defensive_baseline: DefensiveBaseline::DefensiveAverage,
            ..MetricContext::default()
        };
        on_off(&mut corrected, &ctx).unwrap();
        assert!(approx_eq(corrected.f64_at(0, "rdrtg_on").unwrap(), -7.5, 1e-9));
    }

    #[test]
    fn relative_fouls_weight_by_penalty_possessions() {
        let mut table = table_from(
            "\
year,ShootingFouls,DefPoss,NonShootingPenaltyNonTakeFouls,PenaltyDefPoss
2021,10,500,2,100
2021,30,500,6,100",
        );
        fouls(&mut table, &MetricContext::default()).unwrap();
        relative_fouls(&mut table, &MetricContext::default()).unwrap();

        assert!(approx_eq(table.f64_at(0, "SFC_100").unwrap(), 2.0, 1e-12));
        assert!(approx_eq(table.f64_at(0, "year_avg_sfc").unwrap(), 4.0, 1e-12));
        assert!(approx_eq(table.f64_at(0, "rSFC_100").unwrap(), -2.0, 1e-12));
        assert!(approx_eq(table.f64_at(1, "rDumbPenaltyFouls_100").unwrap(), 2.0, 1e-12));
        assert!(approx_eq(table.f64_at(0, "PenaltyDefPossPct").unwrap(), 0.2, 1e-12));
    }
}
