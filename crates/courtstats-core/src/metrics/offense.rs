// Offensive load (box creation, offensive load, creation turnover rate) and
// play-type true shooting.

use super::baseline::relative_to_year;
use super::{derive, ratio, MetricContext, MetricGroup};
use crate::table::{Table, TableError};

const PLAY_TYPES: [&str; 3] = ["creation", "shooting", "ee"];

pub(super) fn groups() -> Vec<MetricGroup> {
    let mut groups = vec![
        MetricGroup::new(
            "offense_load",
            &[
                "d_FG3A_Per100",
                "3P_PERC",
                "d_Assists_Per100",
                "d_Points_Per100",
                "d_Turnovers_Per100",
                "d_FGA_Per100",
                "d_FTA_Per100",
            ],
            &["three_pt_prof", "box_creation", "offensive_load", "cTOV"],
            offense_load,
        ),
        MetricGroup::new(
            "shooting_foul_rate",
            &["SFC_100", "dfga/100"],
            &["SFC_pct"],
            |t, _ctx| derive(t, "SFC_pct", |r| Some(ratio(r.get("SFC_100")?, r.get("dfga/100")?)? * 100.0)),
        ),
    ];
    groups.extend(PLAY_TYPES.iter().copied().map(play_type_group));
    groups
}

/// Sigmoid-scaled three-point volume times accuracy.
pub fn three_pt_proficiency(fg3a_per100: f64, fg3_pct: f64) -> f64 {
    (2.0 / (1.0 + (-fg3a_per100).exp()) - 1.0) * fg3_pct
}

pub fn box_creation(ast100: f64, pts100: f64, tov100: f64, three_pt_prof: f64) -> f64 {
    ast100 * 0.1843 + (pts100 + tov100) * 0.0969 - 2.3021 * three_pt_prof
        + 0.0582 * (ast100 * (pts100 + tov100) * three_pt_prof)
        - 1.1942
}

pub fn offensive_load(ast100: f64, fga100: f64, fta100: f64, tov100: f64, box_creation: f64) -> f64 {
    (ast100 - 0.38 * box_creation) * 0.75 + fga100 + fta100 * 0.44 + box_creation + tov100
}

fn offense_load(t: &mut Table, _ctx: &MetricContext) -> Result<(), TableError> {
    derive(t, "three_pt_prof", |r| {
        Some(three_pt_proficiency(r.get("d_FG3A_Per100")?, r.get("3P_PERC")?))
    })?;
    derive(t, "box_creation", |r| {
        Some(box_creation(
            r.get("d_Assists_Per100")?,
            r.get("d_Points_Per100")?,
            r.get("d_Turnovers_Per100")?,
            r.get("three_pt_prof")?,
        ))
    })?;
    derive(t, "offensive_load", |r| {
        Some(offensive_load(
            r.get("d_Assists_Per100")?,
            r.get("d_FGA_Per100")?,
            r.get("d_FTA_Per100")?,
            r.get("d_Turnovers_Per100")?,
            r.get("box_creation")?,
        ))
    })?;
    derive(t, "cTOV", |r| {
        ratio(r.get("d_Turnovers_Per100")?, r.get("offensive_load")?)
    })
}

fn play_type_group(kind: &'static str) -> MetricGroup {
    let rate = format!("final_{kind}_TSA100");
    let ts = format!("final_{kind}_TS");
    let attempts = format!("final_{kind}_TSA");
    let avg = format!("final_{kind}_avg_ts");
    let relative = format!("final_{kind}_rTS");
    MetricGroup::with_columns(
        format!("play_type_ts:{kind}"),
        vec!["year".into(), "OffPoss".into(), rate.clone(), ts.clone()],
        vec![attempts.clone(), avg.clone(), relative.clone()],
        move |t, _ctx| {
            derive(t, &attempts, |r| Some(r.get(&rate)? * r.get("OffPoss")? / 100.0))?;
            relative_to_year(t, &ts, &attempts, &avg, &relative, 1.0)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::tests::{approx_eq, table_from};

    #[test]
    fn box_creation_reproduces_published_coefficients() {
        // FG3A100 = 0 makes the sigmoid term vanish.
        let prof = three_pt_proficiency(0.0, 0.4);
        assert!(approx_eq(prof, 0.0, 1e-12));
        let bc = box_creation(10.0, 30.0, 5.0, prof);
        assert!(approx_eq(bc, 1.843 + 35.0 * 0.0969 - 1.1942, 1e-12));

        let load = offensive_load(10.0, 25.0, 8.0, 5.0, bc);
        let expected = (10.0 - 0.38 * bc) * 0.75 + 25.0 + 8.0 * 0.44 + bc + 5.0;
        assert!(approx_eq(load, expected, 1e-12));
    }

    #[test]
    fn three_pt_proficiency_saturates() {
        let prof = three_pt_proficiency(50.0, 0.35);
        assert!(approx_eq(prof, 0.35, 1e-9));
    }

    #[test]
    fn offense_load_columns() {
        let mut table = table_from(
            "\
d_FG3A_Per100,3P_PERC,d_Assists_Per100,d_Points_Per100,d_Turnovers_Per100,d_FGA_Per100,d_FTA_Per100
6,0.36,8,28,4,22,7",
        );
        offense_load(&mut table, &MetricContext::default()).unwrap();

        let prof = three_pt_proficiency(6.0, 0.36);
        let bc = box_creation(8.0, 28.0, 4.0, prof);
        let load = offensive_load(8.0, 22.0, 7.0, 4.0, bc);
        assert!(approx_eq(table.f64_at(0, "box_creation").unwrap(), bc, 1e-12));
        assert!(approx_eq(table.f64_at(0, "offensive_load").unwrap(), load, 1e-12));
        assert!(approx_eq(table.f64_at(0, "cTOV").unwrap(), 4.0 / load, 1e-12));
    }

    #[test]
    fn play_type_ts_relative_to_attempt_weighted_year() {
        let mut table = table_from(
            "\
year,OffPoss,final_creation_TSA100,final_creation_TS
2022,1000,10,0.60
2022,500,20,0.50",
        );
        play_type_group("creation")
            .run(&mut table, &MetricContext::default())
            .unwrap();

        // Both rows carry 100 attempts, so the average is the plain mean.
        assert!(approx_eq(table.f64_at(0, "final_creation_TSA").unwrap(), 100.0, 1e-12));
        assert!(approx_eq(table.f64_at(0, "final_creation_avg_ts").unwrap(), 0.55, 1e-12));
        assert!(approx_eq(table.f64_at(1, "final_creation_rTS").unwrap(), -0.05, 1e-12));
    }
}
