// Season file discovery.
//
// A season is identified by its year and whether it is the playoffs. Files
// follow the scrapers' naming: `2010_bballref.csv`, `2010ps_pbp.csv`,
// `team_2010_pbp.csv`.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeasonKey {
    pub year: i32,
    pub playoffs: bool,
}

impl SeasonKey {
    pub fn new(year: i32, playoffs: bool) -> Self {
        Self { year, playoffs }
    }

    /// File-name stem and identity-map label, e.g. `2010` or `2010ps`.
    pub fn label(&self) -> String {
        format!("{}{}", self.year, if self.playoffs { "ps" } else { "" })
    }

    /// Shooting-baseline label, e.g. `2009-10` for the 2010 season.
    pub fn baseline_label(&self) -> String {
        format!("{}-{:02}", self.year - 1, self.year.rem_euclid(100))
    }

    /// Parse a label produced by [`SeasonKey::label`].
    pub fn parse(label: &str) -> Option<Self> {
        let (digits, playoffs) = match label.strip_suffix("ps") {
            Some(rest) => (rest, true),
            None => (label, false),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(|year| Self::new(year, playoffs))
    }

    pub fn reference_file(&self) -> String {
        format!("{}_bballref.csv", self.label())
    }

    pub fn entity_file(&self) -> String {
        format!("{}_pbp.csv", self.label())
    }

    pub fn team_totals_file(&self) -> String {
        format!("team_{}_pbp.csv", self.label())
    }

    pub fn combined_file(&self) -> String {
        format!("{}_combined.csv", self.label())
    }
}

impl fmt::Display for SeasonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.year,
            if self.playoffs { "playoffs" } else { "regular season" }
        )
    }
}

/// Input files found for one season.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonFiles {
    pub key: SeasonKey,
    pub reference: PathBuf,
    /// Play-by-play player file; `None` when the partner file is absent.
    pub entity: Option<PathBuf>,
    pub team_totals: Option<PathBuf>,
}

/// Every season with a reference file in `data_dir`, in ascending order
/// (a regular season sorts before its playoffs).
pub fn discover_seasons(data_dir: &Path) -> std::io::Result<Vec<SeasonFiles>> {
    let mut keys = Vec::new();
    for entry in std::fs::read_dir(data_dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(stem) = name.strip_suffix("_bballref.csv") else {
            continue;
        };
        match SeasonKey::parse(stem) {
            Some(key) => keys.push(key),
            None => warn!("ignoring reference file with unrecognized name: {name}"),
        }
    }
    keys.sort();

    Ok(keys
        .into_iter()
        .map(|key| {
            let existing = |name: String| Some(data_dir.join(name)).filter(|p| p.is_file());
            SeasonFiles {
                key,
                reference: data_dir.join(key.reference_file()),
                entity: existing(key.entity_file()),
                team_totals: existing(key.team_totals_file()),
            }
        })
        .collect())
}
