use std::fmt;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::{DashboardError, Result};

pub const SCHEMA: &str = "edu_dashboard";

const GRADES_YEARS: [u16; 5] = [2019, 2020, 2021, 2022, 2024];
const FINALS_YEARS: [u16; 5] = [2019, 2020, 2021, 2022, 2023];

/// Finals years kept on the archive source.
const ARCHIVED_FINALS: std::ops::RangeInclusive<u16> = 2019..=2021;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Grades,
    Finals,
}

impl DatasetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DatasetKind::Grades => "grades",
            DatasetKind::Finals => "finals",
        }
    }

    pub fn supported_years(self) -> &'static [u16] {
        match self {
            DatasetKind::Grades => &GRADES_YEARS,
            DatasetKind::Finals => &FINALS_YEARS,
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backing database holding a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Primary,
    Archive,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Primary => f.write_str("primary"),
            Source::Archive => f.write_str("archive"),
        }
    }
}

/// A resolved, queryable dataset: one `{kind}_{year}` table on one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatasetRef {
    pub kind: DatasetKind,
    pub year: u16,
    pub source: Source,
}

impl DatasetRef {
    pub fn collection(&self) -> String {
        format!("{}_{}", self.kind, self.year)
    }

    /// Schema-qualified table name. Only ever built from a resolved ref, so
    /// it is safe to splice into SQL text.
    pub fn table(&self) -> String {
        format!("{SCHEMA}.{}", self.collection())
    }

    pub fn label(&self) -> String {
        self.year.to_string()
    }

    pub fn expect_kind(&self, expected: DatasetKind) -> Result<()> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(DashboardError::KindMismatch {
                expected,
                found: self.kind,
            })
        }
    }
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.collection(), self.source)
    }
}

/// Maps a `(kind, year)` selection onto the source that stores it.
pub fn resolve(kind: DatasetKind, year: u16) -> Result<DatasetRef> {
    if !kind.supported_years().contains(&year) {
        return Err(DashboardError::UnsupportedDataset { kind, year });
    }

    Ok(DatasetRef {
        kind,
        year,
        source: source_for(kind, year),
    })
}

fn source_for(kind: DatasetKind, year: u16) -> Source {
    match kind {
        DatasetKind::Finals if ARCHIVED_FINALS.contains(&year) => Source::Archive,
        _ => Source::Primary,
    }
}

/// Every supported dataset, grades first, in ascending year order.
pub fn all_datasets() -> Vec<DatasetRef> {
    [DatasetKind::Grades, DatasetKind::Finals]
        .into_iter()
        .flat_map(|kind| {
            kind.supported_years().iter().map(move |&year| DatasetRef {
                kind,
                year,
                source: source_for(kind, year),
            })
        })
        .collect()
}
