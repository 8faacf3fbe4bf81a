//! One analyst interaction: an immutable request in, a complete outcome out.

use crate::aggregate::{self, Comparison, NationalityBreakdown};
use crate::chart::ChartSpec;
use crate::dataset::{resolve, DatasetKind, DatasetRef};
use crate::error::Result;
use crate::models::{Record, SchoolAggregate};
use crate::search::build_search_query;
use crate::store::RecordStore;

pub const DEFAULT_COMPARE_YEARS: (u16, u16) = (2023, 2022);

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Browse {
        kind: DatasetKind,
        year: u16,
        search_text: String,
    },
    TopSchools {
        year: u16,
    },
    CompareFinals {
        year_a: u16,
        year_b: u16,
    },
    Nationality {
        kind: DatasetKind,
        year: u16,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Records {
        dataset: DatasetRef,
        records: Vec<Record>,
    },
    TopSchools {
        dataset: DatasetRef,
        schools: Vec<SchoolAggregate>,
    },
    Comparison(Comparison),
    Nationality {
        dataset: DatasetRef,
        breakdown: NationalityBreakdown,
    },
}

impl Outcome {
    pub fn is_empty(&self) -> bool {
        match self {
            Outcome::Records { records, .. } => records.is_empty(),
            Outcome::TopSchools { schools, .. } => schools.is_empty(),
            Outcome::Comparison(comparison) => comparison.rows.is_empty(),
            Outcome::Nationality { breakdown, .. } => breakdown.rows.is_empty(),
        }
    }

    pub fn chart(&self) -> Option<&ChartSpec> {
        match self {
            Outcome::Comparison(comparison) => Some(&comparison.chart),
            Outcome::Nationality { breakdown, .. } => Some(&breakdown.chart),
            _ => None,
        }
    }
}

/// Resolves every dataset the request names before querying anything, so an
/// unsupported selection never yields a partial result.
pub async fn run<S: RecordStore>(store: &S, request: &Request) -> Result<Outcome> {
    match request {
        Request::Browse {
            kind,
            year,
            search_text,
        } => {
            let dataset = resolve(*kind, *year)?;
            let filter = build_search_query(search_text, *kind);
            let records = store.find(&dataset, &filter).await?;
            Ok(Outcome::Records { dataset, records })
        }
        Request::TopSchools { year } => {
            let dataset = resolve(DatasetKind::Finals, *year)?;
            let schools = aggregate::compute_top_schools(store, &dataset).await?;
            Ok(Outcome::TopSchools { dataset, schools })
        }
        Request::CompareFinals { year_a, year_b } => {
            let dataset_a = resolve(DatasetKind::Finals, *year_a)?;
            let dataset_b = resolve(DatasetKind::Finals, *year_b)?;
            let comparison = aggregate::compare_top_schools(store, &dataset_a, &dataset_b).await?;
            Ok(Outcome::Comparison(comparison))
        }
        Request::Nationality { kind, year } => {
            let dataset = resolve(*kind, *year)?;
            let breakdown = aggregate::compute_by_nationality(store, &dataset).await?;
            Ok(Outcome::Nationality { dataset, breakdown })
        }
    }
}
