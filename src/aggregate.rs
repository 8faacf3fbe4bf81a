//! School ranking, two-year comparison and nationality breakdowns.

use std::collections::HashMap;

use crate::chart::{ChartSpec, Series};
use crate::dataset::{DatasetKind, DatasetRef};
use crate::error::Result;
use crate::models::{ComparisonRow, NationalityAggregate, SchoolAggregate};
use crate::pipeline::{GroupKey, Pipeline, ScoreSource};
use crate::store::RecordStore;

pub const TOP_SCHOOLS_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub label_a: String,
    pub label_b: String,
    pub rows: Vec<ComparisonRow>,
    pub chart: ChartSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NationalityBreakdown {
    pub rows: Vec<NationalityAggregate>,
    pub chart: ChartSpec,
}

pub fn top_schools_pipeline() -> Pipeline {
    Pipeline {
        score: ScoreSource::Composite,
        group_by: GroupKey::SchoolName,
        limit: Some(TOP_SCHOOLS_LIMIT),
    }
}

pub fn nationality_pipeline(kind: DatasetKind) -> Pipeline {
    Pipeline {
        score: match kind {
            DatasetKind::Grades => ScoreSource::StoredAverage,
            DatasetKind::Finals => ScoreSource::Composite,
        },
        group_by: GroupKey::Nationality,
        limit: None,
    }
}

/// The ten schools of a finals dataset with the highest mean composite score.
pub async fn compute_top_schools<S: RecordStore>(
    store: &S,
    dataset: &DatasetRef,
) -> Result<Vec<SchoolAggregate>> {
    dataset.expect_kind(DatasetKind::Finals)?;

    let groups = store.aggregate(dataset, &top_schools_pipeline()).await?;
    Ok(groups
        .into_iter()
        .map(|group| SchoolAggregate {
            school_name: group.key,
            avg_score: group.avg_score,
            student_count: group.count,
        })
        .collect())
}

/// Top-ten lists of two finals datasets, joined on school name.
///
/// The two rankings are computed concurrently. Only schools ranked in both
/// lists survive the join.
pub async fn compare_top_schools<S: RecordStore>(
    store: &S,
    dataset_a: &DatasetRef,
    dataset_b: &DatasetRef,
) -> Result<Comparison> {
    let (top_a, top_b) = tokio::try_join!(
        compute_top_schools(store, dataset_a),
        compute_top_schools(store, dataset_b),
    )?;

    let rows = merge_top_schools(&top_a, &top_b);
    let (label_a, label_b) = (dataset_a.label(), dataset_b.label());
    let chart = ChartSpec::bars(
        format!("Top 10 Schools: Finals {label_a} vs {label_b}"),
        rows.iter().map(|row| row.school_name.clone()).collect(),
        vec![
            Series {
                label: label_a.clone(),
                values: rows.iter().map(|row| row.avg_score_a).collect(),
            },
            Series {
                label: label_b.clone(),
                values: rows.iter().map(|row| row.avg_score_b).collect(),
            },
        ],
    );

    Ok(Comparison {
        label_a,
        label_b,
        rows,
        chart,
    })
}

/// Inner join on school name, ordered by the first list's score.
/// Unnamed groups never join.
pub fn merge_top_schools(
    top_a: &[SchoolAggregate],
    top_b: &[SchoolAggregate],
) -> Vec<ComparisonRow> {
    let by_name: HashMap<&str, &SchoolAggregate> = top_b
        .iter()
        .filter_map(|school| school.school_name.as_deref().map(|name| (name, school)))
        .collect();

    let mut rows: Vec<ComparisonRow> = top_a
        .iter()
        .filter_map(|a| {
            let name = a.school_name.as_deref()?;
            let b = by_name.get(name)?;
            Some(ComparisonRow {
                school_name: name.to_string(),
                avg_score_a: a.avg_score,
                avg_score_b: b.avg_score,
                student_count_a: a.student_count,
                student_count_b: b.student_count,
            })
        })
        .collect();

    rows.sort_by(|x, y| match (x.avg_score_a, y.avg_score_a) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Equal),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    rows
}

/// Mean score per nationality over a whole dataset, highest first.
pub async fn compute_by_nationality<S: RecordStore>(
    store: &S,
    dataset: &DatasetRef,
) -> Result<NationalityBreakdown> {
    let groups = store
        .aggregate(dataset, &nationality_pipeline(dataset.kind))
        .await?;

    let rows: Vec<NationalityAggregate> = groups
        .into_iter()
        .map(|group| NationalityAggregate {
            nationality: group.key,
            avg_score: group.avg_score,
            count: group.count,
        })
        .collect();

    let chart = ChartSpec::bars(
        "Average Score by Nationality",
        rows.iter()
            .map(|row| row.nationality.clone().unwrap_or_else(|| "unknown".to_string()))
            .collect(),
        vec![Series {
            label: dataset.label(),
            values: rows.iter().map(|row| row.avg_score).collect(),
        }],
    );

    Ok(NationalityBreakdown { rows, chart })
}
