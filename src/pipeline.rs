//! Group-and-rank pipelines over a single dataset.
//!
//! A [`Pipeline`] scores each record, groups the records by a key, averages
//! the scores per group and sorts the groups by that average (highest first,
//! groups without any score last). Ties keep the order in which each group
//! first appeared in the dataset. The same pipeline can be rendered to SQL for
//! the Postgres store or evaluated directly over loaded records.

use std::collections::HashMap;

use crate::dataset::{DatasetKind, DatasetRef};
use crate::models::Record;

const COMPOSITE_SCORE_SQL: &str = "(COALESCE(romanian_grade_final, 0) \
     + COALESCE(mandatory_grade_final, 0) \
     + COALESCE(chosen_grade_final, 0)) \
     / NULLIF((romanian_grade_final IS NOT NULL)::int \
     + (mandatory_grade_final IS NOT NULL)::int \
     + (chosen_grade_final IS NOT NULL)::int, 0)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSource {
    /// The pre-computed `avg` of a grades record
    StoredAverage,
    /// Mean of the present subject finals of a finals record
    Composite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    SchoolName,
    Nationality,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub score: ScoreSource,
    pub group_by: GroupKey,
    pub limit: Option<usize>,
}

/// One output group of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub key: Option<String>,
    pub avg_score: Option<f64>,
    pub count: i64,
}

impl ScoreSource {
    fn score(self, record: &Record) -> Option<f64> {
        match (self, record) {
            (ScoreSource::StoredAverage, Record::Grades(r)) => r.avg,
            (ScoreSource::Composite, Record::Finals(r)) => r.composite_score(),
            _ => None,
        }
    }

    fn sql(self) -> &'static str {
        match self {
            ScoreSource::StoredAverage => "avg",
            ScoreSource::Composite => COMPOSITE_SCORE_SQL,
        }
    }
}

impl GroupKey {
    fn key(self, record: &Record) -> Option<&str> {
        match (self, record) {
            (GroupKey::SchoolName, Record::Finals(r)) => r.full_school_name.as_deref(),
            (GroupKey::SchoolName, Record::Grades(r)) => r.school_name.as_deref(),
            (GroupKey::Nationality, record) => record.nationality(),
        }
    }

    fn column(self, dataset: &DatasetRef) -> &'static str {
        match (self, dataset.kind) {
            (GroupKey::SchoolName, DatasetKind::Finals) => "full_school_name",
            (GroupKey::SchoolName, DatasetKind::Grades) => "school_name",
            (GroupKey::Nationality, _) => "nationality",
        }
    }
}

impl Pipeline {
    pub fn evaluate(&self, records: &[Record]) -> Vec<GroupRow> {
        struct Acc {
            key: Option<String>,
            sum: f64,
            scored: usize,
            count: i64,
        }

        let mut index: HashMap<Option<&str>, usize> = HashMap::new();
        let mut groups: Vec<Acc> = Vec::new();

        for record in records {
            let key = self.group_by.key(record);
            let slot = *index.entry(key).or_insert_with(|| {
                groups.push(Acc {
                    key: key.map(str::to_string),
                    sum: 0.0,
                    scored: 0,
                    count: 0,
                });
                groups.len() - 1
            });

            let acc = &mut groups[slot];
            acc.count += 1;
            if let Some(score) = self.score.score(record) {
                acc.sum += score;
                acc.scored += 1;
            }
        }

        let mut rows: Vec<GroupRow> = groups
            .into_iter()
            .map(|acc| GroupRow {
                key: acc.key,
                avg_score: (acc.scored > 0).then(|| acc.sum / acc.scored as f64),
                count: acc.count,
            })
            .collect();

        rows.sort_by(|a, b| descending_nulls_last(a.avg_score, b.avg_score));
        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }
        rows
    }

    /// SQL text for this pipeline over `dataset`. The limit is bound as `$1`
    /// (a NULL limit means no limit in Postgres).
    pub fn to_sql(&self, dataset: &DatasetRef) -> String {
        let key = self.group_by.column(dataset);
        format!(
            "SELECT {key} AS group_key, AVG(score) AS avg_score, COUNT(*) AS member_count \
             FROM (SELECT {key}, {score} AS score, row_no FROM {table}) scored \
             GROUP BY {key} \
             ORDER BY avg_score DESC NULLS LAST, MIN(row_no) \
             LIMIT $1",
            score = self.score.sql(),
            table = dataset.table(),
        )
    }
}

fn descending_nulls_last(a: Option<f64>, b: Option<f64>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::resolve;
    use crate::models::{FinalsRecord, GradesRecord};

    fn finals(school: &str, nationality: &str, grades: [Option<f64>; 3]) -> Record {
        Record::Finals(FinalsRecord {
            full_school_name: Some(school.to_string()),
            nationality: Some(nationality.to_string()),
            romanian_grade_final: grades[0],
            mandatory_grade_final: grades[1],
            chosen_grade_final: grades[2],
            ..FinalsRecord::default()
        })
    }

    fn by_school(limit: Option<usize>) -> Pipeline {
        Pipeline {
            score: ScoreSource::Composite,
            group_by: GroupKey::SchoolName,
            limit,
        }
    }

    #[test]
    fn groups_average_and_count() {
        let records = vec![
            finals("A", "ro", [Some(8.0), Some(8.0), Some(8.0)]),
            finals("B", "ro", [Some(9.0), Some(9.0), Some(9.0)]),
            finals("A", "hu", [Some(6.0), Some(6.0), Some(6.0)]),
        ];
        let rows = by_school(None).evaluate(&records);
        assert_eq!(
            rows,
            vec![
                GroupRow {
                    key: Some("B".to_string()),
                    avg_score: Some(9.0),
                    count: 1
                },
                GroupRow {
                    key: Some("A".to_string()),
                    avg_score: Some(7.0),
                    count: 2
                },
            ]
        );
    }

    #[test]
    fn unscored_records_count_but_do_not_drag_the_mean() {
        let records = vec![
            finals("A", "ro", [Some(9.0), None, None]),
            finals("A", "ro", [None, None, None]),
        ];
        let rows = by_school(None).evaluate(&records);
        assert_eq!(rows[0].avg_score, Some(9.0));
        assert_eq!(rows[0].count, 2);
    }

    #[test]
    fn ties_keep_first_seen_order_and_unscored_groups_sort_last() {
        let records = vec![
            finals("Empty", "ro", [None, None, None]),
            finals("First", "ro", [Some(7.0), None, None]),
            finals("Second", "ro", [Some(7.0), None, None]),
            finals("Top", "ro", [Some(10.0), None, None]),
        ];
        let keys: Vec<_> = by_school(None)
            .evaluate(&records)
            .into_iter()
            .map(|row| row.key.unwrap())
            .collect();
        assert_eq!(keys, vec!["Top", "First", "Second", "Empty"]);
    }

    #[test]
    fn limit_truncates_after_sorting() {
        let records: Vec<Record> = (0..15)
            .map(|i| finals(&format!("S{i}"), "ro", [Some(i as f64), None, None]))
            .collect();
        let rows = by_school(Some(10)).evaluate(&records);
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].key.as_deref(), Some("S14"));
        assert_eq!(rows[9].key.as_deref(), Some("S5"));
    }

    #[test]
    fn stored_average_groups_grades_by_nationality() {
        let grade = |nationality: Option<&str>, avg: f64| {
            Record::Grades(GradesRecord {
                nationality: nationality.map(str::to_string),
                avg: Some(avg),
                ..GradesRecord::default()
            })
        };
        let pipeline = Pipeline {
            score: ScoreSource::StoredAverage,
            group_by: GroupKey::Nationality,
            limit: None,
        };
        let rows = pipeline.evaluate(&[
            grade(Some("ro"), 7.0),
            grade(None, 9.0),
            grade(Some("ro"), 8.0),
        ]);
        assert_eq!(rows[0].key, None);
        assert_eq!(rows[0].avg_score, Some(9.0));
        assert_eq!(rows[1].avg_score, Some(7.5));
        assert_eq!(rows[1].count, 2);
    }

    #[test]
    fn sql_targets_resolved_table() {
        let dataset = resolve(DatasetKind::Finals, 2023).unwrap();
        let sql = by_school(Some(10)).to_sql(&dataset);
        assert!(sql.contains("FROM edu_dashboard.finals_2023"));
        assert!(sql.contains("GROUP BY full_school_name"));
        assert!(sql.contains("DESC NULLS LAST"));
        assert!(sql.contains("NULLIF("));
    }
}
