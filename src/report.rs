use std::fmt::Write;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::dashboard::Outcome;
use crate::dataset::DatasetKind;
use crate::models::Record;

pub const EMPTY_MESSAGE: &str = "No matching data found.";

fn score(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "n/a".to_string())
}

fn text(value: Option<&str>) -> String {
    value.unwrap_or("").replace('|', "\\|")
}

fn number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn markdown_table(output: &mut String, headers: &[&str], rows: &[Vec<String>]) {
    let _ = writeln!(output, "| {} |", headers.join(" | "));
    let _ = writeln!(
        output,
        "|{}",
        headers.iter().map(|_| " --- |").collect::<String>()
    );
    for row in rows {
        let _ = writeln!(output, "| {} |", row.join(" | "));
    }
}

pub fn title(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Records { dataset, .. } => format!("Data from `{}`", dataset.collection()),
        Outcome::TopSchools { dataset, .. } => {
            format!("Top 10 Schools: Finals {}", dataset.label())
        }
        Outcome::Comparison(comparison) => comparison.chart.title.clone(),
        Outcome::Nationality { dataset, .. } => {
            format!("Average Score by Nationality ({})", dataset.collection())
        }
    }
}

/// Markdown rendering of an outcome: a heading and one table.
pub fn render(outcome: &Outcome) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "## {}", title(outcome));
    let _ = writeln!(output);

    if outcome.is_empty() {
        let _ = writeln!(output, "{EMPTY_MESSAGE}");
        return output;
    }

    match outcome {
        Outcome::Records { records, .. } => {
            let (headers, rows) = record_rows(records);
            markdown_table(&mut output, headers, &rows);
        }
        Outcome::TopSchools { schools, .. } => {
            let rows: Vec<Vec<String>> = schools
                .iter()
                .enumerate()
                .map(|(rank, school)| {
                    vec![
                        (rank + 1).to_string(),
                        text(school.school_name.as_deref()),
                        score(school.avg_score),
                        school.student_count.to_string(),
                    ]
                })
                .collect();
            markdown_table(&mut output, &["#", "School", "Average Score", "Students"], &rows);
        }
        Outcome::Comparison(comparison) => {
            let score_a = format!("Average Score {}", comparison.label_a);
            let score_b = format!("Average Score {}", comparison.label_b);
            let students_a = format!("Students {}", comparison.label_a);
            let students_b = format!("Students {}", comparison.label_b);
            let rows: Vec<Vec<String>> = comparison
                .rows
                .iter()
                .map(|row| {
                    vec![
                        text(Some(row.school_name.as_str())),
                        score(row.avg_score_a),
                        row.student_count_a.to_string(),
                        score(row.avg_score_b),
                        row.student_count_b.to_string(),
                    ]
                })
                .collect();
            markdown_table(
                &mut output,
                &[
                    "School",
                    score_a.as_str(),
                    students_a.as_str(),
                    score_b.as_str(),
                    students_b.as_str(),
                ],
                &rows,
            );
        }
        Outcome::Nationality { breakdown, .. } => {
            let rows: Vec<Vec<String>> = breakdown
                .rows
                .iter()
                .map(|row| {
                    vec![
                        text(row.nationality.as_deref()),
                        score(row.avg_score),
                        row.count.to_string(),
                    ]
                })
                .collect();
            markdown_table(&mut output, &["Nationality", "Average Score", "Count"], &rows);
        }
    }

    output
}

fn record_rows(records: &[Record]) -> (&'static [&'static str], Vec<Vec<String>>) {
    const GRADES: &[&str] = &["nationality", "avg", "schoolName", "shortSchoolName"];
    const FINALS: &[&str] = &[
        "full_school_name",
        "nationality",
        "romanian_grade_final",
        "mandatory_grade_final",
        "chosen_grade_final",
        "school",
        "code",
    ];

    let rows = records
        .iter()
        .map(|record| match record {
            Record::Grades(r) => vec![
                text(r.nationality.as_deref()),
                number(r.avg),
                text(r.school_name.as_deref()),
                text(r.short_school_name.as_deref()),
            ],
            Record::Finals(r) => vec![
                text(r.full_school_name.as_deref()),
                text(r.nationality.as_deref()),
                number(r.romanian_grade_final),
                number(r.mandatory_grade_final),
                number(r.chosen_grade_final),
                text(r.school.as_deref()),
                text(r.code.as_deref()),
            ],
        })
        .collect();

    match records.first().map(Record::kind) {
        Some(DatasetKind::Grades) => (GRADES, rows),
        _ => (FINALS, rows),
    }
}

pub fn build_report(outcome: &Outcome, generated_at: DateTime<Utc>) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Education Dashboard Report");
    let _ = writeln!(
        output,
        "Generated {}",
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    output.push_str(&render(outcome));
    output
}

/// Writes the outcome's table as CSV. Records keep their stored field names.
pub fn write_csv(outcome: &Outcome, path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    match outcome {
        Outcome::Records { records, .. } => {
            for record in records {
                match record {
                    Record::Grades(r) => writer.serialize(r)?,
                    Record::Finals(r) => writer.serialize(r)?,
                }
            }
        }
        Outcome::TopSchools { schools, .. } => {
            for school in schools {
                writer.serialize(school)?;
            }
        }
        Outcome::Comparison(comparison) => {
            writer.write_record([
                "school_name".to_string(),
                format!("avg_score_{}", comparison.label_a),
                format!("student_count_{}", comparison.label_a),
                format!("avg_score_{}", comparison.label_b),
                format!("student_count_{}", comparison.label_b),
            ])?;
            for row in &comparison.rows {
                writer.write_record([
                    row.school_name.clone(),
                    number(row.avg_score_a),
                    row.student_count_a.to_string(),
                    number(row.avg_score_b),
                    row.student_count_b.to_string(),
                ])?;
            }
        }
        Outcome::Nationality { breakdown, .. } => {
            for row in &breakdown.rows {
                writer.serialize(row)?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{merge_top_schools, NationalityBreakdown};
    use crate::chart::ChartSpec;
    use crate::dataset::resolve;
    use crate::models::{FinalsRecord, NationalityAggregate, SchoolAggregate};
    use chrono::TimeZone;

    fn school(name: &str, score: f64, count: i64) -> SchoolAggregate {
        SchoolAggregate {
            school_name: Some(name.to_string()),
            avg_score: Some(score),
            student_count: count,
        }
    }

    #[test]
    fn empty_outcome_renders_message() {
        let outcome = Outcome::Records {
            dataset: resolve(DatasetKind::Finals, 2023).unwrap(),
            records: Vec::new(),
        };
        let rendered = render(&outcome);
        assert!(rendered.starts_with("## Data from `finals_2023`"));
        assert!(rendered.contains(EMPTY_MESSAGE));
    }

    #[test]
    fn top_schools_table_is_ranked() {
        let outcome = Outcome::TopSchools {
            dataset: resolve(DatasetKind::Finals, 2022).unwrap(),
            schools: vec![school("Alpha", 9.126, 30), school("Beta", 8.5, 12)],
        };
        let rendered = render(&outcome);
        assert!(rendered.contains("| # | School | Average Score | Students |"));
        assert!(rendered.contains("| 1 | Alpha | 9.13 | 30 |"));
        assert!(rendered.contains("| 2 | Beta | 8.50 | 12 |"));
    }

    #[test]
    fn comparison_headers_name_both_years() {
        let rows = merge_top_schools(&[school("S2", 80.0, 4)], &[school("S2", 70.0, 5)]);
        let outcome = Outcome::Comparison(crate::aggregate::Comparison {
            label_a: "2023".to_string(),
            label_b: "2022".to_string(),
            chart: ChartSpec::bars("Top 10 Schools: Finals 2023 vs 2022", vec![], vec![]),
            rows,
        });
        let rendered = render(&outcome);
        assert!(rendered.starts_with("## Top 10 Schools: Finals 2023 vs 2022"));
        assert!(rendered.contains("Average Score 2023"));
        assert!(rendered.contains("| S2 | 80.00 | 4 | 70.00 | 5 |"));
    }

    #[test]
    fn missing_values_render_as_placeholders() {
        let outcome = Outcome::Nationality {
            dataset: resolve(DatasetKind::Grades, 2024).unwrap(),
            breakdown: NationalityBreakdown {
                rows: vec![NationalityAggregate {
                    nationality: None,
                    avg_score: None,
                    count: 3,
                }],
                chart: ChartSpec::bars("Average Score by Nationality", vec![], vec![]),
            },
        };
        assert!(render(&outcome).contains("|  | n/a | 3 |"));
    }

    #[test]
    fn finals_records_use_document_columns() {
        let outcome = Outcome::Records {
            dataset: resolve(DatasetKind::Finals, 2019).unwrap(),
            records: vec![Record::Finals(FinalsRecord {
                full_school_name: Some("Lycée X".to_string()),
                romanian_grade_final: Some(9.5),
                code: Some("LYC01".to_string()),
                ..FinalsRecord::default()
            })],
        };
        let rendered = render(&outcome);
        assert!(rendered.contains("| full_school_name | nationality |"));
        assert!(rendered.contains("| Lycée X |  | 9.5 |  |  |  | LYC01 |"));
    }

    #[test]
    fn report_carries_timestamp() {
        let outcome = Outcome::TopSchools {
            dataset: resolve(DatasetKind::Finals, 2023).unwrap(),
            schools: Vec::new(),
        };
        let at = Utc.with_ymd_and_hms(2024, 7, 1, 9, 30, 0).unwrap();
        let report = build_report(&outcome, at);
        assert!(report.starts_with(
            "# Education Dashboard Report\nGenerated 2024-07-01 09:30 UTC\n"
        ));
        assert!(report.contains(EMPTY_MESSAGE));
    }
}
