use serde::{Deserialize, Serialize};

use crate::dataset::DatasetKind;

/// One row of a `grades_{year}` dataset. Field names follow the stored documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradesRecord {
    pub nationality: Option<String>,
    pub avg: Option<f64>,
    #[serde(rename = "schoolName")]
    pub school_name: Option<String>,
    #[serde(rename = "shortSchoolName")]
    pub short_school_name: Option<String>,
}

/// One row of a `finals_{year}` dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalsRecord {
    pub full_school_name: Option<String>,
    pub nationality: Option<String>,
    pub romanian_grade_final: Option<f64>,
    pub mandatory_grade_final: Option<f64>,
    pub chosen_grade_final: Option<f64>,
    pub school: Option<String>,
    pub code: Option<String>,
}

impl FinalsRecord {
    /// Mean of the subject finals that are present. `None` when all three are missing.
    pub fn composite_score(&self) -> Option<f64> {
        let present: Vec<f64> = [
            self.romanian_grade_final,
            self.mandatory_grade_final,
            self.chosen_grade_final,
        ]
        .into_iter()
        .flatten()
        .collect();

        if present.is_empty() {
            None
        } else {
            Some(present.iter().sum::<f64>() / present.len() as f64)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Grades(GradesRecord),
    Finals(FinalsRecord),
}

impl Record {
    pub fn kind(&self) -> DatasetKind {
        match self {
            Record::Grades(_) => DatasetKind::Grades,
            Record::Finals(_) => DatasetKind::Finals,
        }
    }

    pub fn nationality(&self) -> Option<&str> {
        match self {
            Record::Grades(record) => record.nationality.as_deref(),
            Record::Finals(record) => record.nationality.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolAggregate {
    pub school_name: Option<String>,
    pub avg_score: Option<f64>,
    pub student_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub school_name: String,
    pub avg_score_a: Option<f64>,
    pub avg_score_b: Option<f64>,
    pub student_count_a: i64,
    pub student_count_b: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NationalityAggregate {
    pub nationality: Option<String>,
    pub avg_score: Option<f64>,
    pub count: i64,
}
