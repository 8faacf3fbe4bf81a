use crate::dataset::DatasetKind;
use crate::models::Record;

/// Text columns that can be searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    SchoolName,
    ShortSchoolName,
    School,
    Code,
}

impl TextField {
    pub fn column(self) -> &'static str {
        match self {
            TextField::SchoolName => "school_name",
            TextField::ShortSchoolName => "short_school_name",
            TextField::School => "school",
            TextField::Code => "code",
        }
    }

    pub fn value(self, record: &Record) -> Option<&str> {
        match (self, record) {
            (TextField::SchoolName, Record::Grades(r)) => r.school_name.as_deref(),
            (TextField::ShortSchoolName, Record::Grades(r)) => r.short_school_name.as_deref(),
            (TextField::School, Record::Finals(r)) => r.school.as_deref(),
            (TextField::Code, Record::Finals(r)) => r.code.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    /// Case-insensitive, unanchored substring match on any of the fields.
    AnyContains {
        fields: Vec<TextField>,
        needle: String,
    },
}

impl Filter {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::All => true,
            Filter::AnyContains { fields, needle } => {
                let needle = needle.to_lowercase();
                fields.iter().any(|field| {
                    field
                        .value(record)
                        .map(|value| value.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                })
            }
        }
    }

    /// SQL `WHERE` clause (empty for [`Filter::All`]) and the pattern to bind as `$1`.
    pub fn to_sql(&self) -> (String, Option<String>) {
        match self {
            Filter::All => (String::new(), None),
            Filter::AnyContains { fields, needle } => {
                let clauses: Vec<String> = fields
                    .iter()
                    .map(|field| format!("{} ILIKE $1 ESCAPE '\\'", field.column()))
                    .collect();
                (
                    format!(" WHERE {}", clauses.join(" OR ")),
                    Some(format!("%{}%", escape_like(needle))),
                )
            }
        }
    }
}

pub fn build_search_query(search_text: &str, kind: DatasetKind) -> Filter {
    if search_text.is_empty() {
        return Filter::All;
    }

    let fields = match kind {
        DatasetKind::Grades => vec![TextField::SchoolName, TextField::ShortSchoolName],
        DatasetKind::Finals => vec![TextField::School, TextField::Code],
    };

    Filter::AnyContains {
        fields,
        needle: search_text.to_string(),
    }
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FinalsRecord, GradesRecord};

    fn finals(school: &str, code: &str) -> Record {
        Record::Finals(FinalsRecord {
            school: Some(school.to_string()),
            code: Some(code.to_string()),
            ..FinalsRecord::default()
        })
    }

    #[test]
    fn empty_text_matches_everything() {
        let filter = build_search_query("", DatasetKind::Grades);
        assert_eq!(filter, Filter::All);
        assert!(filter.matches(&Record::Grades(GradesRecord::default())));
        assert_eq!(filter.to_sql(), (String::new(), None));
    }

    #[test]
    fn finals_search_covers_school_and_code() {
        let filter = build_search_query("lyc", DatasetKind::Finals);
        assert!(filter.matches(&finals("Lycée X", "B01")));
        assert!(filter.matches(&finals("Colegiul Y", "LYC01")));
        assert!(!filter.matches(&finals("Colegiul Y", "CY02")));
    }

    #[test]
    fn grades_search_covers_both_names() {
        let filter = build_search_query("NATIONAL", DatasetKind::Grades);
        let full = Record::Grades(GradesRecord {
            school_name: Some("Colegiul National Iasi".to_string()),
            ..GradesRecord::default()
        });
        let short = Record::Grades(GradesRecord {
            short_school_name: Some("cn national".to_string()),
            ..GradesRecord::default()
        });
        assert!(filter.matches(&full));
        assert!(filter.matches(&short));
        assert!(!filter.matches(&Record::Grades(GradesRecord::default())));
    }

    #[test]
    fn match_is_unanchored() {
        let filter = build_search_query("ee", DatasetKind::Finals);
        assert!(filter.matches(&finals("Lycée Lee", "X")));
    }

    #[test]
    fn sql_escapes_like_wildcards() {
        let filter = build_search_query("50%_a", DatasetKind::Finals);
        let (clause, pattern) = filter.to_sql();
        assert_eq!(
            clause,
            " WHERE school ILIKE $1 ESCAPE '\\' OR code ILIKE $1 ESCAPE '\\'"
        );
        assert_eq!(pattern.as_deref(), Some("%50\\%\\_a%"));
    }
}
