use serde::Serialize;

pub const SCORE_AXIS_LABEL: &str = "Average Score";

/// Bar chart description handed to whatever draws it. Each series holds one
/// value per category, in category order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub categories: Vec<String>,
    pub y_label: String,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub values: Vec<Option<f64>>,
}

impl ChartSpec {
    pub fn bars(title: impl Into<String>, categories: Vec<String>, series: Vec<Series>) -> Self {
        Self {
            title: title.into(),
            categories,
            y_label: SCORE_AXIS_LABEL.to_string(),
            series,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
