//! Canvas component specifications.
//!
//! Defines structured specs for charts, tables, forms, and diagrams
//! that the renderer converts to HTML/JS for display.

use serde::{Deserialize, Serialize};

/// Chart specification (rendered via Chart.js).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSpec {
    /// Chart type: "line", "bar", "pie", "scatter", "doughnut".
    pub chart_type: String,
    /// Data labels (x-axis or category labels).
    pub labels: Vec<String>,
    /// Dataset(s). Each dataset has a label and numeric data.
    pub datasets: Vec<ChartDataset>,
    /// Optional title for the chart.
    #[serde(default)]
    pub title: Option<String>,
}

/// A single dataset in a chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<f64>,
    #[serde(default)]
    pub color: Option<String>,
}

impl ChartSpec {
    /// Create a simple single-dataset chart.
    pub fn simple(chart_type: &str, labels: Vec<String>, data: Vec<f64>) -> Self {
        Self {
            chart_type: chart_type.into(),
            labels,
            datasets: vec![ChartDataset {
                label: "Data".into(),
                data,
                color: None,
            }],
            title: None,
        }
    }

    /// Validate that chart_type is a known type.
    pub fn is_valid_type(&self) -> bool {
        matches!(
            self.chart_type.as_str(),
            "line" | "bar" | "pie" | "scatter" | "doughnut" | "radar" | "polarArea"
        )
    }
}

/// Table specification (sortable HTML table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSpec {
    /// Column headers.
    pub headers: Vec<String>,
    /// Row data (each row is a vec of cell values).
    pub rows: Vec<Vec<String>>,
    /// Whether columns should be sortable.
    #[serde(default)]
    pub sortable: bool,
}

impl TableSpec {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            headers,
            rows,
            sortable: false,
        }
    }
}

/// Form specification (validated HTML form).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSpec {
    /// Form fields.
    pub fields: Vec<FormField>,
    /// Optional submit button text.
    #[serde(default = "default_submit_text")]
    pub submit_text: String,
    /// Optional form title.
    #[serde(default)]
    pub title: Option<String>,
}

fn default_submit_text() -> String {
    "Submit".into()
}

/// A form field definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    /// Field name (used as form key).
    pub name: String,
    /// Display label.
    pub label: String,
    /// Field type: "text", "number", "email", "select", "textarea", "checkbox".
    pub field_type: String,
    /// Whether the field is required.
    #[serde(default)]
    pub required: bool,
    /// Placeholder text.
    #[serde(default)]
    pub placeholder: Option<String>,
    /// Options for select fields.
    #[serde(default)]
    pub options: Vec<String>,
    /// Default value.
    #[serde(default)]
    pub default_value: Option<String>,
}

/// Diagram specification (rendered via Mermaid).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramSpec {
    /// Mermaid source code for the diagram.
    pub source: String,
    /// Optional title.
    #[serde(default)]
    pub title: Option<String>,
}

impl DiagramSpec {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.into(),
            title: None,
        }
    }
}
