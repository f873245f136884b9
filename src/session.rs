use serde::{Deserialize, Serialize};

use crate::render::ChartSpec;

/// Which panels of the page are visible.
///
/// The page only ever shows one of three layouts: the upload area on its own,
/// the configuration panel, or the configuration panel together with a
/// rendered chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewState {
    /// Only the upload area is shown
    #[default]
    Upload,

    /// The configuration panel is shown, no chart yet
    Configure,

    /// The configuration panel and the chart display are shown
    Display,
}

impl ViewState {
    pub fn shows_upload(&self) -> bool {
        matches!(self, ViewState::Upload)
    }

    pub fn shows_config(&self) -> bool {
        !self.shows_upload()
    }

    pub fn shows_chart(&self) -> bool {
        matches!(self, ViewState::Display)
    }
}

/// Server-assigned reference to an uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    /// Name the server stored the file under
    pub filename: String,

    /// File type tag inferred by the server (`csv`, `json`, ...)
    pub file_type: String,
}

impl FileReference {
    /// CSV files and ZIP archives carrying one come back with a column summary
    pub fn is_tabular(&self) -> bool {
        ["csv", "zip"]
            .iter()
            .any(|tabular| self.file_type.eq_ignore_ascii_case(tabular))
    }
}

/// Column metadata the server derived from a tabular upload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedSummary {
    /// Every column name, in file order
    pub columns: Vec<String>,

    /// The subset of `columns` holding numbers, in file order
    pub numeric_columns: Vec<String>,

    /// Number of data rows
    pub row_count: usize,
}

/// All state held between user interactions.
///
/// One session belongs to one controller; nothing in here is shared.
#[derive(Debug, Clone, Default)]
pub struct UiSession {
    /// Set by a successful upload, cleared on reset
    pub file: Option<FileReference>,

    /// Present only when the uploaded file was tabular
    pub summary: Option<ParsedSummary>,

    /// The last chart the server returned
    pub chart: Option<ChartSpec>,

    /// Current panel layout
    pub view: ViewState,
}

impl UiSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful upload and moves to the configuration panel.
    pub fn attach_upload(&mut self, file: FileReference, summary: Option<ParsedSummary>) {
        self.file = Some(file);
        self.summary = summary;
        self.view = ViewState::Configure;
    }

    /// Replaces the held chart and shows the display panel.
    pub fn attach_chart(&mut self, chart: ChartSpec) {
        self.chart = Some(chart);
        self.view = ViewState::Display;
    }

    /// Drops everything and returns to the upload-only layout.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.file.is_none()
            && self.summary.is_none()
            && self.chart.is_none()
            && self.view == ViewState::Upload
    }

    /// Column names available to selectors, empty for non-tabular uploads
    pub fn columns(&self) -> &[String] {
        self.summary
            .as_ref()
            .map(|s| s.columns.as_slice())
            .unwrap_or(&[])
    }

    /// Numeric column names available to y-axis selectors
    pub fn numeric_columns(&self) -> &[String] {
        self.summary
            .as_ref()
            .map(|s| s.numeric_columns.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_summary() -> ParsedSummary {
        ParsedSummary {
            columns: vec!["a".into(), "b".into(), "c".into()],
            numeric_columns: vec!["b".into(), "c".into()],
            row_count: 3,
        }
    }

    #[test]
    fn new_session_is_empty_and_on_upload() {
        let session = UiSession::new();
        assert!(session.is_empty());
        assert_eq!(session.view, ViewState::Upload);
        assert!(session.columns().is_empty());
    }

    #[test]
    fn attach_then_clear_restores_initial_state() {
        let mut session = UiSession::new();
        session.attach_upload(
            FileReference {
                filename: "data.csv".into(),
                file_type: "csv".into(),
            },
            Some(sample_summary()),
        );
        assert_eq!(session.view, ViewState::Configure);
        assert_eq!(session.numeric_columns(), ["b", "c"]);

        session.attach_chart(ChartSpec::default());
        assert_eq!(session.view, ViewState::Display);
        assert!(session.view.shows_chart());

        session.clear();
        assert!(session.is_empty());
    }

    #[test]
    fn csv_and_zip_count_as_tabular() {
        let csv = FileReference {
            filename: "x.csv".into(),
            file_type: "CSV".into(),
        };
        let json = FileReference {
            filename: "x.json".into(),
            file_type: "json".into(),
        };
        let zip = FileReference {
            filename: "x.zip".into(),
            file_type: "zip".into(),
        };
        assert!(csv.is_tabular());
        assert!(zip.is_tabular());
        assert!(!json.is_tabular());
    }
}
