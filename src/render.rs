//! Render endpoint payloads and the chart specification handed to the
//! plotting library.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{GraphConfig, GraphType};

/// Body posted to the render endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderRequest {
    pub filename: Option<String>,
    pub graph_type: GraphType,
    pub config: GraphConfig,
}

impl RenderRequest {
    pub fn new(filename: impl Into<String>, config: GraphConfig) -> Self {
        RenderRequest {
            filename: Some(filename.into()),
            graph_type: config.graph_type(),
            config,
        }
    }
}

/// JSON body returned by the render endpoint
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Chart specification serialised as a JSON string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RenderResponse {
    pub fn with_graph(graph: String) -> Self {
        RenderResponse {
            success: true,
            graph: Some(graph),
            ..RenderResponse::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        RenderResponse {
            success: false,
            error: Some(error.into()),
            ..RenderResponse::default()
        }
    }
}

/// A title given either as bare text or as `{"text": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Title {
    Text(String),
    Object {
        #[serde(default)]
        text: Option<String>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl Title {
    pub fn text(&self) -> Option<&str> {
        match self {
            Title::Text(text) => Some(text),
            Title::Object { text, .. } => text.as_deref(),
        }
    }
}

impl From<&str> for Title {
    fn from(text: &str) -> Self {
        Title::Object {
            text: Some(text.to_string()),
            extra: Map::new(),
        }
    }
}

/// One axis of the layout
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    /// `[min, max]`; either end may be open
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<[Option<f64>; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlaying: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Axis {
    pub fn title_text(&self) -> Option<&str> {
        self.title.as_ref().and_then(Title::text)
    }
}

/// Chart layout; keys this crate does not model are carried in `extra`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis2: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapbox: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Layout {
    pub fn title_text(&self) -> Option<&str> {
        self.title.as_ref().and_then(Title::text)
    }

    /// Paper background colour from the embedded template, if any
    pub fn background(&self) -> Option<&str> {
        self.template
            .as_ref()?
            .pointer("/layout/paper_bgcolor")?
            .as_str()
    }
}

/// One data series
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Trace {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub x: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub y: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lat: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lon: Vec<Value>,
    /// `y` or `y2`; absent means the first y axis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Trace {
    pub fn is_map(&self) -> bool {
        self.kind
            .as_deref()
            .is_some_and(|kind| kind.starts_with("scattermap"))
    }

    pub fn on_second_axis(&self) -> bool {
        self.yaxis.as_deref() == Some("y2")
    }

    pub fn draws_lines(&self) -> bool {
        self.mode.as_deref().is_some_and(|mode| mode.contains("lines"))
    }
}

/// A chart specification as produced by the render endpoint: traces plus
/// layout, ready for the plotting library.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSpec {
    pub data: Vec<Trace>,
    pub layout: Layout,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChartSpec {
    /// Parses the serialised specification carried in a render response.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn is_map(&self) -> bool {
        self.data.iter().any(Trace::is_map)
    }
}

/// Image export settings for the download action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadOptions {
    pub format: &'static str,
    pub filename: String,
    pub width: u32,
    pub height: u32,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        DownloadOptions {
            format: "png",
            filename: "csv_graph".to_string(),
            width: 800,
            height: 600,
        }
    }
}

impl DownloadOptions {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.filename, self.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormState;
    use serde_json::json;

    #[test]
    fn line_request_matches_wire_shape() {
        let form = FormState {
            graph_type: Some(GraphType::Line),
            x_column: Some("a".into()),
            y_columns: vec!["b".into()],
            ..FormState::default()
        };
        let request = RenderRequest::new("data.csv", form.build().unwrap());
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["filename"], json!("data.csv"));
        assert_eq!(body["graph_type"], json!("line"));
        assert_eq!(body["config"]["x_column"], json!("a"));
        assert_eq!(body["config"]["y_columns"], json!(["b"]));
    }

    #[test]
    fn chart_spec_keeps_unmodelled_keys() {
        let text = json!({
            "data": [{
                "type": "scatter",
                "mode": "lines+markers",
                "x": [1, 2],
                "y": [3, 4],
                "line": {"width": 3}
            }],
            "layout": {
                "title": {"text": "Sales"},
                "xaxis": {"title": {"text": "day"}, "range": [0, null]},
                "showlegend": true
            }
        })
        .to_string();

        let spec = ChartSpec::from_json(&text).unwrap();
        assert_eq!(spec.data.len(), 1);
        assert!(spec.data[0].draws_lines());
        assert_eq!(spec.data[0].extra["line"], json!({"width": 3}));
        assert_eq!(spec.layout.title_text(), Some("Sales"));
        let xaxis = spec.layout.xaxis.as_ref().unwrap();
        assert_eq!(xaxis.title_text(), Some("day"));
        assert_eq!(xaxis.range, Some([Some(0.0), None]));
        assert_eq!(spec.layout.extra["showlegend"], json!(true));

        let again: Value = serde_json::from_str(&spec.to_json().unwrap()).unwrap();
        assert_eq!(again["data"][0]["line"]["width"], json!(3));
    }

    #[test]
    fn plain_string_titles_are_accepted() {
        let spec: ChartSpec =
            serde_json::from_value(json!({"data": [], "layout": {"title": "Plain"}})).unwrap();
        assert_eq!(spec.layout.title_text(), Some("Plain"));
    }

    #[test]
    fn render_response_tolerates_missing_fields() {
        let response: RenderResponse =
            serde_json::from_value(json!({"error": "Invalid graph type"})).unwrap();
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Invalid graph type"));
    }

    #[test]
    fn download_defaults() {
        let options = DownloadOptions::default();
        assert_eq!(options.file_name(), "csv_graph.png");
        assert_eq!((options.width, options.height), (800, 600));
    }
}
