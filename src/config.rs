//! Graph configuration: the chart-type tag, the raw form state and the
//! per-type configuration record assembled from it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Chart types the render endpoint understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphType {
    /// Marker-only traces against a shared x column
    #[serde(rename = "scatter")]
    Scatter,

    /// Lines with markers against a shared x column
    #[serde(rename = "line", alias = "single_line")]
    Line,

    /// Two groups of line traces on a left and a right y axis
    #[serde(rename = "dual_line")]
    DualLine,

    /// Points placed by latitude/longitude on a map
    #[serde(rename = "scatter_on_map")]
    ScatterOnMap,
}

impl GraphType {
    pub const ALL: [GraphType; 4] = [
        GraphType::Scatter,
        GraphType::Line,
        GraphType::DualLine,
        GraphType::ScatterOnMap,
    ];

    /// Wire tag sent as `graph_type`
    pub fn tag(&self) -> &'static str {
        match self {
            GraphType::Scatter => "scatter",
            GraphType::Line => "line",
            GraphType::DualLine => "dual_line",
            GraphType::ScatterOnMap => "scatter_on_map",
        }
    }

    /// Human readable name for selectors
    pub fn label(&self) -> &'static str {
        match self {
            GraphType::Scatter => "Scatter Plot",
            GraphType::Line => "Single Line Chart",
            GraphType::DualLine => "Dual Axis Line Chart",
            GraphType::ScatterOnMap => "Scatter on Map",
        }
    }

    /// Parses a wire tag. `single_line` is accepted as an alias of `line`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "scatter" => Some(GraphType::Scatter),
            "line" | "single_line" => Some(GraphType::Line),
            "dual_line" => Some(GraphType::DualLine),
            "scatter_on_map" => Some(GraphType::ScatterOnMap),
            _ => None,
        }
    }

    pub fn is_map(&self) -> bool {
        matches!(self, GraphType::ScatterOnMap)
    }

    pub fn is_dual_axis(&self) -> bool {
        matches!(self, GraphType::DualLine)
    }
}

impl fmt::Display for GraphType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for GraphType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GraphType::from_tag(s).ok_or_else(|| format!("unknown graph type: {}", s))
    }
}

/// Base map styles offered for the geographic scatter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MapStyle {
    OpenStreetMap,
    CartoPositron,
    CartoDarkmatter,
    WhiteBg,
    #[default]
    Satellite,
    SatelliteStreets,
}

impl MapStyle {
    pub const ALL: [MapStyle; 6] = [
        MapStyle::OpenStreetMap,
        MapStyle::CartoPositron,
        MapStyle::CartoDarkmatter,
        MapStyle::WhiteBg,
        MapStyle::Satellite,
        MapStyle::SatelliteStreets,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MapStyle::OpenStreetMap => "open-street-map",
            MapStyle::CartoPositron => "carto-positron",
            MapStyle::CartoDarkmatter => "carto-darkmatter",
            MapStyle::WhiteBg => "white-bg",
            MapStyle::Satellite => "satellite",
            MapStyle::SatelliteStreets => "satellite-streets",
        }
    }
}

impl FromStr for MapStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MapStyle::ALL
            .into_iter()
            .find(|style| style.as_str() == s.trim())
            .ok_or_else(|| format!("unknown map style: {}", s))
    }
}

fn default_light_mode() -> bool {
    true
}

/// Configuration shared by the scatter and line charts
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardConfig {
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub x_column: Option<String>,
    pub y_columns: Vec<String>,
    pub x_min: Option<f64>,
    pub x_max: Option<f64>,
    pub y_min: Option<f64>,
    pub y_max: Option<f64>,
    #[serde(default = "default_light_mode")]
    pub light_mode: bool,
}

/// Standard configuration plus the second y-axis field set
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DualAxisConfig {
    #[serde(flatten)]
    pub base: StandardConfig,
    pub y1_columns: Vec<String>,
    pub y2_columns: Vec<String>,
    pub y1_title: String,
    pub y2_title: String,
    pub y1_min: Option<f64>,
    pub y1_max: Option<f64>,
    pub y2_min: Option<f64>,
    pub y2_max: Option<f64>,
}

/// Configuration of the geographic scatter
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub title: String,
    pub map_type: MapStyle,
    pub latitude_column: Option<String>,
    pub longitude_column: Option<String>,
    pub hover_columns: Vec<String>,
    pub color_column: Option<String>,
    pub size_column: Option<String>,
    #[serde(default = "default_light_mode")]
    pub light_mode: bool,
}

/// A configuration record, one variant per chart type.
///
/// Serialises to the flat object the render endpoint expects; the chart type
/// itself travels next to it as `graph_type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GraphConfig {
    Scatter(StandardConfig),
    Line(StandardConfig),
    DualLine(DualAxisConfig),
    ScatterOnMap(MapConfig),
}

/// First failing presence check, with the message shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select a graph type")]
    MissingGraphType,
    #[error("Please upload a file first")]
    NoFileUploaded,
    #[error("Please select a latitude column")]
    MissingLatitude,
    #[error("Please select a longitude column")]
    MissingLongitude,
    #[error("Please select an X-axis column")]
    MissingXColumn,
    #[error("Please select at least one Y-axis column")]
    MissingYColumns,
    #[error("Please select at least one Y2-axis column for dual axis chart")]
    MissingY2Columns,
}

fn is_selected(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

impl GraphConfig {
    pub fn graph_type(&self) -> GraphType {
        match self {
            GraphConfig::Scatter(_) => GraphType::Scatter,
            GraphConfig::Line(_) => GraphType::Line,
            GraphConfig::DualLine(_) => GraphType::DualLine,
            GraphConfig::ScatterOnMap(_) => GraphType::ScatterOnMap,
        }
    }

    /// Reads a configuration object received over the wire.
    ///
    /// # Arguments
    /// * `graph_type` - The tag that came with the object, it picks the schema
    /// * `value` - The flat configuration object
    ///
    /// # Returns
    /// * `Result<GraphConfig, serde_json::Error>` - The typed record or a decoding error
    pub fn from_value(
        graph_type: GraphType,
        value: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        // A missing config object means every option takes its default.
        let value = match value {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other,
        };
        Ok(match graph_type {
            GraphType::Scatter => GraphConfig::Scatter(serde_json::from_value(value)?),
            GraphType::Line => GraphConfig::Line(serde_json::from_value(value)?),
            GraphType::DualLine => GraphConfig::DualLine(serde_json::from_value(value)?),
            GraphType::ScatterOnMap => GraphConfig::ScatterOnMap(serde_json::from_value(value)?),
        })
    }

    /// Runs the presence checks in order and stops at the first failure.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            GraphConfig::ScatterOnMap(map) => {
                if !is_selected(&map.latitude_column) {
                    return Err(ValidationError::MissingLatitude);
                }
                if !is_selected(&map.longitude_column) {
                    return Err(ValidationError::MissingLongitude);
                }
                Ok(())
            }
            GraphConfig::Scatter(base) | GraphConfig::Line(base) => validate_standard(base),
            GraphConfig::DualLine(dual) => {
                validate_standard(&dual.base)?;
                if dual.y2_columns.is_empty() {
                    return Err(ValidationError::MissingY2Columns);
                }
                Ok(())
            }
        }
    }
}

fn validate_standard(base: &StandardConfig) -> Result<(), ValidationError> {
    if !is_selected(&base.x_column) {
        return Err(ValidationError::MissingXColumn);
    }
    if base.y_columns.is_empty() {
        return Err(ValidationError::MissingYColumns);
    }
    Ok(())
}

/// Current values of every configuration control.
///
/// Axis bounds are kept as the raw text typed into their inputs and only
/// turned into numbers when a configuration is assembled.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormState {
    pub graph_type: Option<GraphType>,

    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub y2_title: String,
    pub x_column: Option<String>,
    pub y_columns: Vec<String>,
    pub y2_columns: Vec<String>,
    pub x_min: String,
    pub x_max: String,
    pub y_min: String,
    pub y_max: String,
    pub y2_min: String,
    pub y2_max: String,
    pub light_mode: bool,

    pub map_title: String,
    pub map_type: MapStyle,
    pub latitude_column: Option<String>,
    pub longitude_column: Option<String>,
    pub hover_columns: Vec<String>,
    pub color_column: Option<String>,
    pub size_column: Option<String>,
}

/// Reads a bound input; empty or unparsable text means "no bound".
pub fn parse_bound(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl FormState {
    /// Controls as first shown: light mode on, everything else empty.
    ///
    /// A reset goes back to [`FormState::default`], which leaves light mode off.
    pub fn initial() -> Self {
        FormState {
            light_mode: true,
            ..FormState::default()
        }
    }

    /// Drops every column picked from the previous upload.
    ///
    /// Titles, bounds, the chart type and the theme stay as typed.
    pub fn clear_column_selections(&mut self) {
        self.x_column = None;
        self.y_columns.clear();
        self.y2_columns.clear();
        self.latitude_column = None;
        self.longitude_column = None;
        self.hover_columns.clear();
        self.color_column = None;
        self.size_column = None;
    }

    /// Assembles the configuration for the selected chart type.
    ///
    /// # Returns
    /// * `Result<GraphConfig, ValidationError>` - The configuration, or
    ///   `MissingGraphType` when no chart type is selected
    pub fn assemble(&self) -> Result<GraphConfig, ValidationError> {
        self.graph_type
            .map(|graph_type| self.assemble_as(graph_type))
            .ok_or(ValidationError::MissingGraphType)
    }

    /// Assembles and validates in one step.
    pub fn build(&self) -> Result<GraphConfig, ValidationError> {
        let config = self.assemble()?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the controls relevant to `graph_type` into a configuration.
    pub fn assemble_as(&self, graph_type: GraphType) -> GraphConfig {
        match graph_type {
            GraphType::ScatterOnMap => GraphConfig::ScatterOnMap(MapConfig {
                title: self.map_title.clone(),
                map_type: self.map_type,
                latitude_column: self.latitude_column.clone(),
                longitude_column: self.longitude_column.clone(),
                hover_columns: self.hover_columns.clone(),
                color_column: self.color_column.clone(),
                size_column: self.size_column.clone(),
                light_mode: self.light_mode,
            }),
            GraphType::Scatter => GraphConfig::Scatter(self.standard()),
            GraphType::Line => GraphConfig::Line(self.standard()),
            GraphType::DualLine => {
                let base = self.standard();
                GraphConfig::DualLine(DualAxisConfig {
                    y1_columns: base.y_columns.clone(),
                    y2_columns: self.y2_columns.clone(),
                    y1_title: base.y_title.clone(),
                    y2_title: self.y2_title.clone(),
                    y1_min: base.y_min,
                    y1_max: base.y_max,
                    y2_min: parse_bound(&self.y2_min),
                    y2_max: parse_bound(&self.y2_max),
                    base,
                })
            }
        }
    }

    fn standard(&self) -> StandardConfig {
        StandardConfig {
            title: self.title.clone(),
            x_title: self.x_title.clone(),
            y_title: self.y_title.clone(),
            x_column: self.x_column.clone(),
            y_columns: self.y_columns.clone(),
            x_min: parse_bound(&self.x_min),
            x_max: parse_bound(&self.x_max),
            y_min: parse_bound(&self.y_min),
            y_max: parse_bound(&self.y_max),
            light_mode: self.light_mode,
        }
    }
}
