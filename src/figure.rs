//! Chart-specification construction for the server side of the render
//! endpoint.

use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::config::{DualAxisConfig, GraphConfig, MapConfig, StandardConfig};
use crate::render::{Axis, ChartSpec, Layout, Title, Trace};
use crate::table::{DataTable, TableError};

/// Marker symbols cycled through on the dual axis chart
const MARKER_SYMBOLS: [&str; 11] = [
    "circle",
    "x",
    "square",
    "diamond",
    "triangle-up",
    "pentagon",
    "hexagon",
    "star",
    "triangle-down",
    "triangle-left",
    "triangle-right",
];

#[derive(Debug, Error)]
pub enum FigureError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error("{0}")]
    Invalid(String),
}

/// Builds the chart specification for `config` over `table`.
///
/// # Arguments
/// * `table` - The uploaded data
/// * `config` - Typed configuration; its variant picks the chart
///
/// # Returns
/// * `Result<ChartSpec, FigureError>` - The specification, or why it could not be built
///
/// # Examples
/// ```
/// use graphing_tool::config::{GraphConfig, StandardConfig};
/// use graphing_tool::figure::build_figure;
/// use graphing_tool::table::DataTable;
///
/// let table = DataTable::read_delimited("t,v\n0,1\n1,4\n".as_bytes(), b',').unwrap();
/// let config = GraphConfig::Line(StandardConfig {
///     x_column: Some("t".into()),
///     y_columns: vec!["v".into()],
///     ..StandardConfig::default()
/// });
/// let chart = build_figure(&table, &config).unwrap();
/// assert_eq!(chart.data.len(), 1);
/// ```
pub fn build_figure(table: &DataTable, config: &GraphConfig) -> Result<ChartSpec, FigureError> {
    match config {
        GraphConfig::Scatter(standard) => scatter_plot(table, standard),
        GraphConfig::Line(standard) => line_chart(table, standard),
        GraphConfig::DualLine(dual) => dual_line_chart(table, dual),
        GraphConfig::ScatterOnMap(map) => scatter_on_map(table, map),
    }
}

fn or_default(text: &str, fallback: &str) -> String {
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text.to_string()
    }
}

fn selected(column: &Option<String>) -> Option<&str> {
    column.as_deref().filter(|c| !c.is_empty())
}

/// Minimal white or dark template carried inside the layout
fn template(light_mode: bool) -> Value {
    if light_mode {
        json!({"layout": {
            "paper_bgcolor": "white",
            "plot_bgcolor": "white",
            "font": {"color": "#2a3f5f"}
        }})
    } else {
        json!({"layout": {
            "paper_bgcolor": "rgb(17,17,17)",
            "plot_bgcolor": "rgb(17,17,17)",
            "font": {"color": "#f2f5fa"}
        }})
    }
}

fn axis(title: &str, min: Option<f64>, max: Option<f64>) -> Axis {
    Axis {
        title: Some(Title::from(title)),
        range: min.map(|min| [Some(min), max]),
        ..Axis::default()
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn x_values(table: &DataTable, config: &StandardConfig) -> Result<(String, Vec<Value>), FigureError> {
    let x_column = selected(&config.x_column)
        .ok_or_else(|| FigureError::Invalid("no x column selected".to_string()))?;
    Ok((x_column.to_string(), table.column(x_column)?.to_json()))
}

/// Cartesian traces, one per y column
fn series(
    table: &DataTable,
    x: &[Value],
    y_columns: &[String],
    mode: &str,
    style: impl Fn(usize) -> Value,
) -> Result<Vec<Trace>, FigureError> {
    y_columns
        .iter()
        .enumerate()
        .map(|(i, name)| -> Result<Trace, FigureError> {
            Ok(Trace {
                kind: Some("scatter".to_string()),
                name: Some(name.clone()),
                mode: Some(mode.to_string()),
                x: x.to_vec(),
                y: table.column(name)?.to_json(),
                extra: object(style(i)),
                ..Trace::default()
            })
        })
        .collect()
}

fn standard_layout(config: &StandardConfig, x_column: &str, default_title: &str) -> Layout {
    Layout {
        title: Some(Title::from(or_default(&config.title, default_title).as_str())),
        xaxis: Some(axis(
            &or_default(&config.x_title, x_column),
            config.x_min,
            config.x_max,
        )),
        yaxis: Some(axis(
            &or_default(&config.y_title, "Values"),
            config.y_min,
            config.y_max,
        )),
        template: Some(template(config.light_mode)),
        ..Layout::default()
    }
}

fn scatter_plot(table: &DataTable, config: &StandardConfig) -> Result<ChartSpec, FigureError> {
    let (x_column, x) = x_values(table, config)?;
    let data = series(table, &x, &config.y_columns, "markers", |_| {
        json!({"marker": {"size": 8, "opacity": 0.7}})
    })?;

    Ok(ChartSpec {
        data,
        layout: standard_layout(config, &x_column, "Scatter Plot"),
        ..ChartSpec::default()
    })
}

fn line_chart(table: &DataTable, config: &StandardConfig) -> Result<ChartSpec, FigureError> {
    let (x_column, x) = x_values(table, config)?;
    let data = series(table, &x, &config.y_columns, "lines+markers", |_| {
        json!({"line": {"width": 3}, "marker": {"size": 6}})
    })?;

    Ok(ChartSpec {
        data,
        layout: standard_layout(config, &x_column, "Line Chart"),
        ..ChartSpec::default()
    })
}

fn dual_line_chart(table: &DataTable, config: &DualAxisConfig) -> Result<ChartSpec, FigureError> {
    let base = &config.base;
    let (x_column, x) = x_values(table, base)?;

    // Older clients only send y_columns for the left axis.
    let y1_columns = if config.y1_columns.is_empty() {
        &base.y_columns
    } else {
        &config.y1_columns
    };
    let styled = |color: &'static str| {
        move |i: usize| {
            json!({
                "line": {"width": 3},
                "marker": {
                    "size": 8,
                    "symbol": MARKER_SYMBOLS[i % MARKER_SYMBOLS.len()],
                    "color": color
                }
            })
        }
    };

    let mut data = series(table, &x, y1_columns, "lines+markers", styled("blue"))?;
    for trace in data.iter_mut() {
        trace.yaxis = Some("y".to_string());
    }
    let mut right = series(table, &x, &config.y2_columns, "lines+markers", styled("red"))?;
    for trace in right.iter_mut() {
        trace.yaxis = Some("y2".to_string());
    }
    data.extend(right);

    let y1_title = if config.y1_title.trim().is_empty() {
        or_default(&base.y_title, "Left Y-Axis")
    } else {
        config.y1_title.clone()
    };
    let (y1_min, y1_max) = if config.y1_min.is_some() {
        (config.y1_min, config.y1_max)
    } else {
        (base.y_min, base.y_max)
    };

    let mut yaxis = axis(&y1_title, y1_min, y1_max);
    yaxis.side = Some("left".to_string());
    yaxis.color = Some("blue".to_string());

    let mut yaxis2 = axis(
        &or_default(&config.y2_title, "Right Y-Axis"),
        config.y2_min,
        config.y2_max,
    );
    yaxis2.side = Some("right".to_string());
    yaxis2.overlaying = Some("y".to_string());
    yaxis2.color = Some("red".to_string());

    Ok(ChartSpec {
        data,
        layout: Layout {
            title: Some(Title::from(
                or_default(&base.title, "Dual Axis Line Chart").as_str(),
            )),
            xaxis: Some(axis(
                &or_default(&base.x_title, &x_column),
                base.x_min,
                base.x_max,
            )),
            yaxis: Some(yaxis),
            yaxis2: Some(yaxis2),
            template: Some(template(base.light_mode)),
            ..Layout::default()
        },
        ..ChartSpec::default()
    })
}

fn numeric_mean(table: &DataTable, name: &str) -> Result<f64, FigureError> {
    table
        .column(name)?
        .mean()
        .ok_or_else(|| FigureError::Invalid(format!("Column '{}' has no numeric values", name)))
}

fn scatter_on_map(table: &DataTable, config: &MapConfig) -> Result<ChartSpec, FigureError> {
    let lat_column = selected(&config.latitude_column)
        .ok_or_else(|| FigureError::Invalid("no latitude column selected".to_string()))?;
    let lon_column = selected(&config.longitude_column)
        .ok_or_else(|| FigureError::Invalid("no longitude column selected".to_string()))?;

    let lat = table.column(lat_column)?;
    let lon = table.column(lon_column)?;
    let center = json!({
        "lat": numeric_mean(table, lat_column)?,
        "lon": numeric_mean(table, lon_column)?
    });

    let hover: Vec<_> = config
        .hover_columns
        .iter()
        .filter_map(|name| table.column(name).ok())
        .collect();

    let mut marker = json!({"size": 8, "opacity": 0.7});
    if let Some(color) = selected(&config.color_column).and_then(|c| table.column(c).ok()) {
        marker["color"] = Value::Array(color.to_json());
        marker["colorscale"] = json!("Viridis");
        marker["showscale"] = json!(true);
        marker["colorbar"] = json!({"title": {"text": color.name}});
    }
    if let Some(size) = selected(&config.size_column).and_then(|c| table.column(c).ok()) {
        marker["size"] = Value::Array(size.to_json());
    }

    let mut extra = Map::new();
    extra.insert("marker".to_string(), marker);
    if !hover.is_empty() {
        let text: Vec<Value> = (0..table.row_count())
            .map(|row| {
                let parts: Vec<String> = hover
                    .iter()
                    .map(|column| {
                        let value = column
                            .values
                            .get(row)
                            .map(|v| v.display())
                            .unwrap_or_default();
                        format!("{}: {}", column.name, value)
                    })
                    .collect();
                Value::String(parts.join("<br>"))
            })
            .collect();
        extra.insert("text".to_string(), Value::Array(text));
        extra.insert(
            "hovertemplate".to_string(),
            json!("%{text}<extra></extra>"),
        );
    }

    let trace = Trace {
        kind: Some("scattermapbox".to_string()),
        name: Some("Data Points".to_string()),
        mode: Some("markers".to_string()),
        lat: lat.to_json(),
        lon: lon.to_json(),
        extra,
        ..Trace::default()
    };

    let mut layout_extra = Map::new();
    layout_extra.insert("margin".to_string(), json!({"l": 0, "r": 0, "t": 50, "b": 0}));

    Ok(ChartSpec {
        data: vec![trace],
        layout: Layout {
            title: Some(Title::from(
                or_default(&config.title, "Scatter Plot on Map").as_str(),
            )),
            mapbox: Some(json!({
                "style": config.map_type.as_str(),
                "center": center,
                "zoom": 3
            })),
            height: Some(600),
            extra: layout_extra,
            ..Layout::default()
        },
        ..ChartSpec::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapStyle;

    fn table() -> DataTable {
        DataTable::read_delimited(
            "t,a,b,lat,lon,name\n0,1,10,50.0,4.0,x\n1,2,20,52.0,6.0,y\n".as_bytes(),
            b',',
        )
        .unwrap()
    }

    fn standard() -> StandardConfig {
        StandardConfig {
            x_column: Some("t".into()),
            y_columns: vec!["a".into(), "b".into()],
            light_mode: true,
            ..StandardConfig::default()
        }
    }

    #[test]
    fn scatter_uses_marker_only_traces_and_defaults() {
        let chart = build_figure(&table(), &GraphConfig::Scatter(standard())).unwrap();
        assert_eq!(chart.data.len(), 2);
        assert_eq!(chart.data[0].mode.as_deref(), Some("markers"));
        assert_eq!(chart.data[1].name.as_deref(), Some("b"));
        assert_eq!(chart.data[0].y, vec![json!(1.0), json!(2.0)]);
        assert_eq!(chart.layout.title_text(), Some("Scatter Plot"));
        assert_eq!(
            chart.layout.xaxis.as_ref().unwrap().title_text(),
            Some("t")
        );
        assert_eq!(chart.layout.background(), Some("white"));
    }

    #[test]
    fn ranges_apply_only_with_a_minimum() {
        let mut config = standard();
        config.x_min = Some(0.0);
        config.y_max = Some(5.0);
        let chart = build_figure(&table(), &GraphConfig::Line(config)).unwrap();
        assert_eq!(
            chart.layout.xaxis.as_ref().unwrap().range,
            Some([Some(0.0), None])
        );
        assert_eq!(chart.layout.yaxis.as_ref().unwrap().range, None);
        assert!(chart.data[0].draws_lines());
    }

    #[test]
    fn dual_axis_splits_traces_between_axes() {
        let config = DualAxisConfig {
            base: StandardConfig {
                light_mode: false,
                ..standard()
            },
            y1_columns: vec!["a".into()],
            y2_columns: vec!["b".into()],
            y2_min: Some(0.0),
            y2_max: Some(30.0),
            ..DualAxisConfig::default()
        };
        let chart = build_figure(&table(), &GraphConfig::DualLine(config)).unwrap();

        assert_eq!(chart.data.len(), 2);
        assert!(!chart.data[0].on_second_axis());
        assert!(chart.data[1].on_second_axis());
        assert_eq!(chart.data[1].extra["marker"]["color"], json!("red"));

        let yaxis2 = chart.layout.yaxis2.as_ref().unwrap();
        assert_eq!(yaxis2.overlaying.as_deref(), Some("y"));
        assert_eq!(yaxis2.range, Some([Some(0.0), Some(30.0)]));
        assert_eq!(yaxis2.title_text(), Some("Right Y-Axis"));
        assert_eq!(chart.layout.background(), Some("rgb(17,17,17)"));
    }

    #[test]
    fn map_centres_on_mean_position() {
        let config = MapConfig {
            map_type: MapStyle::OpenStreetMap,
            latitude_column: Some("lat".into()),
            longitude_column: Some("lon".into()),
            hover_columns: vec!["name".into(), "a".into()],
            color_column: Some("b".into()),
            size_column: Some("missing".into()),
            ..MapConfig::default()
        };
        let chart = build_figure(&table(), &GraphConfig::ScatterOnMap(config)).unwrap();

        assert!(chart.is_map());
        let mapbox = chart.layout.mapbox.as_ref().unwrap();
        assert_eq!(mapbox["center"], json!({"lat": 51.0, "lon": 5.0}));
        assert_eq!(mapbox["style"], json!("open-street-map"));

        let trace = &chart.data[0];
        assert_eq!(trace.extra["text"][0], json!("name: x<br>a: 1"));
        assert_eq!(trace.extra["marker"]["colorscale"], json!("Viridis"));
        assert_eq!(trace.extra["marker"]["size"], json!(8));
    }

    #[test]
    fn unknown_column_is_reported_by_name() {
        let mut config = standard();
        config.y_columns = vec!["nope".into()];
        let err = build_figure(&table(), &GraphConfig::Line(config)).unwrap_err();
        assert_eq!(err.to_string(), "Column 'nope' not found");
    }
}
