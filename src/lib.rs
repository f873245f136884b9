/*!
# Graphing Tool

Upload a tabular data file, pick a chart type and its columns, and get back
an interactive chart specification, built in Rust.

## Overview

The crate holds both halves of a small chart-making service. The server
stores uploaded files, summarises CSV columns and turns a chart
configuration into a Plotly-shaped specification. The client side is a
controller that walks a user through upload, configuration and display
against any [`api::ChartApi`] and any [`controller::View`].

## Architecture

### Client Layer
- **session**: State held between interactions (uploaded file, column summary, chart, view state)
- **config**: Chart types, per-type configuration records, form assembly and validation
- **panel**: Which configuration field groups show for a chart type, and selector options
- **upload**: File selection, extension and size checks, upload responses
- **render**: Render requests and responses, the chart specification types
- **notify**: Transient notifications with severity and timing
- **api**: The upload and render endpoints as a trait
- **controller**: Triggers that tie the above together
- **client**: `ChartApi` over HTTP (feature `web`)
- **export**: PNG export of a chart specification (feature `web`)

### Server Layer
- **table**: Reading stored uploads (CSV, text, log, JSON, CSV inside ZIP) into typed columns
- **figure**: Building the chart specification for each chart type
- **app**: The `/upload` and `/generate_graph` endpoints (feature `web`)

### Shared
- **settings**: Bind address, upload directory, limits and client URL, with `GRAPHING_*` overrides

## Chart Types

| Tag              | Chart                                   |
|------------------|-----------------------------------------|
| `scatter`        | Markers, one trace per y column         |
| `line`           | Lines with markers                      |
| `dual_line`      | Lines on a left and a right y axis      |
| `scatter_on_map` | Points on a base map by latitude/longitude |

## REST API Endpoints

- `POST /upload` - Multipart field `file`; stores it and summarises CSV columns
- `POST /generate_graph` - JSON `{filename, graph_type, config}`; returns the chart specification
*/

pub mod api;
pub mod config;
pub mod controller;
pub mod figure;
pub mod notify;
pub mod panel;
pub mod render;
pub mod session;
pub mod settings;
pub mod table;
pub mod upload;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod client;
#[cfg(feature = "web")]
pub mod export;

pub use api::{ApiError, ChartApi};
pub use config::{FormState, GraphConfig, GraphType, MapStyle, ValidationError};
pub use controller::{Controller, Outcome, View};
pub use render::{ChartSpec, RenderRequest, RenderResponse};
pub use session::{UiSession, ViewState};
pub use settings::Settings;
