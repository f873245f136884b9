use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use std::io::Write;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use graphing_tool::app::{AppState, router};
use graphing_tool::client::HttpChartApi;
use graphing_tool::config::{FormState, GraphType};
use graphing_tool::controller::{Controller, Outcome, View};
use graphing_tool::notify::Toast;
use graphing_tool::panel::PanelLayout;
use graphing_tool::render::{ChartSpec, DownloadOptions};
use graphing_tool::session::ViewState;
use graphing_tool::settings::Settings;
use graphing_tool::upload::SelectedFile;

const BOUNDARY: &str = "graphing-test-boundary";
const SALES: &[u8] = b"month,units,revenue,lat,lon\njan,10,100.5,48.85,2.35\nfeb,12,130.0,51.50,-0.12\nmar,9,90.25,52.52,13.40\n";

fn state() -> (TempDir, Arc<AppState>) {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        upload_dir: dir.path().to_path_buf(),
        ..Settings::default()
    };
    (dir, Arc::new(AppState::new(settings).unwrap()))
}

fn upload_request(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn generate_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/generate_graph")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn zipped(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, body) in entries {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(body).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

async fn send(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
    let response = router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn chart(state: &Arc<AppState>, body: Value) -> ChartSpec {
    let (status, reply) = send(state, generate_request(body)).await;
    assert_eq!(status, StatusCode::OK, "{reply}");
    assert_eq!(reply["success"], json!(true));
    ChartSpec::from_json(reply["graph"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn csv_upload_is_stored_and_summarised() {
    let (dir, state) = state();
    let (status, reply) = send(&state, upload_request("file", "sales.csv", SALES)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["success"], json!(true));
    assert_eq!(reply["file_type"], json!("csv"));
    assert_eq!(reply["row_count"], json!(3));
    assert_eq!(
        reply["columns"],
        json!(["month", "units", "revenue", "lat", "lon"])
    );
    assert_eq!(reply["numeric_columns"], json!(["units", "revenue", "lat", "lon"]));
    assert_eq!(std::fs::read(dir.path().join("sales.csv")).unwrap(), SALES);
}

#[tokio::test]
async fn non_csv_upload_reports_its_path() {
    let (dir, state) = state();
    let (status, reply) = send(
        &state,
        upload_request("file", "events.json", br#"[{"t":1,"v":2}]"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["filename"], json!("events.json"));
    assert_eq!(reply["file_type"], json!("json"));
    assert_eq!(
        reply["filepath"],
        json!(dir.path().join("events.json").to_string_lossy())
    );
    assert!(reply.get("columns").is_none());
}

#[tokio::test]
async fn upload_refusals() {
    let (_dir, state) = state();

    let (status, reply) = send(&state, upload_request("attachment", "sales.csv", SALES)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply["error"], json!("No file part"));

    let (status, reply) = send(&state, upload_request("file", "", SALES)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply["error"], json!("No selected file"));

    let (status, reply) = send(&state, upload_request("file", "sales.xlsx", SALES)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply["success"], json!(false));
    assert_eq!(reply["error"], json!("Invalid file type"));
}

#[tokio::test]
async fn upload_names_cannot_escape_the_upload_dir() {
    let (dir, state) = state();
    let (status, reply) = send(&state, upload_request("file", "../../sales.csv", SALES)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["filename"], json!("sales.csv"));
    assert!(dir.path().join("sales.csv").exists());
}

#[tokio::test]
async fn line_chart_from_stored_csv() {
    let (_dir, state) = state();
    send(&state, upload_request("file", "sales.csv", SALES)).await;

    let spec = chart(
        &state,
        json!({
            "filename": "sales.csv",
            "graph_type": "line",
            "config": {"x_column": "month", "y_columns": ["units", "revenue"], "x_min": null}
        }),
    )
    .await;

    assert_eq!(spec.data.len(), 2);
    assert_eq!(spec.data[0].x, vec![json!("jan"), json!("feb"), json!("mar")]);
    assert_eq!(spec.data[1].name.as_deref(), Some("revenue"));
    assert!(spec.data[0].draws_lines());
    assert_eq!(spec.layout.title_text(), Some("Line Chart"));
    assert_eq!(
        spec.layout.xaxis.as_ref().and_then(|a| a.title_text()),
        Some("month")
    );
    assert_eq!(spec.layout.background(), Some("white"));
}

#[tokio::test]
async fn dual_axis_and_map_charts() {
    let (_dir, state) = state();
    send(&state, upload_request("file", "sales.csv", SALES)).await;

    let dual = chart(
        &state,
        json!({
            "filename": "sales.csv",
            "graph_type": "dual_line",
            "config": {
                "x_column": "month",
                "y_columns": ["units"],
                "y1_columns": ["units"],
                "y2_columns": ["revenue"],
                "y2_title": "Revenue",
                "light_mode": false
            }
        }),
    )
    .await;
    assert!(!dual.data[0].on_second_axis());
    assert!(dual.data[1].on_second_axis());
    let yaxis2 = dual.layout.yaxis2.as_ref().unwrap();
    assert_eq!(yaxis2.overlaying.as_deref(), Some("y"));
    assert_eq!(yaxis2.title_text(), Some("Revenue"));
    assert_eq!(dual.layout.background(), Some("rgb(17,17,17)"));

    let map = chart(
        &state,
        json!({
            "filename": "sales.csv",
            "graph_type": "scatter_on_map",
            "config": {
                "latitude_column": "lat",
                "longitude_column": "lon",
                "hover_columns": ["month"],
                "map_type": "open-street-map"
            }
        }),
    )
    .await;
    assert!(map.is_map());
    assert_eq!(map.data[0].lat.len(), 3);
    assert_eq!(
        map.layout.mapbox.as_ref().unwrap()["style"],
        json!("open-street-map")
    );
}

#[tokio::test]
async fn zip_upload_charts_its_first_csv() {
    let (dir, state) = state();
    let bundle = zipped(&[("README.txt", &b"monthly sales"[..]), ("sales.csv", SALES)]);
    let (status, reply) = send(&state, upload_request("file", "bundle.zip", &bundle)).await;

    assert_eq!(status, StatusCode::OK, "{reply}");
    assert_eq!(reply["file_type"], json!("zip"));
    assert_eq!(reply["row_count"], json!(3));
    assert_eq!(reply["numeric_columns"], json!(["units", "revenue", "lat", "lon"]));
    assert!(dir.path().join("bundle.zip").exists());

    let spec = chart(
        &state,
        json!({
            "filename": "bundle.zip",
            "graph_type": "scatter",
            "config": {"x_column": "units", "y_columns": ["revenue"]}
        }),
    )
    .await;
    assert_eq!(spec.data.len(), 1);
    assert_eq!(spec.data[0].x, vec![json!(10.0), json!(12.0), json!(9.0)]);
}

#[tokio::test]
async fn zip_without_csv_is_refused() {
    let (_dir, state) = state();
    let bundle = zipped(&[("notes.txt", &b"a b\n1 2\n"[..])]);
    let (status, reply) = send(&state, upload_request("file", "notes.zip", &bundle)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply["success"], json!(false));
    assert_eq!(reply["error"], json!("No CSV file found in zip archive"));
}

#[tokio::test]
async fn generate_refusals() {
    let (_dir, state) = state();
    send(&state, upload_request("file", "sales.csv", SALES)).await;

    let (status, reply) = send(
        &state,
        generate_request(json!({"filename": "sales.csv", "graph_type": "pie", "config": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply["error"], json!("Invalid graph type"));

    let (status, reply) = send(
        &state,
        generate_request(json!({
            "filename": "sales.csv",
            "graph_type": "scatter",
            "config": {"x_column": "month", "y_columns": ["profit"]}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        reply["error"],
        json!("Error generating graph: Column 'profit' not found")
    );

    let (status, reply) = send(
        &state,
        generate_request(json!({
            "filename": "missing.csv",
            "graph_type": "scatter",
            "config": {"x_column": "month", "y_columns": ["units"]}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        reply["error"]
            .as_str()
            .unwrap()
            .starts_with("Error generating graph:")
    );

    let malformed = Request::builder()
        .method("POST")
        .uri("/generate_graph")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, reply) = send(&state, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply["success"], json!(false));
}

/// View that keeps only what the end-to-end test checks
#[derive(Default)]
struct QuietView {
    charts: usize,
    messages: Vec<String>,
}

impl View for QuietView {
    fn show_view_state(&mut self, _state: ViewState) {}
    fn set_loading(&mut self, _loading: bool) {}
    fn apply_layout(&mut self, _layout: &PanelLayout) {}
    fn show_toast(&mut self, toast: &Toast) {
        self.messages.push(toast.message.clone());
    }
    fn render_chart(&mut self, _chart: &ChartSpec) {
        self.charts += 1;
    }
    fn download_chart(&mut self, _chart: &ChartSpec, _options: &DownloadOptions) {}
    fn fullscreen_chart(&mut self, _chart: &ChartSpec) {}
    fn reset_form(&mut self, _form: &FormState) {}
}

#[tokio::test]
async fn controller_against_a_running_server() {
    let (dir, state) = state();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });

    let settings = Settings {
        server_url: format!("http://{}", address),
        ..Settings::default()
    };
    let api = HttpChartApi::new(&settings).unwrap();
    let mut controller = Controller::new(api, QuietView::default());

    let local = tempfile::tempdir().unwrap();
    let source = local.path().join("local-sales.csv");
    std::fs::write(&source, SALES).unwrap();
    let file = SelectedFile::from_path(&source).unwrap();
    assert_eq!(controller.on_file_selected(file).await, Outcome::Succeeded);
    assert!(dir.path().join("local-sales.csv").exists());
    assert_eq!(
        controller.session().numeric_columns(),
        ["units", "revenue", "lat", "lon"]
    );

    controller.on_graph_type_changed(Some(GraphType::Scatter));
    controller.form_mut().x_column = Some("units".into());
    controller.form_mut().y_columns = vec!["revenue".into()];
    controller.form_mut().title = "Units vs revenue".into();
    assert_eq!(controller.on_generate_requested().await, Outcome::Succeeded);

    assert_eq!(controller.view().charts, 1);
    assert_eq!(
        controller
            .session()
            .chart
            .as_ref()
            .and_then(|c| c.layout.title_text()),
        Some("Units vs revenue")
    );
    assert_eq!(
        controller.view().messages.last().map(String::as_str),
        Some("Graph generated successfully!")
    );
}
