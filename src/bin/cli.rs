use clap::Parser;
use std::path::PathBuf;

use graphing_tool::client::HttpChartApi;
use graphing_tool::config::{FormState, GraphType, MapStyle};
use graphing_tool::controller::{Controller, View};
use graphing_tool::export;
use graphing_tool::notify::Toast;
use graphing_tool::panel::PanelLayout;
use graphing_tool::render::{ChartSpec, DownloadOptions};
use graphing_tool::session::ViewState;
use graphing_tool::settings::Settings;
use graphing_tool::upload::SelectedFile;

/// Upload a data file to the graphing server and save the chart it returns
#[derive(Parser, Debug)]
#[command(name = "graphing-cli", version)]
struct Args {
    /// Data file to upload (csv, txt, log, json or zip)
    file: PathBuf,

    /// Server base URL; overrides GRAPHING_SERVER_URL
    #[arg(long)]
    server: Option<String>,

    /// scatter, line, dual_line or scatter_on_map; omit to only upload
    #[arg(short = 'g', long)]
    graph_type: Option<GraphType>,

    #[arg(short = 'x', long)]
    x_column: Option<String>,

    /// Comma separated y-axis columns
    #[arg(short = 'y', long, value_delimiter = ',')]
    y_columns: Vec<String>,

    /// Comma separated right-axis columns for dual_line
    #[arg(long, value_delimiter = ',')]
    y2_columns: Vec<String>,

    #[arg(long, default_value = "")]
    title: String,
    #[arg(long, default_value = "")]
    x_title: String,
    #[arg(long, default_value = "")]
    y_title: String,
    #[arg(long, default_value = "")]
    y2_title: String,

    #[arg(long, default_value = "", allow_hyphen_values = true)]
    x_min: String,
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    x_max: String,
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    y_min: String,
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    y_max: String,
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    y2_min: String,
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    y2_max: String,

    #[arg(long)]
    latitude: Option<String>,
    #[arg(long)]
    longitude: Option<String>,
    /// Comma separated columns shown on hover
    #[arg(long, value_delimiter = ',')]
    hover: Vec<String>,
    #[arg(long)]
    color: Option<String>,
    #[arg(long)]
    size: Option<String>,
    #[arg(long, default_value = "satellite")]
    map_style: MapStyle,

    /// Dark chart theme
    #[arg(long)]
    dark: bool,

    /// Directory the PNG (and JSON) are written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Also write the chart specification as JSON
    #[arg(long)]
    json: bool,

    /// Also write a large-format copy of the chart
    #[arg(long)]
    fullscreen: bool,

    #[arg(short, long)]
    verbose: bool,
}

/// Terminal rendition of the page: notifications go to stdout and the
/// chart goes to image files.
struct TerminalView {
    output_dir: PathBuf,
    columns_listed: bool,
}

impl TerminalView {
    fn new(output_dir: PathBuf) -> Self {
        TerminalView {
            output_dir,
            columns_listed: false,
        }
    }

    fn save(&self, chart: &ChartSpec, options: &DownloadOptions) {
        let path = self.output_dir.join(options.file_name());
        match export::save_png(chart, options, &path) {
            Ok(()) => println!("Saved {}", path.display()),
            Err(e) => eprintln!("Could not save {}: {}", path.display(), e),
        }
    }
}

impl View for TerminalView {
    fn show_view_state(&mut self, state: ViewState) {
        log::debug!("view state {:?}", state);
    }

    fn set_loading(&mut self, loading: bool) {
        if loading {
            println!("Working...");
        }
    }

    fn apply_layout(&mut self, layout: &PanelLayout) {
        if self.columns_listed || layout.x_column.options.is_empty() {
            return;
        }
        println!("Columns: {}", layout.x_column.options.join(", "));
        println!("Numeric: {}", layout.y_columns.options.join(", "));
        self.columns_listed = true;
    }

    fn show_toast(&mut self, toast: &Toast) {
        println!("[{}] {}", toast.severity.label(), toast.message);
    }

    fn render_chart(&mut self, chart: &ChartSpec) {
        println!(
            "Chart \"{}\" with {} trace(s)",
            chart.layout.title_text().unwrap_or_default(),
            chart.data.len()
        );
    }

    fn download_chart(&mut self, chart: &ChartSpec, options: &DownloadOptions) {
        self.save(chart, options);
    }

    fn fullscreen_chart(&mut self, chart: &ChartSpec) {
        let options = DownloadOptions {
            filename: "csv_graph_fullscreen".to_string(),
            width: 1600,
            height: 1200,
            ..DownloadOptions::default()
        };
        self.save(chart, &options);
    }

    fn reset_form(&mut self, _form: &FormState) {
        self.columns_listed = false;
    }
}

fn fill_form(form: &mut FormState, args: &Args) {
    form.title = args.title.clone();
    form.map_title = args.title.clone();
    form.x_title = args.x_title.clone();
    form.y_title = args.y_title.clone();
    form.y2_title = args.y2_title.clone();
    form.x_column = args.x_column.clone();
    form.y_columns = args.y_columns.clone();
    form.y2_columns = args.y2_columns.clone();
    form.x_min = args.x_min.clone();
    form.x_max = args.x_max.clone();
    form.y_min = args.y_min.clone();
    form.y_max = args.y_max.clone();
    form.y2_min = args.y2_min.clone();
    form.y2_max = args.y2_max.clone();
    form.map_type = args.map_style;
    form.latitude_column = args.latitude.clone();
    form.longitude_column = args.longitude.clone();
    form.hover_columns = args.hover.clone();
    form.color_column = args.color.clone();
    form.size_column = args.size.clone();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "off" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut settings = Settings::from_env();
    if let Some(server) = &args.server {
        settings.server_url = server.clone();
    }
    std::fs::create_dir_all(&args.output_dir)?;

    let api = HttpChartApi::new(&settings)?;
    let mut controller = Controller::new(api, TerminalView::new(args.output_dir.clone()));

    let file = SelectedFile::from_path(&args.file)?;
    if !controller.on_file_selected(file).await.is_success() {
        return Err("upload failed".into());
    }

    let Some(graph_type) = args.graph_type else {
        return Ok(());
    };
    controller.on_graph_type_changed(Some(graph_type));
    fill_form(controller.form_mut(), &args);
    controller.on_light_mode_changed(!args.dark);

    if !controller.on_generate_requested().await.is_success() {
        return Err("graph generation failed".into());
    }

    if args.json {
        if let Some(chart) = &controller.session().chart {
            let path = args.output_dir.join("csv_graph.json");
            std::fs::write(&path, chart.to_json()?)?;
            println!("Saved {}", path.display());
        }
    }
    controller.on_download_requested();
    if args.fullscreen {
        controller.on_fullscreen_requested();
    }

    Ok(())
}
