use graphing_tool::app;
use graphing_tool::settings::Settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::from_env();
    log::info!(
        "Starting graphing server on {} (uploads in {})",
        settings.bind_address(),
        settings.upload_dir.display()
    );
    app::run(settings).await
}
