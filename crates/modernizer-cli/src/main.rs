use modernizer_cli::{command, resolve_config, run, Options};
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = command().get_matches();
    let options = Options::from_matches(&matches)?;
    init_tracing(options.log_json);

    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let (config, api_key) = resolve_config(&options, |var| std::env::var(var).ok())?;
    let summary = run(&options, config, api_key.as_deref()).await?;

    println!("Processed {} unit(s)", summary.units);
    println!("  With fallback: {}", summary.units_with_fallback);
    println!("  Backend calls: {}", summary.backend_calls);
    println!("  Output: {}", options.out.display());
    Ok(())
}
