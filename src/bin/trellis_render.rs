//! trellis-render
//!
//! Renders site templates through the template cache and prints the output.
//! Useful for checking a template (and its includes) outside a full build.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use trellis::templates::config::CONFIG_FILENAME;
use trellis::{Config, SiteSource, TemplateCache};

#[derive(Debug, Parser)]
#[command(name = "trellis-render", version, about = "Render site templates")]
struct Cli {
    /// Config file
    #[arg(short, long, default_value = CONFIG_FILENAME)]
    config: PathBuf,

    /// JSON file with the render data (an object)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Site-relative template paths, e.g. `/index.html`
    #[arg(required = true)]
    templates: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("trellis=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config);

    let data: serde_json::Value = match &cli.data {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read data file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse data file {}", path.display()))?
        }
        None => serde_json::json!({}),
    };

    let mut cache = TemplateCache::from_config(&config);
    tracing::info!(root = ?config.site.root, templates = cli.templates.len(), "trellis-render starting");

    for template in &cli.templates {
        let filename = cache.site().src(template);
        let content = std::fs::read_to_string(&filename)
            .with_context(|| format!("failed to read template {}", filename.display()))?;

        let output = cache.render(&content, &data, &filename)?.await?;
        println!("{output}");
    }

    Ok(())
}
