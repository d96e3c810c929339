//! Expression Plotter - plots user-supplied math expressions as PNG
//!
//! CLI commands:
//! - serve: Start HTTP server
//! - render: Render a single plot to a PNG file (no server)

mod config;
mod expr;
mod logging;
mod page;
mod plot;
mod server;
mod state;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use plot::{PlotParams, PlotRequest};

#[derive(Parser)]
#[command(name = "expr_plotter")]
#[command(about = "Plot functions, parametric curves and polar curves as PNG")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config.yaml
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (beats PORT in .env and the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Render a single plot to a PNG file
    Render {
        /// Plot mode: function, parametric or polar
        #[arg(short, long)]
        mode: String,

        /// Expression for f(x), or x(t) in parametric mode
        #[arg(long)]
        expr_x: Option<String>,

        /// Expression for y(t) (parametric mode)
        #[arg(long)]
        expr_y: Option<String>,

        /// Expression for r(t) (polar mode)
        #[arg(long)]
        expr_r: Option<String>,

        /// Lower bound of the sample domain
        #[arg(long)]
        xmin: Option<f64>,

        /// Upper bound of the sample domain
        #[arg(long)]
        xmax: Option<f64>,

        /// Number of sample points
        #[arg(long)]
        points: Option<usize>,

        /// Output file
        #[arg(short, long, default_value = "plot.png")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging first
    logging::init_logging("logs");
    tracing::info!("Expression Plotter starting up");

    let cli = Cli::parse();
    tracing::debug!("CLI args parsed: config={:?}", cli.config);

    // Load config
    let config = if cli.config.exists() {
        tracing::info!("Loading config from {:?}", cli.config);
        config::Config::load(&cli.config)?
    } else {
        tracing::warn!("Config file not found: {:?}, using defaults", cli.config);
        config::Config::default()
    };
    tracing::info!("Config loaded: host={} port={}", config.host, config.port);

    // Load secrets
    let secrets = config::Secrets::load();

    match cli.command {
        Commands::Serve { port } => {
            let port = port.or(secrets.port).unwrap_or(config.port);
            let state = state::AppState::new(config);
            server::serve(state, port).await?;
        }

        Commands::Render {
            mode,
            expr_x,
            expr_y,
            expr_r,
            xmin,
            xmax,
            points,
            output,
        } => {
            let params = PlotParams {
                mode: Some(mode),
                xmin: xmin.map(|v| v.to_string()),
                xmax: xmax.map(|v| v.to_string()),
                points: points.map(|v| v.to_string()),
                expr_x,
                expr_y,
                expr_r,
            };
            render_to_file(&params, &output)?;
        }
    }

    Ok(())
}

/// Drive the same validation and rendering path as the /plot handler,
/// writing the PNG to disk instead of the cache.
fn render_to_file(params: &PlotParams, output: &Path) -> anyhow::Result<()> {
    let request = PlotRequest::from_params(params)?;
    tracing::info!("Rendering {} plot to {:?}", request.mode.name(), output);

    let png = plot::render_request(&request)?;
    std::fs::write(output, &png)?;

    println!("Wrote {:?} ({} bytes)", output, png.len());
    Ok(())
}
