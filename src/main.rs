use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use glowscene::{GlowApp, SceneConfig};

/// Interactive scene viewer with hover-reactive glowing spheres
#[derive(Debug, Parser)]
#[command(name = "glowscene", version, about)]
struct Cli {
    /// Scene description in TOML; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the directory asset paths are resolved against
    #[arg(long)]
    asset_root: Option<PathBuf>,

    /// Disables vsync
    #[arg(long)]
    no_vsync: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("could not load scene config {}", path.display()))?,
        None => SceneConfig::default(),
    };
    if let Some(root) = cli.asset_root {
        config.asset_root = root;
    }
    if cli.no_vsync {
        config.window.vsync = false;
    }
    config.validate().context("invalid scene config")?;

    log::info!(
        "starting with {} spheres, {} panels, assets under {}",
        config.spheres.len(),
        config.panels.len(),
        config.asset_root.display()
    );

    GlowApp::new(config)?.run()
}
