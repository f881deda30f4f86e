use anyhow::Context;
use clap::{Parser, Subcommand};
use livepreview::render::frame_url;
use livepreview::{PreviewConfig, SettingsStore, ShapeId};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "livepreview", version, about = "Publish and address live previews")]
struct Cli {
    /// Directory holding the persisted settings blob
    #[arg(long, value_name = "DIR")]
    settings_dir: Option<PathBuf>,

    /// JSON config file; takes precedence over the settings blob
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the frame URL of a shape at a given upload version
    Url { shape_id: String, version: u64 },
    /// Upload a markup file to the link host and print its frame URL
    #[cfg(feature = "http")]
    Publish { shape_id: String, file: PathBuf },
}

fn load_config(cli: &Cli) -> anyhow::Result<PreviewConfig> {
    if let Some(path) = &cli.config {
        return PreviewConfig::from_file(path)
            .with_context(|| format!("reading config {}", path.display()));
    }
    match &cli.settings_dir {
        Some(dir) => Ok(SettingsStore::new(dir).load_or_default()?),
        None => Ok(PreviewConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Command::Url { shape_id, version } => {
            let url = frame_url(&config, &ShapeId::from(shape_id.as_str()), *version)?;
            println!("{}", url);
        }
        #[cfg(feature = "http")]
        Command::Publish { shape_id, file } => {
            use livepreview::upload::{HttpUploader, Uploader};

            let markup = std::fs::read_to_string(file)
                .with_context(|| format!("reading markup {}", file.display()))?;
            let id = ShapeId::from(shape_id.as_str());
            let uploader = HttpUploader::new(&config)?;
            let version = uploader.upload(&id, &markup).await?;
            println!("{}", frame_url(&config, &id, version)?);
        }
    }
    Ok(())
}
