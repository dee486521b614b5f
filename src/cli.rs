use anyhow::Result;
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use dialoguer::{Input, Select};

use crate::config::{self, DownloadConfig};
use crate::core::downloader;
use crate::models::Track;
use crate::sources::netease::NeteaseClient;
use crate::sources::MusicSource;

#[derive(Parser)]
#[command(name = "pastking", about = "Keyword music search and download utility")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Run in GUI mode
    #[arg(long)]
    pub gui: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search the catalog and optionally download one result
    Search {
        /// Keyword to search for
        keyword: String,
    },
    /// Set output directory and provider endpoint
    Config,
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Search { keyword }) => cmd_search(&keyword),
        Some(Commands::Config) => cmd_config(),
        None => {
            if cli.gui {
                #[cfg(feature = "gui")]
                {
                    crate::gui::launch();
                    Ok(())
                }
                #[cfg(not(feature = "gui"))]
                {
                    anyhow::bail!(
                        "GUI support is not enabled. Rebuild with: cargo build --features gui"
                    );
                }
            } else {
                println!("Usage: pastking <command> or pastking --gui");
                println!("Run pastking --help for details.");
                Ok(())
            }
        }
    }
}

/// Run a search through a source. A blank keyword is a no-op that issues no
/// request; a failed request degrades to an empty result set.
fn search_tracks(source: &dyn MusicSource, keyword: &str) -> Vec<Track> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Vec::new();
    }

    match source.search(keyword) {
        Ok(tracks) => tracks,
        Err(e) => {
            log::warn!("search failed: {:#}", e);
            Vec::new()
        }
    }
}

fn results_table(tracks: &[Track]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["#", "ID", "Title", "Artist", "Download"]);

    for (i, track) in tracks.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&track.id),
            Cell::new(&track.title),
            Cell::new(&track.artist),
            Cell::new(if track.is_downloadable() { "yes" } else { "-" }),
        ]);
    }

    table
}

fn cmd_search(keyword: &str) -> Result<()> {
    if keyword.trim().is_empty() {
        println!("Nothing to search.");
        return Ok(());
    }

    let cfg = config::load_config();
    let client = NeteaseClient::new(&cfg.download.resolve_endpoint())?;

    let tracks = search_tracks(&client, keyword);
    if tracks.is_empty() {
        println!("No results for \"{}\".", keyword.trim());
        return Ok(());
    }

    println!("{}", results_table(&tracks));

    let mut items: Vec<String> = tracks.iter().map(|t| t.summary()).collect();
    items.push("Quit".to_string());

    let selection = Select::new()
        .with_prompt("Download a track")
        .items(&items)
        .default(0)
        .interact()?;

    if selection >= tracks.len() {
        return Ok(());
    }

    let out_dir = cfg.download.resolve_output_dir();
    match downloader::download_track(&client, &tracks[selection], &out_dir) {
        Ok(Some(path)) => println!("Saved {}", path.display()),
        Ok(None) => println!("This track has no audio URL."),
        Err(e) => {
            log::warn!("download failed: {:#}", e);
            println!("Download failed.");
        }
    }

    Ok(())
}

fn cmd_config() -> Result<()> {
    let mut cfg = config::load_config();

    println!("pastking configuration");

    let output_dir: String = Input::new()
        .with_prompt("Output directory")
        .with_initial_text(cfg.download.resolve_output_dir().display().to_string())
        .interact_text()?;

    let endpoint: String = Input::new()
        .with_prompt("Provider endpoint")
        .with_initial_text(cfg.download.resolve_endpoint())
        .interact_text()?;

    cfg.download = DownloadConfig {
        output_dir: Some(output_dir.into()),
        endpoint: Some(endpoint),
    };

    config::save_config(&cfg)?;
    println!("\nConfiguration saved!");
    Ok(())
}
