//! mixmatch CLI - find mixable track pairs in playlist exports
//!
//! # Main Commands
//!
//! ```bash
//! mixmatch serve                     # Start HTTP server (port 3000)
//! mixmatch matches playlist.csv     # Scored mixable pairs from a CSV
//! mixmatch playlist <id>            # Same, pulling tracks via the API
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! mixmatch parse playlist.csv       # Just normalize CSV to track JSON
//! ```

use clap::{Args, Parser, Subcommand};
use mixmatch::ingest::SpotifyClient;
use mixmatch::pipeline::{analyze_file, analyze_tracks, AnalysisResult, AnalyzeOptions};
use mixmatch::{normalize_file, start_server, ScoreToggles};
use std::fs;
use std::path::{Path, PathBuf};

/// Tolerance ceiling applied at this surface.
const MAX_TOLERANCE_BPM: f64 = 50.0;

#[derive(Parser)]
#[command(name = "mixmatch")]
#[command(about = "Find mixable track pairs by tempo and key compatibility", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a playlist CSV and output track JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Full pipeline: CSV -> tracks -> scored mixable pairs
    Matches {
        /// Input CSV file
        input: PathBuf,

        #[command(flatten)]
        params: EngineParams,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Pull a playlist from the streaming API, then match and score it
    Playlist {
        /// Playlist identifier
        id: String,

        #[command(flatten)]
        params: EngineParams,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

/// Engine parameters shared by the matching commands.
#[derive(Args)]
struct EngineParams {
    /// Tempo tolerance in BPM (0-50)
    #[arg(short, long, default_value = "5")]
    tolerance: f64,

    /// Disable relative major/minor key matching
    #[arg(long)]
    no_relative_key: bool,

    /// Score mood closeness (valence, mode, genre overlap)
    #[arg(long)]
    mood: bool,

    /// Score energy closeness (energy, danceability, loudness, popularity)
    #[arg(long)]
    energy: bool,

    /// Score texture closeness (instrumentalness, speechiness, acousticness)
    #[arg(long)]
    texture: bool,
}

impl EngineParams {
    fn to_options(&self) -> AnalyzeOptions {
        AnalyzeOptions {
            tolerance_bpm: self.tolerance.clamp(0.0, MAX_TOLERANCE_BPM),
            allow_relative_key: !self.no_relative_key,
            toggles: ScoreToggles::new(self.mood, self.energy, self.texture),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::Matches { input, params, output } => {
            cmd_matches(&input, params.to_options(), output.as_deref())
        }

        Commands::Playlist { id, params, output } => {
            cmd_playlist(&id, params.to_options(), output.as_deref()).await
        }

        Commands::Serve { port } => start_server(port).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Parsing CSV: {}", input.display());

    let result = normalize_file(input)?;
    eprintln!("   Encoding: {}", result.encoding);
    eprintln!("   Columns: {}", result.headers.join(", "));
    if result.rows_dropped > 0 {
        eprintln!("   Dropped {} malformed rows", result.rows_dropped);
    }
    eprintln!("Parsed {} tracks", result.tracks.len());

    let json = serde_json::to_string_pretty(&result.tracks)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_matches(
    input: &Path,
    options: AnalyzeOptions,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Processing: {}", input.display());

    let result = analyze_file(input, options)?;
    print_summary(&result);

    let json = serde_json::to_string_pretty(&result)?;
    write_output(&json, output)?;

    Ok(())
}

async fn cmd_playlist(
    id: &str,
    options: AnalyzeOptions,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Fetching playlist: {}", id);

    let client = SpotifyClient::from_env()?;
    let tracks = client.fetch_playlist(id).await?;
    eprintln!("   Pulled {} tracks", tracks.len());

    let result = analyze_tracks(tracks, options)?;
    print_summary(&result);

    let json = serde_json::to_string_pretty(&result)?;
    write_output(&json, output)?;

    Ok(())
}

fn print_summary(result: &AnalysisResult) {
    eprintln!("\nTracks:  {}", result.tracks.len());
    eprintln!("Pairs:   {}", result.pairs.len());
    let scored = result.pairs.iter().filter(|p| p.score.is_some()).count();
    if scored > 0 {
        eprintln!("Scored:  {}", scored);
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_defaults() {
        let cli = Cli::try_parse_from(["mixmatch", "matches", "playlist.csv"]).unwrap();
        match cli.command {
            Commands::Matches { params, .. } => {
                let options = params.to_options();
                assert_eq!(options.tolerance_bpm, 5.0);
                assert!(options.allow_relative_key);
                assert!(!options.toggles.any());
            }
            _ => panic!("expected matches subcommand"),
        }
    }

    #[test]
    fn test_cli_tolerance_clamped() {
        let cli =
            Cli::try_parse_from(["mixmatch", "matches", "playlist.csv", "--tolerance", "500"]).unwrap();
        match cli.command {
            Commands::Matches { params, .. } => {
                assert_eq!(params.to_options().tolerance_bpm, 50.0);
            }
            _ => panic!("expected matches subcommand"),
        }
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "mixmatch", "matches", "p.csv", "--no-relative-key", "--mood", "--texture",
        ])
        .unwrap();
        match cli.command {
            Commands::Matches { params, .. } => {
                let options = params.to_options();
                assert!(!options.allow_relative_key);
                assert!(options.toggles.mood);
                assert!(!options.toggles.energy);
                assert!(options.toggles.texture);
            }
            _ => panic!("expected matches subcommand"),
        }
    }
}
