//! `v2a` command-line client

use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;
use v2a_dl::{
    AudioFormat, Bitrate, Client, Config, DownloadKey, DownloadProgress, Method, SavedFile,
    SearchOutcome,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Search for videos and save them as audio.", long_about = None)]
struct Cli {
    /// Config file (default: the platform config directory)
    #[arg(long, short, global = true, env = "V2A_CONFIG")]
    config: Option<PathBuf>,

    /// Conversion service base URL
    #[arg(long, global = true, env = "V2A_SERVER")]
    server: Option<String>,

    /// Directory downloads are saved into
    #[arg(long, short, global = true)]
    output: Option<PathBuf>,

    /// Log debug output
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the formats, bitrates and methods the service advertises
    Formats,
    /// Search and list results
    Search {
        /// Search terms
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Search, then download one of the results
    Get {
        /// Search terms
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Result to download (1-based)
        #[arg(long, short, default_value_t = 1)]
        pick: usize,

        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Download a video URL directly
    Fetch {
        /// Video page URL
        url: String,

        /// Name used when the service does not suggest a filename
        #[arg(long, short)]
        title: Option<String>,

        #[command(flatten)]
        selection: SelectionArgs,
    },
}

#[derive(Args, Debug)]
struct SelectionArgs {
    /// Output format (mp3, aac, alac, flac, wav, ogg)
    #[arg(long, short)]
    format: Option<AudioFormat>,

    /// Bitrate in kbit/s (128, 192, 256, 320); ignored for lossless formats
    #[arg(long, short)]
    bitrate: Option<Bitrate>,

    /// Processing method (auto, fast, quality, stream)
    #[arg(long, short)]
    method: Option<Method>,

    /// Download lossless formats without asking
    #[arg(long, short)]
    yes: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("v2a_dl=debug,v2a=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("v2a_dl=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> v2a_dl::Result<ExitCode> {
    let mut config = Config::load_or_default(cli.config.as_deref()).await?;
    if let Some(server) = cli.server {
        config.server.base_url = server;
    }
    if let Some(output) = cli.output {
        config.output.download_dir = output;
    }
    if let Commands::Get { selection, .. } | Commands::Fetch { selection, .. } = &cli.command {
        selection.apply(&mut config);
    }

    let client = Client::new(config)?;

    match cli.command {
        Commands::Formats => {
            if let Ok(formats) = client.load_formats().await {
                let mut methods: Vec<_> = formats.formats.iter().collect();
                methods.sort_by(|a, b| a.0.cmp(b.0));
                for (name, entry) in methods {
                    println!("{name}: {}", entry.formats.join(", "));
                    if !entry.description.is_empty() {
                        println!("    {}", entry.description);
                    }
                    if !entry.recommended_for.is_empty() {
                        println!("    recommended for: {}", entry.recommended_for);
                    }
                }
                println!("bitrates: {}", formats.bitrates.join(", "));
                println!("methods: {}", formats.methods.join(", "));
            }
        }
        Commands::Search { query } => {
            if search(&client, &query.join(" ")).await {
                for (i, result) in client.results().iter().enumerate() {
                    print_result(i + 1, result);
                }
            }
        }
        Commands::Get {
            query,
            pick,
            selection,
        } => {
            if search(&client, &query.join(" ")).await {
                let results = client.results();
                let Some(result) = pick.checked_sub(1).and_then(|i| results.get(i)) else {
                    eprintln!("--pick {pick} is out of range (1-{})", results.len());
                    return Ok(ExitCode::FAILURE);
                };
                print_result(pick, result);
                download(&client, result.key(), &result.title, selection.yes).await?;
            }
        }
        Commands::Fetch {
            url,
            title,
            selection,
        } => {
            download(
                &client,
                DownloadKey::new(url),
                title.as_deref().unwrap_or_default(),
                selection.yes,
            )
            .await?;
        }
    }

    Ok(match client.error() {
        Some(record) => {
            eprintln!("{}", record.message);
            ExitCode::FAILURE
        }
        None => ExitCode::SUCCESS,
    })
}

impl SelectionArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(format) = self.format {
            config.defaults.format = format;
        }
        if let Some(bitrate) = self.bitrate {
            if v2a_dl::format_policy::bitrate_applies(config.defaults.format) {
                config.defaults.bitrate = bitrate;
            } else {
                tracing::warn!(
                    format = %config.defaults.format,
                    "bitrate is ignored for lossless formats"
                );
            }
        }
        if let Some(method) = self.method {
            config.defaults.method = method;
        }
    }
}

/// Returns whether results were stored; failures are already in the session
async fn search(client: &Client, query: &str) -> bool {
    match client.search(query).await {
        Ok(SearchOutcome::Stored(_)) => true,
        Ok(SearchOutcome::Skipped) => {
            eprintln!("nothing to search for");
            false
        }
        Ok(SearchOutcome::Superseded) | Err(_) => false,
    }
}

fn print_result(n: usize, result: &v2a_dl::VideoResult) {
    let duration = result.duration_label();
    if duration.is_empty() {
        println!("{n:>3}. {}", result.title);
    } else {
        println!("{n:>3}. {} [{duration}]", result.title);
    }
    println!("     {}", result.url);
}

async fn download(
    client: &Client,
    key: DownloadKey,
    title: &str,
    assume_yes: bool,
) -> v2a_dl::Result<()> {
    let saved = match client.request_download(key, title).await {
        Ok(DownloadProgress::Saved(saved)) => Some(saved),
        Ok(DownloadProgress::AwaitingConfirmation) => {
            let format = client.selection().format;
            if assume_yes || confirm_lossless(format).await? {
                client.confirm_download().await.ok().flatten()
            } else {
                client.cancel_download();
                eprintln!("cancelled");
                None
            }
        }
        // recorded in the session; reported by the caller
        Err(_) => None,
    };

    if let Some(SavedFile {
        path, size_bytes, ..
    }) = saved
    {
        println!("saved {} ({size_bytes} bytes)", path.display());
    }
    Ok(())
}

async fn confirm_lossless(format: AudioFormat) -> v2a_dl::Result<bool> {
    print!(
        "{} is a lossless format and files can be very large. Continue? [y/N] ",
        format.as_str().to_uppercase()
    );
    std::io::stdout().flush()?;

    let mut line = String::new();
    tokio::io::BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
