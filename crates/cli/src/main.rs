// ABOUTME: CLI for importing WordPress posts into Payload CMS and previewing HTML conversion.
// ABOUTME: `import` runs the importer against Payload or a dry-run store; `convert` prints Lexical JSON.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use wp2payload_importer::options::{DEFAULT_MEDIA_MAP_FILE, DEFAULT_WORK_DIR};
use wp2payload_importer::{
    Auth, ContentStore, ImportError, ImporterBuilder, MemoryStore, PayloadStore, RunSummary,
};
use wp2payload_richtext::Converter;

/// Exit code for configuration problems found before the run starts.
const EXIT_CONFIG: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "wp2payload")]
#[command(about = "Import WordPress posts into Payload CMS", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import posts, authors, categories and images
    Import(ImportArgs),
    /// Convert an HTML file to Lexical JSON without fetching images
    Convert(ConvertArgs),
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// WordPress site root, e.g. https://blog.example.com
    #[arg(long, env = "WP_BASE")]
    wp_base: String,

    /// Bearer token for WordPress; wins over username/password
    #[arg(long, env = "WP_TOKEN", hide_env_values = true)]
    wp_token: Option<String>,

    #[arg(long, env = "WP_USERNAME")]
    wp_username: Option<String>,

    /// WordPress application password
    #[arg(long, env = "WP_PASSWORD", hide_env_values = true)]
    wp_password: Option<String>,

    /// Payload CMS root, e.g. http://localhost:3000
    #[arg(long, env = "PAYLOAD_URL", required_unless_present = "dry_run")]
    payload_url: Option<String>,

    #[arg(long, env = "PAYLOAD_API_KEY", hide_env_values = true)]
    payload_api_key: Option<String>,

    /// Write to an in-memory store instead of Payload; id map files are left untouched
    #[arg(long)]
    dry_run: bool,

    /// Posts requested per WordPress page (1-100)
    #[arg(long, default_value_t = 10)]
    per_page: u32,

    /// Stop after this many posts
    #[arg(long)]
    limit: Option<usize>,

    /// WordPress post status to import
    #[arg(long, default_value = "publish")]
    status: String,

    /// Directory for the id maps and the failure log
    #[arg(long, default_value = DEFAULT_WORK_DIR)]
    work_dir: PathBuf,

    /// Do not persist the image URL to media id map between runs
    #[arg(long)]
    no_media_map: bool,

    /// HTTP timeout, e.g. 30s, 2m or a number of seconds
    #[arg(long, default_value = "30s", value_parser = parse_timeout)]
    timeout: Duration,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// HTML file to convert, or "-" for stdin
    file: String,

    /// URL relative image sources resolve against
    #[arg(long)]
    base_url: Option<String>,

    /// Print the plain text instead of JSON
    #[arg(long)]
    text: bool,

    /// Output compact JSON instead of pretty
    #[arg(long)]
    compact: bool,
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    parse_duration::parse(s).map_err(|e| format!("invalid timeout {:?}: {}", s, e))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("warning: logging not initialized: {}", err);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Import(args) => import(args).await,
        Command::Convert(args) => match convert(&args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("error: {:#}", err);
                ExitCode::from(1)
            }
        },
    }
}

async fn import(args: ImportArgs) -> ExitCode {
    let auth = Auth::from_parts(args.wp_token, args.wp_username, args.wp_password);
    let builder = ImporterBuilder::new()
        .wp_base(args.wp_base)
        .auth(auth)
        .per_page(args.per_page)
        .limit(args.limit)
        .status(args.status)
        .work_dir(&args.work_dir)
        .media_map_file((!args.no_media_map).then(|| DEFAULT_MEDIA_MAP_FILE.to_string()))
        .persist_maps(!args.dry_run)
        .timeout(args.timeout);

    let http = match builder.options().http_client() {
        Ok(http) => http,
        Err(err) => {
            eprintln!("error: {}", err);
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    let builder = builder.http_client(http.clone());

    let result = match args.payload_url.filter(|_| !args.dry_run) {
        Some(payload_url) => match PayloadStore::new(http, &payload_url, args.payload_api_key) {
            Ok(store) => run(builder, store).await,
            Err(err) => {
                eprintln!("error: {}", err);
                return ExitCode::from(EXIT_CONFIG);
            }
        },
        None => {
            tracing::info!("dry run: nothing is written to Payload or the id maps");
            run(builder, MemoryStore::new()).await
        }
    };

    match result {
        Ok(summary) => {
            print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("import aborted: {}", err);
            let log_path = args.work_dir.join(wp2payload_importer::options::DEFAULT_LOG_FILE);
            eprintln!("see {}", log_path.display());
            ExitCode::from(1)
        }
    }
}

async fn run<S: ContentStore>(builder: ImporterBuilder, store: S) -> Result<RunSummary, ImportError> {
    builder.build(store)?.run().await
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Imported {} of {} posts ({} failed)",
        summary.succeeded, summary.total, summary.failed
    );
    if summary.failures_logged > 0 {
        println!(
            "{} failures logged to {}",
            summary.failures_logged,
            summary.log_path.display()
        );
    }
}

fn convert(args: &ConvertArgs) -> Result<()> {
    let html = read_source(&args.file)?;
    let converter = match &args.base_url {
        Some(url) => Converter::new().with_base_url(url)?,
        None => Converter::new(),
    };
    let root = converter.convert_without_media(&html)?;

    if args.text {
        println!("{}", root.plain_text());
    } else if args.compact {
        println!("{}", serde_json::to_string(&root.to_lexical())?);
    } else {
        println!("{}", serde_json::to_string_pretty(&root.to_lexical())?);
    }
    Ok(())
}

fn read_source(file: &str) -> Result<String> {
    if file == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    fs::read_to_string(file).with_context(|| format!("cannot read {}", file))
}
