use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use judgebook::config::{Config, StoreKind};
use judgebook::pipeline::RunStatus;
use judgebook::scores::ScoreRow;
use judgebook::store::TabularStore;

const EXIT_SUCCESS: i32 = 0;
const EXIT_AUTH: i32 = 1;
const EXIT_STORE: i32 = 2;
const EXIT_PARTIAL: i32 = 3;
const EXIT_CONFIG: i32 = 4;

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Aggregate every class and rewrite score and summary tables (default if no subcommand)
    Process {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print the current cross-class summary table
    Summary {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print a class's score table
    Scores {
        /// Class name as configured, e.g. "Class 4"
        class: String,
    },
    /// List a class's projects and students from its roster
    Roster {
        /// Class name as configured, e.g. "Class 4"
        class: String,
        /// Only this project
        #[arg(long)]
        project: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print the rows a judge has saved for a class
    JudgeScores {
        #[arg(long)]
        class: String,
        #[arg(long)]
        judge: String,
        /// Only rows for this project
        #[arg(long)]
        project: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Append a judge's score rows (JSON array) to their judge table
    Submit {
        #[arg(long)]
        class: String,
        #[arg(long)]
        judge: String,
        /// JSON file holding an array of score rows
        file: PathBuf,
    },
    /// List configured classes
    Classes,
}

#[derive(Parser, Debug)]
#[command(name = "judgebook")]
#[command(about = "Science-fair score aggregation", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/judgebook/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log filter level or directives (overrides --verbose)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let cli = Cli::parse();
    if let Err(e) = judgebook::logging::init_tracing(cli.verbose, cli.log_level.as_deref(), cli.log_json) {
        eprintln!("Failed to initialize logging: {}", e);
    }
    let command = cli.command.unwrap_or(Commands::Process {
        format: OutputFormat::Text,
    });

    let config_path = cli.config.map(PathBuf::from);
    let config = match judgebook::config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    if let Commands::Classes = command {
        let use_colors = judgebook::output::should_use_colors();
        println!("{}", judgebook::output::format_class_list(&config.classes, use_colors));
        std::process::exit(EXIT_SUCCESS);
    }

    let store = open_store(&config);

    let code = match command {
        Commands::Process { format } => process(store.as_ref(), &config, format).await,
        Commands::Summary { format } => summary(store.as_ref(), &config, format).await,
        Commands::Scores { class } => scores(store.as_ref(), &config, &class).await,
        Commands::Roster { class, project, format } => {
            roster(store.as_ref(), &config, &class, project.as_deref(), format).await
        }
        Commands::JudgeScores { class, judge, project, format } => {
            judge_scores(store.as_ref(), &config, &class, &judge, project.as_deref(), format).await
        }
        Commands::Submit { class, judge, file } => submit(store.as_ref(), &config, &class, &judge, &file).await,
        Commands::Classes => EXIT_SUCCESS,
    };
    std::process::exit(code);
}

/// Open the configured store, exiting on missing credentials
fn open_store(config: &Config) -> Box<dyn TabularStore> {
    let token = judgebook::credentials::get_token_from_env();
    if config.store.kind == StoreKind::Sheets && token.is_none() {
        eprintln!(
            "No Google Sheets access token. Set {} to an OAuth access token.",
            judgebook::credentials::ENV_TOKEN_VAR
        );
        std::process::exit(EXIT_AUTH);
    }

    match judgebook::store::open_store(&config.store, token.as_deref()) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to open store: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    }
}

async fn process(store: &dyn TabularStore, config: &Config, format: OutputFormat) -> i32 {
    let report = match judgebook::pipeline::run_aggregation(store, config).await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Aggregation failed: {}", e);
            return EXIT_CONFIG;
        }
    };

    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to encode report: {}", e);
                return EXIT_STORE;
            }
        },
        OutputFormat::Text => {
            let use_colors = judgebook::output::should_use_colors();
            println!("{}", judgebook::output::format_run_report(&report, use_colors));
        }
    }

    if report.summary_error.is_some() {
        return EXIT_STORE;
    }
    match report.status {
        RunStatus::Complete => EXIT_SUCCESS,
        RunStatus::Partial => EXIT_PARTIAL,
        RunStatus::Failed => EXIT_STORE,
    }
}

async fn summary(store: &dyn TabularStore, config: &Config, format: OutputFormat) -> i32 {
    let entries = match judgebook::pipeline::read_summary(store, config).await {
        Ok(e) => e,
        Err(e) => {
            eprintln!("{:#}", e);
            return EXIT_STORE;
        }
    };

    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(&entries) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to encode summary: {}", e);
                return EXIT_STORE;
            }
        },
        OutputFormat::Text => {
            let use_colors = judgebook::output::should_use_colors();
            println!("{}", judgebook::output::format_summary_table(&entries, use_colors));
        }
    }
    EXIT_SUCCESS
}

async fn scores(store: &dyn TabularStore, config: &Config, class: &str) -> i32 {
    match judgebook::pipeline::read_score_table(store, config, class).await {
        Ok(rows) => {
            println!("{}", judgebook::output::format_tsv(&rows));
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("{:#}", e);
            EXIT_STORE
        }
    }
}

async fn roster(
    store: &dyn TabularStore,
    config: &Config,
    class: &str,
    project: Option<&str>,
    format: OutputFormat,
) -> i32 {
    let projects = match judgebook::pipeline::read_roster(store, config, class, project).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{:#}", e);
            return EXIT_STORE;
        }
    };

    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(&projects) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to encode roster: {}", e);
                return EXIT_STORE;
            }
        },
        OutputFormat::Text => {
            let use_colors = judgebook::output::should_use_colors();
            println!("{}", judgebook::output::format_roster(&projects, use_colors));
        }
    }
    EXIT_SUCCESS
}

async fn judge_scores(
    store: &dyn TabularStore,
    config: &Config,
    class: &str,
    judge: &str,
    project: Option<&str>,
    format: OutputFormat,
) -> i32 {
    let rows = match judgebook::pipeline::read_judge_scores(store, config, class, judge, project).await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{:#}", e);
            return EXIT_STORE;
        }
    };

    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(&rows) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to encode judge scores: {}", e);
                return EXIT_STORE;
            }
        },
        OutputFormat::Text => println!("{}", judgebook::output::format_judge_rows(&rows)),
    }
    EXIT_SUCCESS
}

async fn submit(
    store: &dyn TabularStore,
    config: &Config,
    class: &str,
    judge: &str,
    file: &Path,
) -> i32 {
    let rows: Vec<ScoreRow> = match std::fs::read_to_string(file)
        .map_err(anyhow::Error::from)
        .and_then(|text| serde_json::from_str(&text).map_err(anyhow::Error::from))
    {
        Ok(rows) => rows,
        Err(e) => {
            eprintln!("Failed to read score rows from {}: {}", file.display(), e);
            return EXIT_CONFIG;
        }
    };

    match judgebook::pipeline::submit_scores(store, config, class, judge, &rows).await {
        Ok(count) => {
            println!("Appended {} rows for {} in {}", count, judge, class);
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("{:#}", e);
            EXIT_STORE
        }
    }
}
