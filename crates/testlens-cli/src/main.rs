use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, WrapErr};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use testlens_core::index::SearchStatus;
use testlens_core::{CancellationToken, Config, ResultAnalyzer, TestService, TestTree, WorkspaceIndex};

mod serve;

#[derive(Parser)]
#[command(name = "testlens")]
#[command(about = "Discover Java tests and analyze test-runner output", long_about = None)]
struct Cli {
    /// Workspace root directory
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Config file (defaults to <root>/testlens.toml, then the user config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find every test class and method in the workspace
    All,
    /// Find test classes under a folder URI
    Folder {
        /// file:// URI of the folder
        uri: String,
    },
    /// List packages under the test source roots of a folder URI
    Packages {
        /// file:// URI of the folder
        uri: String,
    },
    /// Expand a previously returned node into its test children
    Children {
        /// The node in its JSON wire form
        node: String,
    },
    /// Answer JSON-line commands on stdin until it closes
    Serve,
    /// Fold runner output (read from stdin) into per-test results
    Analyze {
        /// JSON file with the discovered tests that were run
        #[arg(long)]
        tests: PathBuf,
    },
    /// Print the default configuration
    Config,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    // stdout carries JSON and protocol lines; logs go to stderr
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config => {
            print!("{}", Config::default_config_string());
        }
        Commands::Analyze { tests } => {
            analyze(&tests)?;
        }
        Commands::Serve => {
            let service = open_service(&cli.root, cli.config.as_deref())?;
            serve::start_server(Arc::new(service)).await?;
        }
        Commands::All => {
            let service = open_service(&cli.root, cli.config.as_deref())?;
            let found = service.search_all_tests(&CancellationToken::new());
            report_status(&found.status);
            println!("{}", serde_json::to_string_pretty(&found.result)?);
        }
        Commands::Folder { uri } => {
            let service = open_service(&cli.root, cli.config.as_deref())?;
            let found = service.search_tests_in_folder(&[Value::String(uri)], &CancellationToken::new())?;
            report_status(&found.status);
            println!("{}", serde_json::to_string_pretty(&found.result)?);
        }
        Commands::Packages { uri } => {
            let service = open_service(&cli.root, cli.config.as_deref())?;
            let found = service.search_test_packages(&[Value::String(uri)], &CancellationToken::new())?;
            report_status(&found.status);
            println!("{}", serde_json::to_string_pretty(&found.result)?);
        }
        Commands::Children { node } => {
            let service = open_service(&cli.root, cli.config.as_deref())?;
            let found = service.search_test_children(&[Value::String(node)], &CancellationToken::new())?;
            report_status(&found.status);
            println!("{}", serde_json::to_string_pretty(&found.result)?);
        }
    }

    Ok(())
}

fn load_config(root: &Path, path: Option<&Path>) -> color_eyre::Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path).wrap_err_with(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load_from(root).wrap_err("Failed to load config")?,
    };
    config.validate()?;
    Ok(config)
}

fn open_service(root: &Path, config_path: Option<&Path>) -> color_eyre::Result<TestService<WorkspaceIndex>> {
    let config = load_config(root, config_path)?;
    let index = WorkspaceIndex::open(root, &config.workspace)
        .wrap_err_with(|| format!("Failed to index workspace {}", root.display()))?;

    let stats = index.stats();
    tracing::info!(
        projects = stats.projects,
        units = stats.units,
        types = stats.types,
        skipped = stats.skipped_files,
        "workspace ready"
    );

    Ok(TestService::new(index, config.discovery.frameworks))
}

fn report_status(status: &SearchStatus) {
    if let SearchStatus::Failed(e) = status {
        eprintln!("warning: results may be incomplete: {}", e);
    }
}

fn analyze(tests_path: &Path) -> color_eyre::Result<()> {
    let tests = std::fs::read_to_string(tests_path)
        .wrap_err_with(|| format!("Failed to read {}", tests_path.display()))?;
    let tests: TestTree = serde_json::from_str(&tests).wrap_err("Tests file is not a JSON array of test nodes")?;
    if let Err(violation) = tests.validate() {
        bail!("Tests file is not a valid test tree: {}", violation);
    }

    let mut output = String::new();
    std::io::stdin().read_to_string(&mut output)?;

    let mut analyzer = ResultAnalyzer::new();
    analyzer.feed(&output);
    analyzer.finish();

    for error in analyzer.runner_errors() {
        eprintln!("runner error: {}", error);
    }
    if let Some(summary) = analyzer.summary() {
        eprintln!("{}", summary);
    }
    println!("{}", serde_json::to_string_pretty(&analyzer.results_for(&tests))?);
    Ok(())
}
