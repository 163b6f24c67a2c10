//! sharpgrade CLI: grade C# submissions from the command line.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use sharpgrade_report::ReportFormat;

mod commands;
mod config;

#[derive(Parser)]
#[command(
    name = "sharpgrade",
    version,
    about = "Automated grader for C# submissions"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a source file and write a report
    Grade {
        /// C# source file to grade
        source: PathBuf,

        /// Report file to write (replaced if it exists)
        report: PathBuf,

        /// Test battery TOML (default: built-in FizzBuzz battery)
        #[arg(long)]
        battery: Option<PathBuf>,

        /// Override the battery's namespace
        #[arg(long)]
        namespace: Option<String>,

        /// Override the battery's class name
        #[arg(long = "class")]
        class_name: Option<String>,

        /// Report format: text, json, sarif
        #[arg(long, default_value = "text")]
        format: ReportFormat,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Per-test timeout in seconds (0 disables)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Print the normalized form of a source file
    Normalize {
        /// C# source file
        source: PathBuf,

        /// Test battery TOML supplying the target type
        #[arg(long)]
        battery: Option<PathBuf>,

        /// Override the namespace
        #[arg(long)]
        namespace: Option<String>,

        /// Override the class name
        #[arg(long = "class")]
        class_name: Option<String>,
    },

    /// Validate a test battery TOML file
    Validate {
        /// Path to the battery file
        #[arg(long)]
        battery: PathBuf,
    },

    /// Create starter config and example battery
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sharpgrade=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Grade {
            source,
            report,
            battery,
            namespace,
            class_name,
            format,
            config,
            timeout,
        } => {
            commands::grade::execute(
                source,
                report,
                commands::TargetArgs {
                    battery,
                    namespace,
                    class_name,
                },
                format,
                config,
                timeout,
            )
            .await
        }
        Commands::Normalize {
            source,
            battery,
            namespace,
            class_name,
        } => commands::normalize::execute(
            source,
            commands::TargetArgs {
                battery,
                namespace,
                class_name,
            },
        ),
        Commands::Validate { battery } => commands::validate::execute(battery),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
