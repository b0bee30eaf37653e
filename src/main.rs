use clap::{Parser, Subcommand};
use ngxtail::cli::parse::{OutputFormat, ParseOptions};
use ngxtail::source::LogRole;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ngxtail")]
#[command(about = "NGINX log tailing and parsing service", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Run,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Parse a log file once and print the records
    Parse {
        file: PathBuf,

        /// access or error; inferred from the file name by default
        #[arg(long = "type")]
        role: Option<LogRole>,

        /// NGINX log_format string for access logs
        #[arg(long)]
        format: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        output: OutputFormat,

        /// Print user agent counts to stderr
        #[arg(long)]
        summary: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Init {
        #[arg(long)]
        stdout: bool,
    },
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ngxtail=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = ngxtail::config::resolve_config_path(cli.config.as_deref());

    match cli.command {
        Some(Commands::Run) | None => {
            ngxtail::cli::run::run(config_path).await?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { stdout } => {
                ngxtail::cli::config::init(stdout)?;
            }
            ConfigAction::Validate => {
                ngxtail::cli::config::validate(config_path)?;
            }
        },
        Some(Commands::Parse {
            file,
            role,
            format,
            output,
            summary,
        }) => {
            // A configured access format applies unless one is given here.
            let format = match format {
                Some(format) => Some(format),
                None => config_path
                    .as_deref()
                    .and_then(|path| ngxtail::config::load_config(path).ok())
                    .and_then(|config| config.parsing.access_format),
            };

            let options = ParseOptions {
                role,
                format,
                output,
                summary,
            };
            ngxtail::cli::parse::run(&file, &options).await?;
        }
    }

    Ok(())
}
