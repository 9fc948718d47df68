//! CampuShare CLI
//!
//! Runs the CampuShare server and the tools around it.
//!
//! # Commands
//!
//! - `serve` - Run the HTTP API server
//! - `migrate` - Apply pending schema migrations, or show their status
//! - `create-admin` - Create an administrator account
//! - `inspect` - Display database statistics

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

/// CampuShare course and resource sharing backend.
#[derive(Parser)]
#[command(name = "campushare")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// SQLite database URL
    #[arg(global = true, short, long, env = "CAMPUSHARE_DATABASE_URL")]
    database: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// Number of background workers
        #[arg(long)]
        workers: Option<usize>,

        /// Background queue capacity
        #[arg(long)]
        queue_capacity: Option<usize>,

        /// Token lifetime in seconds
        #[arg(long)]
        token_ttl_secs: Option<u64>,

        /// Allowed CORS origin
        #[arg(long)]
        cors_origin: Option<String>,

        /// Accept a short or missing token secret (development only)
        #[arg(long)]
        dev: bool,
    },

    /// Apply pending schema migrations
    Migrate {
        /// Only show the migration status
        #[arg(short, long)]
        status: bool,
    },

    /// Create an administrator account
    CreateAdmin {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password
        #[arg(short, long, env = "CAMPUSHARE_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,

        /// Display name
        #[arg(short, long)]
        nickname: Option<String>,
    },

    /// Display database statistics
    Inspect {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show version information
    Version,
}

/// Output format of `inspect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve {
            bind,
            workers,
            queue_capacity,
            token_ttl_secs,
            cors_origin,
            dev,
        } => {
            let overrides = commands::serve::Overrides {
                database: cli.database,
                bind,
                workers,
                queue_capacity,
                token_ttl_secs,
                cors_origin,
                dev,
            };
            commands::serve::run(overrides).await?;
        }
        Commands::Migrate { status } => {
            let config = commands::database_config(cli.database);
            commands::migrate::run(&config, status).await?;
        }
        Commands::CreateAdmin {
            username,
            email,
            password,
            nickname,
        } => {
            let config = commands::database_config(cli.database);
            let input = campushare_core::models::NewUser {
                username,
                email,
                password,
                nickname,
            };
            commands::create_admin::run(&config, input).await?;
        }
        Commands::Inspect { format } => {
            let config = commands::database_config(cli.database);
            commands::inspect::run(&config, format).await?;
        }
        Commands::Version => {
            println!("CampuShare CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("CampuShare Core v{}", campushare_core::VERSION);
            println!(
                "Schema version {}",
                campushare_core::migration::latest_version()
            );
        }
    }

    Ok(())
}
