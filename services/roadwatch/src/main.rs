//! Roadwatch CLI
//!
//! Command-line interface for the driver monitoring console.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use roadwatch::gateway::ApiGateway;
use roadwatch::io::ReqwestHttpClient;
use roadwatch::models::{DriverRecord, LoginForm, SignupForm};
use roadwatch::{load_config, Config};
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(name = "roadwatch")]
#[command(about = "Driver monitoring console")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Dashboard port (overrides config file)
    #[arg(long, global = true)]
    dashboard_port: Option<u16>,

    /// Log level
    #[arg(short, long, default_value = "info", global = true)]
    log_level: Level,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the console without a credential check
    Run,
    /// Log in as a driver, then run the console
    Login {
        /// Driver id
        #[arg(long)]
        pid: String,
        /// Taxi number
        #[arg(long)]
        taxi: String,
        /// Password
        #[arg(long)]
        password: String,
    },
    /// Log in as an administrator, then run the console
    AdminLogin {
        /// Administrator id
        #[arg(long)]
        pid: String,
        /// Password
        #[arg(long)]
        password: String,
    },
    /// Create a driver account
    Signup {
        #[arg(long)]
        firstname: String,
        #[arg(long)]
        lastname: String,
        /// Driver code
        #[arg(long)]
        code: String,
        #[arg(long)]
        password: String,
    },
    /// Post a driver record to the legacy registration endpoint
    Register {
        #[arg(long)]
        name: String,
        /// Driver code
        #[arg(long)]
        code: String,
        /// Taxi number
        #[arg(long)]
        number: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if let Some(dashboard_port) = args.dashboard_port {
        config.dashboard.port = dashboard_port;
    }

    match args.command.unwrap_or(Command::Run) {
        Command::Run => {
            tracing::info!("Starting roadwatch console");
            roadwatch::run(config).await?;
        }
        Command::Login {
            pid,
            taxi,
            password,
        } => {
            tracing::debug!("Attempting driver login for {}", pid);
            roadwatch::login_and_run(
                config,
                LoginForm {
                    pid,
                    taxi,
                    password,
                },
            )
            .await?;
        }
        Command::AdminLogin { pid, password } => {
            tracing::debug!("Attempting administrator login for {}", pid);
            roadwatch::admin_login_and_run(config, &pid, &password).await?;
        }
        Command::Signup {
            firstname,
            lastname,
            code,
            password,
        } => {
            let gateway = ApiGateway::new(&config.gateway, Arc::new(ReqwestHttpClient::default()));
            gateway
                .signup(&SignupForm {
                    firstname,
                    lastname,
                    code,
                    password,
                })
                .await?;
            println!("Signup accepted");
        }
        Command::Register { name, code, number } => {
            let gateway = ApiGateway::new(&config.gateway, Arc::new(ReqwestHttpClient::default()));
            gateway
                .register_driver(&DriverRecord { name, code, number })
                .await?;
            println!("Driver record submitted");
        }
    }

    Ok(())
}
