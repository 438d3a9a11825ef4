//! ShowLink - Unified serial and UDP control protocol
//!
//! Accepts the same text commands over RS232 and UDP and drives a
//! show-control engine with them.

mod config;
mod dispatch;
mod engine;
mod protocol;
mod service;
mod transport;

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Config;
use dispatch::{Dispatcher, Supervisor};
use protocol::{Message, Opcode};
use service::Service;
use transport::{SerialChannel, UdpChannel};

/// ShowLink - Unified serial and UDP control protocol
#[derive(Parser)]
#[command(name = "showlink")]
#[command(author = "ShowLink Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Drive a show-control engine over RS232 and UDP", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Accept commands on the configured transports
    Serve {
        /// UDP port to listen on
        #[arg(short = 'p', long)]
        udp_port: Option<u16>,

        /// Do not listen for UDP commands
        #[arg(long)]
        no_udp: bool,

        /// Serial device to listen on
        #[arg(short, long)]
        serial: Option<String>,

        /// Serial line speed
        #[arg(short, long)]
        baud: Option<u32>,
    },

    /// Send one command to a running service over UDP
    Send {
        /// Command text, e.g. PC005
        text: String,

        /// Host running the service
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Service UDP port
        #[arg(short, long, default_value_t = protocol::DEFAULT_UDP_PORT)]
        port: u16,

        /// Send even if the command does not validate
        #[arg(long)]
        force: bool,
    },

    /// Validate a command without sending it
    Check {
        /// Command text, e.g. AF003050010
        text: String,
    },

    /// Show current configuration
    Config {
        /// Generate sample configuration
        #[arg(long)]
        generate: bool,

        /// Write the configuration to this path instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show protocol information
    Info,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default().unwrap_or_default()
    };

    // Initialize logging
    let filter = if cli.verbose || config.general.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Serve {
            udp_port,
            no_udp,
            serial,
            baud,
        } => {
            let mut config = config;
            if let Some(port) = udp_port {
                config.udp.port = port;
            }
            if no_udp {
                config.udp.enabled = false;
            }
            if let Some(device) = serial {
                config.serial.enabled = true;
                config.serial.port = device;
            }
            if let Some(baud) = baud {
                config.serial.baud_rate = baud;
            }
            run_service(config).await?;
        }
        Commands::Send {
            text,
            host,
            port,
            force,
        } => {
            send(&text, &host, port, force).await?;
        }
        Commands::Check { text } => {
            let (opcode, params) = Message::new(text.as_str()).validate()?;
            println!("{} ({:?}) {:?}", opcode, opcode, params);
        }
        Commands::Config { generate, output } => {
            let shown = if generate {
                config::sample_config()
            } else {
                config
            };

            if let Some(path) = output {
                shown.save(&path)?;
                println!("Configuration written to: {}", path.display());
            } else {
                println!("{}", toml::to_string_pretty(&shown)?);
            }
        }
        Commands::Info => {
            print_protocol_info();
        }
    }

    Ok(())
}

/// Run the command service until Ctrl+C
async fn run_service(config: Config) -> anyhow::Result<()> {
    let engine = config.show.build_engine();
    tracing::info!(
        "Starting ShowLink '{}' with {} cuelists",
        config.general.name,
        engine.cuelist_count()
    );

    let mut service = Service::new(Supervisor::new(Dispatcher::new(engine)));

    if config.udp.enabled {
        let addr = config.udp.socket_addr()?;
        service = service.with_udp(UdpChannel::bind(addr, config.udp.buffer_size).await?);
    }

    if config.serial.enabled {
        let serial = SerialChannel::open(&config.serial.port, config.serial.baud_rate)?;
        service = service.with_serial(serial);
    }

    println!("\n========================================");
    println!("  ShowLink Running");
    println!("========================================");
    println!("  Name: {}", config.general.name);
    if config.udp.enabled {
        println!("  UDP:  {}:{}", config.udp.bind_address, config.udp.port);
    }
    if config.serial.enabled {
        println!("  RS232: {} @ {}", config.serial.port, config.serial.baud_rate);
    }
    println!("========================================");
    println!("\nPress Ctrl+C to stop.\n");

    service
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
            }
        })
        .await?;

    Ok(())
}

/// Validate and send one command
async fn send(text: &str, host: &str, port: u16, force: bool) -> anyhow::Result<()> {
    match Message::new(text).validate() {
        Ok((opcode, params)) => {
            tracing::debug!("Sending {} {:?}", opcode, params);
        }
        Err(e) if force => {
            tracing::warn!("Sending invalid command anyway: {}", e);
        }
        Err(e) => {
            anyhow::bail!("Refusing to send {:?}: {} (use --force to send anyway)", text, e);
        }
    }

    let target = resolve(host, port)?;
    let sent = transport::send_command(target, text).await?;
    println!("Sent {} bytes to {}", sent, target);

    Ok(())
}

fn resolve(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| anyhow::anyhow!("Could not resolve host: {}", host))
}

/// Print the protocol summary
fn print_protocol_info() {
    println!("ShowLink Protocol");
    println!("=================\n");
    println!("Format: <OPCODE><PARAM>... ; opcode is 2 letters, each parameter 3 digits\n");

    for opcode in Opcode::ALL {
        let example = protocol::compose(opcode, &[1; 3][..opcode.param_count()]);
        println!(
            "  {}  {:<12} {} param(s), {} chars, e.g. {}",
            opcode,
            format!("{:?}", opcode),
            opcode.param_count(),
            opcode.required_len(),
            example
        );
    }

    println!("\nCuelist 0 with ST stops all cuelists.");
    println!("Default UDP Port: {}", protocol::DEFAULT_UDP_PORT);
}
