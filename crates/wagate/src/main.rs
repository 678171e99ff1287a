// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wagate - multi-tenant WhatsApp gateway.
//!
//! This is the binary entry point for the gateway.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod instance;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use wagate_config::WagateConfig;

/// Wagate - multi-tenant WhatsApp gateway.
#[derive(Parser, Debug)]
#[command(name = "wagate", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway: webhook intake, bots, and the HTTP API.
    Serve,
    /// Manage the WhatsApp bridge instance.
    Instance {
        #[command(subcommand)]
        action: InstanceCommands,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum InstanceCommands {
    /// Create the instance and point its webhook at this gateway.
    Create {
        /// Instance name (defaults to `bridge.instance_name`).
        name: Option<String>,
    },
    /// Show the connection state of the instance.
    Status { name: Option<String> },
    /// Print the pairing QR code of the instance.
    Qr { name: Option<String> },
    /// Log out and remove the instance.
    Delete { name: Option<String> },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Validate the configuration and print a summary.
    Check,
}

fn load_config(path: Option<&PathBuf>) -> WagateConfig {
    let result = match path {
        Some(path) => wagate_config::load_and_validate_path(path),
        None => wagate_config::load_and_validate(),
    };
    match result {
        Ok(config) => config,
        Err(errors) => {
            wagate_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Instance { action }) => {
            let (op, name) = match action {
                InstanceCommands::Create { name } => (instance::InstanceOp::Create, name),
                InstanceCommands::Status { name } => (instance::InstanceOp::Status, name),
                InstanceCommands::Qr { name } => (instance::InstanceOp::Qr, name),
                InstanceCommands::Delete { name } => (instance::InstanceOp::Delete, name),
            };
            instance::run_instance(&config, op, name.as_deref()).await
        }
        Some(Commands::Config {
            action: ConfigCommands::Check,
        }) => {
            print_config_summary(&config);
            Ok(())
        }
        None => {
            println!("wagate: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn print_config_summary(config: &WagateConfig) {
    println!("configuration OK");
    println!(
        "  service:     {} (tenant {}, bot {})",
        config.service.name, config.service.default_tenant, config.service.default_bot
    );
    println!(
        "  bridge:      {} instance={}{}",
        config.bridge.base_url,
        config.bridge.instance_name,
        if config.bridge.dry_run { " (dry run)" } else { "" }
    );
    println!(
        "  openai:      {} ({})",
        config.openai.model,
        if config.openai.api_key.is_some() {
            "key set"
        } else {
            "no key; assistant disabled"
        }
    );
    println!(
        "  storage:     {} (state: {})",
        config.storage.database_path, config.storage.state_backend
    );
    if config.gateway.enabled {
        println!("  gateway:     {}:{}", config.gateway.host, config.gateway.port);
    } else {
        println!("  gateway:     disabled");
    }
    println!(
        "  reservation: resource={} hold={}ms slot={}min",
        config.reservation.resource_id, config.reservation.hold_ms, config.reservation.slot_minutes
    );
}
