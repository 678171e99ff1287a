// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wagate instance` commands: bridge instance lifecycle from the terminal.

use wagate_config::WagateConfig;
use wagate_core::{MessagingBridge, WagateError};
use wagate_whatsapp::EvolutionBridge;

/// Path the gateway serves bridge webhooks on.
const WEBHOOK_PATH: &str = "/webhooks/evolution";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceOp {
    Create,
    Status,
    Qr,
    Delete,
}

/// Webhook URL registered on create, derived from `gateway.public_url`.
pub fn webhook_url(config: &WagateConfig) -> Option<String> {
    config
        .gateway
        .public_url
        .as_deref()
        .map(|base| format!("{}{WEBHOOK_PATH}", base.trim_end_matches('/')))
}

pub async fn run_instance(
    config: &WagateConfig,
    op: InstanceOp,
    name: Option<&str>,
) -> Result<(), WagateError> {
    let bridge = EvolutionBridge::new(&config.bridge)?;
    let instance = name.unwrap_or(&config.bridge.instance_name);

    match op {
        InstanceOp::Create => {
            let webhook = webhook_url(config);
            if webhook.is_none() {
                eprintln!("warning: gateway.public_url not set; no webhook will be registered");
            }
            let info = bridge.create_instance(instance, webhook.as_deref()).await?;
            println!("instance: {}", info.instance_name);
            if let Some(id) = &info.instance_id {
                println!("id:       {id}");
            }
            println!("status:   {}", info.status);
            if let Some(qr) = &info.qr_code {
                println!("qr:       {qr}");
            }
        }
        InstanceOp::Status => {
            let status = bridge.connection_status(instance).await?;
            println!("{instance}: {status}");
        }
        InstanceOp::Qr => match bridge.qr_code(instance).await? {
            Some(qr) => println!("{qr}"),
            None => println!("{instance}: no QR code available (already paired?)"),
        },
        InstanceOp::Delete => {
            bridge.delete_instance(instance).await?;
            println!("{instance}: deleted");
        }
    }
    Ok(())
}
