// Interactive commands for a running node

use anyhow::{bail, Result};
use colored::*;
use meshnode_core::MeshNode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Empty,
    Key,
    Status,
    SetRelays { node: String, relays: String },
    GetRelays { node: String },
    Relaying(bool),
    Help,
    Quit,
}

pub fn parse_line(line: &str) -> Result<ReplCommand> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(ReplCommand::Empty);
    };

    let cmd = match (command, parts.next(), parts.next(), parts.next()) {
        ("key", None, _, _) => ReplCommand::Key,
        ("status", None, _, _) => ReplCommand::Status,
        ("help", None, _, _) => ReplCommand::Help,
        ("quit" | "exit", None, _, _) => ReplCommand::Quit,
        ("relays", Some("get"), Some(node), None) => ReplCommand::GetRelays {
            node: node.to_string(),
        },
        ("relays", Some("set"), Some(node), relays) => ReplCommand::SetRelays {
            node: node.to_string(),
            relays: relays.unwrap_or_default().to_string(),
        },
        ("relaying", Some("on"), None, _) => ReplCommand::Relaying(true),
        ("relaying", Some("off"), None, _) => ReplCommand::Relaying(false),
        _ => bail!("Unrecognised command: {} (try 'help')", line.trim()),
    };

    if matches!(cmd, ReplCommand::SetRelays { .. }) && parts.next().is_some() {
        bail!("Usage: relays set <node> <key,key,...>");
    }
    Ok(cmd)
}

/// Run `cmd` against `node` and return the text to print.
pub fn execute(node: &MeshNode, cmd: &ReplCommand) -> String {
    match cmd {
        ReplCommand::Empty | ReplCommand::Quit => String::new(),
        ReplCommand::Key => node
            .public_key()
            .map(|key| key.to_hex())
            .unwrap_or_else(|| "node not running".to_string()),
        ReplCommand::Status => {
            let relay_targets = node.relay_directory().map(|d| d.len()).unwrap_or(0);
            format!(
                "State:         {:?}\nRelaying:      {}\nRelay targets: {}",
                node.state(),
                node.relaying_enabled(),
                relay_targets
            )
        }
        ReplCommand::SetRelays { node: target, relays } => {
            node.set_relay_servers(target, relays);
            let stored = node.get_relay_servers(target);
            let count = if stored.is_empty() {
                0
            } else {
                stored.split(',').count()
            };
            tracing::debug!(node = %target, stored = count, "Relays set from prompt");
            format!("{} {} relay(s) stored", "✓".green(), count)
        }
        ReplCommand::GetRelays { node: target } => {
            let relays = node.get_relay_servers(target);
            if relays.is_empty() {
                "No relays.".to_string()
            } else {
                relays
                    .split(',')
                    .map(|key| format!("  • {}", key))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        ReplCommand::Relaying(enabled) => {
            node.set_relaying_enabled(*enabled);
            format!("{} Relaying {}", "✓".green(), if *enabled { "on" } else { "off" })
        }
        ReplCommand::Help => help_text(),
    }
}

pub fn help_text() -> String {
    [
        format!("  {}                         show public key", "key".bright_green()),
        format!("  {}                      show node status", "status".bright_green()),
        format!("  {} <node> <keys>     replace relays for a node", "relays set".bright_green()),
        format!("  {} <node>            list relays for a node", "relays get".bright_green()),
        format!("  {} on|off              toggle relaying", "relaying".bright_green()),
        format!("  {}                        stop the node", "quit".bright_green()),
    ]
    .join("\n")
}
