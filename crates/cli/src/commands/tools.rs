use serde::Serialize;
use sfmcp_core::availability::requires_live_connection;
use sfmcp_core::{OperationDescriptor, OperationName, Registry};

use crate::commands::{load_config, open_org, CommandResult};

#[derive(Debug, Serialize)]
struct ToolEntry<'a> {
    name: &'a str,
    category: &'static str,
    description: &'a str,
    required: &'a [String],
    available: bool,
}

pub fn run(json_output: bool) -> CommandResult {
    let config = match load_config() {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "tools",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    let live = if config.salesforce.has_login_credentials() {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(error) => {
                return CommandResult::failure(
                    "tools",
                    "runtime_init",
                    format!("failed to initialize async runtime: {error}"),
                    1,
                );
            }
        };
        runtime.block_on(async { open_org(&config).await.0.connected() })
    } else {
        false
    };

    CommandResult { exit_code: 0, output: render(Registry::catalog().list(), live, json_output) }
}

/// Full catalog in registry order, each entry marked with whether the current
/// connection state lets it be advertised.
pub fn render(descriptors: &[OperationDescriptor], live: bool, json_output: bool) -> String {
    let entries: Vec<ToolEntry<'_>> = descriptors
        .iter()
        .map(|descriptor| ToolEntry {
            name: &descriptor.name,
            category: descriptor
                .name
                .parse::<OperationName>()
                .map(|operation| operation.category().as_str())
                .unwrap_or("unknown"),
            description: &descriptor.description,
            required: &descriptor.required_arguments,
            available: live || !requires_live_connection(&descriptor.name),
        })
        .collect();

    if json_output {
        return serde_json::to_string_pretty(&entries).unwrap_or_else(|error| {
            format!("{{\"error\":\"tool catalog serialization failed: {error}\"}}")
        });
    }

    let available = entries.iter().filter(|entry| entry.available).count();
    let connection = if live { "connected" } else { "offline" };
    let mut lines =
        vec![format!("{available}/{} operations available ({connection})", entries.len())];
    for entry in &entries {
        let marker = if entry.available { "+" } else { "-" };
        lines.push(format!(
            "[{marker}] {} ({}): {}",
            entry.name, entry.category, entry.description
        ));
        if !entry.required.is_empty() {
            lines.push(format!("      required: {}", entry.required.join(", ")));
        }
    }
    lines.join("\n")
}
