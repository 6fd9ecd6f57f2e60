use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

use crate::chainhooks::client::{ChainhooksClient, Pagination};
use crate::chainhooks::definition::CreateChainhookParams;
use crate::chainhooks::models::ChainhookEventType;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Chainhook relay - receives and manages Stacks chainhook webhooks",
    long_about = "Chainhook relay verifies signed chainhook deliveries, processes apply and \
                  rollback blocks through application handlers, and manages the chainhooks \
                  registered with the hosted chainhooks API."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the webhook server (default behavior)
    Serve,
    /// Manage registered chainhooks
    Hooks {
        #[command(subcommand)]
        command: HookCommands,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum HookCommands {
    /// List registered chainhooks
    List {
        #[arg(long)]
        limit: Option<u32>,

        #[arg(long)]
        offset: Option<u32>,
    },
    /// Show a chainhook
    Get { uuid: String },
    /// Register a chainhook delivering to this relay
    Register {
        /// Chainhook name
        #[arg(short, long)]
        name: String,

        /// Contract identifier (<address>.<contract-name>)
        #[arg(long)]
        contract_id: Option<String>,

        /// Function name for contract_call filters
        #[arg(short, long)]
        function_name: Option<String>,

        /// Event type (contract_call, contract_deployment, stx_transfer_event, print_event)
        #[arg(short, long, value_parser = parse_event_type)]
        event_type: Option<ChainhookEventType>,

        /// Deliver raw Clarity values instead of decoded ones
        #[arg(long)]
        no_decode: bool,

        /// Register without enabling
        #[arg(long)]
        disabled: bool,
    },
    /// Update a chainhook from a JSON document
    Update {
        uuid: String,

        /// Path to a JSON file with the changes
        #[arg(short, long, conflicts_with = "json")]
        file: Option<PathBuf>,

        /// Inline JSON with the changes
        #[arg(short, long)]
        json: Option<String>,
    },
    /// Delete a chainhook (with confirmation prompt)
    Delete {
        uuid: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Enable a chainhook
    Enable { uuid: String },
    /// Disable a chainhook
    Disable { uuid: String },
    /// Evaluate a chainhook against a past block
    Evaluate {
        uuid: String,

        #[arg(short, long)]
        block_height: u64,
    },
}

fn parse_event_type(value: &str) -> std::result::Result<ChainhookEventType, String> {
    value.parse()
}

pub async fn handle_hook_command(client: &ChainhooksClient, command: HookCommands) -> Result<()> {
    let response = match command {
        HookCommands::List { limit, offset } => {
            client.list(&Pagination { limit, offset }).await?
        }
        HookCommands::Get { uuid } => client.get(&uuid).await?,
        HookCommands::Register {
            name,
            contract_id,
            function_name,
            event_type,
            no_decode,
            disabled,
        } => {
            let params = CreateChainhookParams {
                name,
                contract_id,
                function_name,
                event_type,
                decode_values: Some(!no_decode),
                enable_on_registration: Some(!disabled),
                ..Default::default()
            };
            let registered = client.register(&params).await?;
            println!("Registered chainhook '{}' ({})", params.name, registered.uuid);
            serde_json::to_value(&registered)?
        }
        HookCommands::Update { uuid, file, json } => {
            let changes = read_changes(file, json)?;
            client.update(&uuid, &changes).await?
        }
        HookCommands::Delete { uuid, yes } => {
            if !yes && !confirm(&format!("Are you sure you want to delete chainhook '{uuid}'?"))? {
                println!("Deletion cancelled");
                return Ok(());
            }
            let response = client.delete(&uuid).await?;
            println!("Deleted chainhook '{}'", uuid);
            response
        }
        HookCommands::Enable { uuid } => client.set_enabled(&uuid, true).await?,
        HookCommands::Disable { uuid } => client.set_enabled(&uuid, false).await?,
        HookCommands::Evaluate { uuid, block_height } => {
            client.evaluate(&uuid, block_height).await?
        }
    };

    if !response.is_null() {
        println!("{}", serde_json::to_string_pretty(&response)?);
    }

    Ok(())
}

fn read_changes(file: Option<PathBuf>, json: Option<String>) -> Result<Value> {
    let raw = match (file, json) {
        (Some(path), _) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, Some(json)) => json,
        (None, None) => bail!("Provide the changes with --file or --json"),
    };

    let changes: Value = serde_json::from_str(&raw).context("Changes are not valid JSON")?;
    if !changes.is_object() {
        bail!("Changes must be a JSON object");
    }
    Ok(changes)
}

fn confirm(question: &str) -> Result<bool> {
    println!("{} (y/N): ", question);
    let mut response = String::new();
    std::io::stdin().read_line(&mut response)?;
    Ok(response.trim().eq_ignore_ascii_case("y"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_register_command() {
        let cli = Cli::try_parse_from([
            "chainhook-relay",
            "--config",
            "/etc/relay.yaml",
            "hooks",
            "register",
            "--name",
            "logs",
            "--contract-id",
            "SP1.logger",
            "--event-type",
            "contract_log",
            "--no-decode",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/etc/relay.yaml")));
        match cli.command {
            Some(Commands::Hooks {
                command:
                    HookCommands::Register {
                        name,
                        event_type,
                        no_decode,
                        disabled,
                        ..
                    },
            }) => {
                assert_eq!(name, "logs");
                assert_eq!(event_type, Some(ChainhookEventType::PrintEvent));
                assert!(no_decode);
                assert!(!disabled);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_event_type_rejected() {
        let result = Cli::try_parse_from([
            "chainhook-relay",
            "hooks",
            "register",
            "--name",
            "x",
            "--event-type",
            "nft_mint",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::try_parse_from(["chainhook-relay"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_read_changes() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"name":"renamed"}"#).unwrap();

        let changes = read_changes(Some(file.path().to_path_buf()), None).unwrap();
        assert_eq!(changes["name"], "renamed");

        assert!(read_changes(None, Some("[1,2]".to_string())).is_err());
        assert!(read_changes(None, Some("{oops".to_string())).is_err());
        assert!(read_changes(None, None).is_err());
    }
}
