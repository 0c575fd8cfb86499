//! Connection CLI commands
//!
//! Handles: esm connection list/current/show/add/update/delete/switch/test

use clap::{Args, Subcommand};
use esm_core::connection::PASSWORD_MASK;
use esm_core::{
    ConnectionPatch, ConnectionStore, ConnectionSummary, NewConnection, ProbeResult, Protocol,
};

/// Endpoint coordinates and credentials shared by `add` and `test`
#[derive(Args)]
pub struct EndpointArgs {
    /// Cluster host name or address
    #[arg(long)]
    host: String,
    /// Cluster HTTP port
    #[arg(long)]
    port: u16,
    /// http or https
    #[arg(long, default_value = "http")]
    protocol: Protocol,
    /// Username for basic auth
    #[arg(long)]
    username: Option<String>,
    /// Password for basic auth
    #[arg(long)]
    password: Option<String>,
}

/// Connection commands
#[derive(Subcommand)]
pub enum ConnectionCommands {
    /// List all connections
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the current connection
    Current {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a connection's stored settings
    Show {
        /// Connection ID
        id: String,
        /// Include the plaintext password
        #[arg(long)]
        reveal: bool,
    },
    /// Add a connection after testing it
    Add {
        /// Display name
        #[arg(long)]
        name: String,
        /// Connection ID (generated when omitted)
        #[arg(long)]
        id: Option<String>,
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
    /// Update a connection after testing the merged settings
    Update {
        /// Connection ID
        id: String,
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// New cluster host name or address
        #[arg(long)]
        host: Option<String>,
        /// New cluster HTTP port
        #[arg(long)]
        port: Option<u16>,
        /// New protocol (http or https)
        #[arg(long)]
        protocol: Option<Protocol>,
        /// New username (empty string clears it)
        #[arg(long)]
        username: Option<String>,
        /// New password (empty string clears it)
        #[arg(long)]
        password: Option<String>,
    },
    /// Delete a connection (not the current one)
    Delete {
        /// Connection ID
        id: String,
    },
    /// Make a connection the current one
    Switch {
        /// Connection ID
        id: String,
    },
    /// Test a cluster endpoint without saving it
    Test {
        #[command(flatten)]
        endpoint: EndpointArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl EndpointArgs {
    fn into_connection(self, name: String) -> NewConnection {
        NewConnection {
            id: None,
            name,
            host: self.host,
            port: self.port,
            protocol: Some(self.protocol),
            username: self.username,
            password: self.password,
        }
    }
}

/// Execute connection command
pub async fn execute(cmd: ConnectionCommands, store: &mut ConnectionStore) -> anyhow::Result<()> {
    match cmd {
        ConnectionCommands::List { json } => {
            let connections = store.list();
            if json {
                println!("{}", serde_json::to_string_pretty(&connections)?);
            } else if connections.is_empty() {
                println!("No connections found.");
            } else {
                for connection in &connections {
                    print_summary(connection);
                }
            }
        }
        ConnectionCommands::Current { json } => match store.current() {
            Some(current) if json => println!("{}", serde_json::to_string_pretty(&current)?),
            Some(current) => print_summary(&current),
            None if json => println!("null"),
            None => println!("No current connection."),
        },
        ConnectionCommands::Show { id, reveal } => {
            let mut profile = store.details(&id)?;
            if !reveal && profile.password.is_some() {
                profile.password = Some(PASSWORD_MASK.to_string());
            }
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        ConnectionCommands::Add { name, id, endpoint } => {
            let mut input = endpoint.into_connection(name);
            input.id = id;
            let profile = store.add(input).await?;
            println!("Added connection '{}' ({})", profile.name, profile.id);
        }
        ConnectionCommands::Update {
            id,
            name,
            host,
            port,
            protocol,
            username,
            password,
        } => {
            let patch = ConnectionPatch {
                name,
                host,
                port,
                protocol,
                username,
                password,
            };
            if patch.is_empty() {
                anyhow::bail!("Nothing to update, pass at least one field");
            }
            let profile = store.update(&id, patch).await?;
            println!("Updated connection '{}' ({})", profile.name, profile.id);
        }
        ConnectionCommands::Delete { id } => {
            store.delete(&id)?;
            println!("Deleted connection {id}");
        }
        ConnectionCommands::Switch { id } => {
            store.switch_current(&id)?;
            println!("Switched to connection {id}");
        }
        ConnectionCommands::Test { endpoint, json } => {
            let candidate = endpoint.into_connection("test".to_string());
            let result = store.test_connection(&candidate).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            match result {
                ProbeResult::Success { info, .. } => {
                    if !json {
                        println!(
                            "Connection OK: cluster '{}' (version {})",
                            info.cluster_name.as_deref().unwrap_or("unknown"),
                            info.version_number().unwrap_or("unknown")
                        );
                    }
                }
                ProbeResult::Failure { error } => anyhow::bail!("Connection test failed: {error}"),
            }
        }
    }
    Ok(())
}

fn print_summary(connection: &ConnectionSummary) {
    let marker = if connection.is_current { "*" } else { " " };
    let auth = connection
        .username
        .as_deref()
        .map(|u| format!(" as {u}"))
        .unwrap_or_default();
    println!(
        "{marker} {} - {} ({}://{}:{}{auth})",
        connection.id,
        connection.name,
        connection.protocol,
        connection.host,
        connection.port
    );
}
