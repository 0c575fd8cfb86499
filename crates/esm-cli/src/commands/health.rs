//! Health CLI command

use esm_core::ConnectionStore;

/// Report connectivity; fails the process when the cluster is unreachable
pub async fn execute(id: Option<&str>, json: bool, store: &mut ConnectionStore) -> anyhow::Result<()> {
    let report = store.check_health(id).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let (Some(health), Some(info)) = (&report.health, &report.info) {
        println!(
            "Connected to '{}' (version {})",
            info.cluster_name.as_deref().unwrap_or("unknown"),
            info.version_number().unwrap_or("unknown")
        );
        if let Some(status) = health.get("status").and_then(|s| s.as_str()) {
            println!("Status: {status}");
        }
    }

    match report.error {
        Some(error) if !report.connected => anyhow::bail!("{error}"),
        _ => Ok(()),
    }
}
