//! Gas and contract size reports.
//!
//! Reports are informational and never affect a deployment.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{
    ContentArrangement, Table,
    presets::{ASCII_MARKDOWN, UTF8_FULL},
};

use crate::{
    artifact::{ContractArtifact, MAX_DEPLOYED_SIZE, MAX_INITCODE_SIZE},
    record::DeploymentRecord,
};

const WEI_PER_GWEI: f64 = 1e9;
const WEI_PER_ETH: f64 = 1e18;

fn new_table(no_colors: bool) -> Table {
    let mut table = Table::new();
    table
        .load_preset(if no_colors { ASCII_MARKDOWN } else { UTF8_FULL })
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Gas used by each deployment, with the price paid in gwei and the cost in ether.
pub fn gas_report(records: &[DeploymentRecord], no_colors: bool) -> String {
    let mut table = new_table(no_colors);
    table.set_header(vec!["Contract", "Network", "Gas used", "Gas price (gwei)", "Cost (ETH)"]);

    for record in records {
        let price = record.effective_gas_price as f64;
        let cost = record.gas_used as f64 * price / WEI_PER_ETH;
        table.add_row(vec![
            record.contract.clone(),
            record.network.clone(),
            record.gas_used.to_string(),
            format!("{:.2}", price / WEI_PER_GWEI),
            format!("{:.6}", cost),
        ]);
    }

    table.to_string()
}

/// Runtime and initcode sizes against the EIP-170 and EIP-3860 limits.
///
/// Logs a warning for every contract over a limit.
pub fn size_report(artifacts: &[ContractArtifact], no_colors: bool) -> String {
    let mut table = new_table(no_colors);
    table.set_header(vec!["Contract", "Deployed size (KiB)", "Initcode size (KiB)", ""]);

    for artifact in artifacts {
        let deployed = artifact.deployed_size();
        let initcode = artifact.initcode_size();
        let oversized = deployed > MAX_DEPLOYED_SIZE || initcode > MAX_INITCODE_SIZE;

        if oversized {
            tracing::warn!(
                contract = %artifact.name,
                deployed,
                initcode,
                "Contract exceeds the code size limit and may not be deployable on mainnet"
            );
        }

        table.add_row(vec![
            artifact.name.clone(),
            kib(deployed),
            kib(initcode),
            if oversized { "!".to_string() } else { String::new() },
        ]);
    }

    table.to_string()
}

fn kib(bytes: usize) -> String {
    format!("{:.3}", bytes as f64 / 1024.0)
}

/// Write a report to `output`, or log it when no file is configured.
pub fn emit(title: &str, report: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, format!("{title}\n{report}\n"))
                .with_context(|| format!("Failed to write {} to {}", title, path.display()))?;
            tracing::info!(path = %path.display(), "{} written", title);
        }
        None => tracing::info!("{}\n{}", title, report),
    }
    Ok(())
}
