//! Backup command handler

use crate::config::KvGuardConfig;
use crate::core::access::PropagationWait;
use crate::core::consent::Consent;
use crate::core::pipeline;
use crate::core::types::BackupReport;
use crate::logging::log_admin_event;
use crate::services::azure::AzureSession;
use serde_json::json;
use std::path::Path;

pub async fn handle_backup(
    config: &KvGuardConfig,
    vault_name: &str,
    target_dir: &Path,
    consent: &dyn Consent,
    use_json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = AzureSession::connect(config).await?;

    if !use_json {
        println!(
            "Backing up vault '{}' to {}...",
            vault_name,
            target_dir.display()
        );
    }

    let wait = PropagationWait {
        poll_interval: config.propagation_poll(),
        deadline: config.propagation_deadline(),
    };

    match pipeline::run_backup(
        &session.arm,
        &session.vault,
        &session.arm,
        &session.identity,
        vault_name,
        target_dir,
        consent,
        wait,
    )
    .await
    {
        Ok(report) => {
            log_admin_event(
                "BACKUP_RUN",
                &format!(
                    "{}: {} secrets, {} certificates, {} failures",
                    vault_name,
                    report.secrets.succeeded,
                    report.certificates.succeeded,
                    report.failures.len()
                ),
                report.is_clean(),
            );
            print_backup_report(&report, use_json);
            Ok(())
        }
        Err(e) => {
            log_admin_event("BACKUP_RUN", &format!("{vault_name}: {e}"), false);
            if use_json {
                println!(
                    "{}",
                    json!({
                        "success": false,
                        "operation": "backup",
                        "vault": vault_name,
                        "error": e.to_string()
                    })
                );
                return Ok(());
            }
            Err(e.into())
        }
    }
}

fn print_backup_report(report: &BackupReport, use_json: bool) {
    if use_json {
        println!(
            "{}",
            json!({
                "success": report.is_clean(),
                "operation": "backup",
                "report": report
            })
        );
        return;
    }

    println!("Backup of vault '{}' finished", report.vault);
    println!(
        "  Secrets:      {} attempted, {} succeeded, {} failed",
        report.secrets.attempted, report.secrets.succeeded, report.secrets.failed
    );
    println!(
        "  Certificates: {} attempted, {} succeeded, {} failed",
        report.certificates.attempted, report.certificates.succeeded, report.certificates.failed
    );
    for failure in &report.listing_failures {
        println!("  Listing {}s failed: {}", failure.kind, failure.cause);
    }
    for failure in &report.failures {
        println!("  Failed: {} - {}", failure.name, failure.cause);
    }
}
