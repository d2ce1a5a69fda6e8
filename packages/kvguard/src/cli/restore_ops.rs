//! Restore command handler

use crate::config::KvGuardConfig;
use crate::core::access::PropagationWait;
use crate::core::consent::Consent;
use crate::core::pipeline::{self, RestoreSource};
use crate::core::types::RestoreReport;
use crate::logging::log_admin_event;
use crate::services::azure::AzureSession;
use serde_json::json;

pub async fn handle_restore(
    config: &KvGuardConfig,
    vault_name: &str,
    source: RestoreSource,
    consent: &dyn Consent,
    use_json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = AzureSession::connect(config).await?;

    if !use_json {
        match &source {
            RestoreSource::Directory(dir) => println!(
                "Restoring vault '{}' from {}...",
                vault_name,
                dir.display()
            ),
            RestoreSource::File(file) => println!(
                "Restoring vault '{}' from {}...",
                vault_name,
                file.display()
            ),
        }
    }

    let wait = PropagationWait {
        poll_interval: config.propagation_poll(),
        deadline: config.propagation_deadline(),
    };

    match pipeline::run_restore(
        &session.arm,
        &session.vault,
        &session.arm,
        &session.identity,
        vault_name,
        source,
        consent,
        wait,
    )
    .await
    {
        Ok(report) => {
            log_admin_event(
                "RESTORE_RUN",
                &format!(
                    "{}: {} restored, {} failures",
                    vault_name,
                    report.restored.len(),
                    report.failures.len()
                ),
                report.is_clean(),
            );
            print_restore_report(&report, use_json);
            Ok(())
        }
        Err(e) => {
            log_admin_event("RESTORE_RUN", &format!("{vault_name}: {e}"), false);
            if use_json {
                println!(
                    "{}",
                    json!({
                        "success": false,
                        "operation": "restore",
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

fn print_restore_report(report: &RestoreReport, use_json: bool) {
    if use_json {
        println!(
            "{}",
            json!({
                "success": report.is_clean(),
                "operation": "restore",
                "report": report
            })
        );
        return;
    }

    println!("Restore into vault '{}' finished", report.vault);
    println!(
        "  Secrets:      {} attempted, {} succeeded, {} failed",
        report.secrets.attempted, report.secrets.succeeded, report.secrets.failed
    );
    println!(
        "  Certificates: {} attempted, {} succeeded, {} failed",
        report.certificates.attempted, report.certificates.succeeded, report.certificates.failed
    );
    for name in &report.restored {
        println!("  Restored: {}", name);
    }
    for failure in &report.failures {
        println!("  Failed: {} - {}", failure.name, failure.cause);
    }
}
