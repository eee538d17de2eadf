use comfy_table::Cell;

use arkiv_core::commands::run::{self, RunOptions};
use arkiv_core::config::ArkivConfig;
use arkiv_core::report::{AuditLog, RunSummary};

use crate::format::format_bytes;
use crate::table::{add_kv_row, CliTableTheme};

pub(crate) fn run(config: &ArkivConfig, opts: &RunOptions) -> Result<(), Box<dyn std::error::Error>> {
    let (audit, log_path) = AuditLog::create_in(&config.audit_log_dir).map_err(|e| {
        format!(
            "cannot create audit log in {}: {e}",
            config.audit_log_dir.display()
        )
    })?;

    let report = run::run(config, &config.store, &audit, opts)?;

    if report.plan.is_empty() {
        println!("Catalog is up to date.");
    } else {
        super::print_plan_overview(&report.plan, report.zero_size, report.unmatched);
    }

    match &report.summary {
        Some(summary) => print_summary(summary),
        None => println!("Dry run: nothing changed."),
    }
    println!("Audit log: {}", log_path.display());
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let theme = CliTableTheme::detect();
    let mut table = theme.new_kv_table();
    add_kv_row(
        &mut table,
        theme,
        "Uploaded files",
        format!("{} of {}", summary.ok_count, summary.attempted()),
    );
    add_kv_row(
        &mut table,
        theme,
        "Uploaded bytes",
        format!(
            "{} of {}",
            format_bytes(summary.ok_bytes),
            format_bytes(summary.total_bytes)
        ),
    );
    if summary.attach_failures > 0 {
        add_kv_row(&mut table, theme, "Attach failures", summary.attach_failures);
    }
    if summary.provision_failures > 0 {
        add_kv_row(&mut table, theme, "Provision failures", summary.provision_failures);
    }
    println!();
    println!("{table}");

    if !summary.failed.is_empty() {
        let mut failed = theme.new_data_table(&["Failed item", "Path"]);
        for req in &summary.failed {
            failed.add_row(vec![Cell::new(&req.item), Cell::new(req.path.display())]);
        }
        println!();
        println!("{failed}");
        eprintln!(
            "Warning: {} transfer(s) failed; they will be retried on the next run.",
            summary.failed.len()
        );
    }
}
