use comfy_table::Cell;

use arkiv_core::commands::plan;
use arkiv_core::config::ArkivConfig;

use crate::format::format_bytes;
use crate::table::CliTableTheme;

pub(crate) fn run(config: &ArkivConfig) -> Result<(), Box<dyn std::error::Error>> {
    let report = plan::run(config, &config.store)?;

    if report.plan.is_empty() {
        println!("Catalog is up to date.");
    } else {
        super::print_plan_overview(&report.plan, report.zero_size.len(), report.unmatched);
    }

    let theme = CliTableTheme::detect();
    if !report.plan.items_to_transfer.is_empty() {
        let mut table = theme.new_data_table(&["Item", "Container", "Size", "Path"]);
        for req in &report.plan.items_to_transfer {
            table.add_row(vec![
                Cell::new(&req.item),
                Cell::new(&req.container),
                Cell::new(format_bytes(req.size)),
                Cell::new(req.path.display()),
            ]);
        }
        println!();
        println!("{table}");
    }

    if !report.plan.items_to_attach.is_empty() {
        let mut table = theme.new_data_table(&["Container", "Item"]);
        for (container, items) in &report.plan.items_to_attach {
            for attach in items {
                table.add_row(vec![Cell::new(container), Cell::new(&attach.item)]);
            }
        }
        println!();
        println!("{table}");
    }

    for path in &report.zero_size {
        eprintln!("Warning: zero-size file held back: {}", path.display());
    }

    Ok(())
}
