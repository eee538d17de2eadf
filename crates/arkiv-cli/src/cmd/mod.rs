pub(crate) mod plan;
pub(crate) mod run;

use arkiv_core::reconcile::ActionPlan;

use crate::format::format_bytes;
use crate::table::{add_kv_row, CliTableTheme};

/// Print the plan's headline numbers.
pub(crate) fn print_plan_overview(plan: &ActionPlan, zero_size: usize, unmatched: usize) {
    let theme = CliTableTheme::detect();
    let mut table = theme.new_kv_table();
    add_kv_row(&mut table, theme, "Containers to add", plan.containers_to_create.len());
    add_kv_row(&mut table, theme, "Policies to add", plan.policies_to_create.len());
    add_kv_row(
        &mut table,
        theme,
        "Files to upload",
        format!(
            "{} ({})",
            plan.items_to_transfer.len(),
            format_bytes(plan.transfer_bytes())
        ),
    );
    add_kv_row(&mut table, theme, "Files to attach", plan.attach_count());
    if zero_size > 0 {
        add_kv_row(&mut table, theme, "Zero-size files held back", zero_size);
    }
    if unmatched > 0 {
        add_kv_row(&mut table, theme, "Unmatched source entries", unmatched);
    }
    println!("{table}");
}
