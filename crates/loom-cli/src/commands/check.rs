use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

pub fn run(dir: &Path) -> Result<(), String> {
    let catalog = super::load_world(dir)?;
    let info = catalog.info();

    println!(
        "  {} '{}' {}",
        "World".bold(),
        info.title,
        format!("(version {})", info.version).dimmed()
    );

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Kind", "Count"]);
    for (kind, count) in catalog.counts_by_kind() {
        table.add_row(vec![kind.to_string(), count.to_string()]);
    }
    println!("{table}");
    println!();
    println!("  All checks passed, {} entities", catalog.entity_count());

    Ok(())
}
