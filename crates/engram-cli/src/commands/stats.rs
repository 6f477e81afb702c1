use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use engram::curator::Curator;

use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct StatsCommand {}

impl StatsCommand {
    pub async fn execute(&self, curator: &Curator, format: OutputFormat) -> CliResult<()> {
        let stats = curator.stats();

        match format {
            OutputFormat::Json => {
                let by_type: serde_json::Map<String, serde_json::Value> = stats
                    .by_type
                    .iter()
                    .map(|(memory_type, count)| {
                        (memory_type.to_string(), serde_json::json!(count))
                    })
                    .collect();
                let output = serde_json::json!({
                    "total": stats.total,
                    "active": stats.active,
                    "absorbed": stats.tombstoned,
                    "mean_importance": stats.mean_importance,
                    "by_type": by_type,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Property", "Value"]);

                table.add_row(["Total memories", &stats.total.to_string()]);
                table.add_row(["Active", &stats.active.to_string()]);
                table.add_row(["Absorbed", &stats.tombstoned.to_string()]);
                table.add_row([
                    "Mean importance",
                    &format!("{:.2}", stats.mean_importance),
                ]);
                for (memory_type, count) in &stats.by_type {
                    table.add_row([
                        &format!("{memory_type} memories"),
                        &count.to_string(),
                    ]);
                }

                println!("{table}");
            }
        }

        Ok(())
    }
}
