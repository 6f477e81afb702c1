use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use engram::curator::{ConsolidationConfig, Consolidator, Curator};

use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct ConsolidateCommand {
    #[clap(long, help = "Absorption window after each anchor, in seconds")]
    pub window_secs: Option<u64>,

    #[clap(long, help = "Minimum entity overlap with the anchor")]
    pub min_shared: Option<usize>,
}

impl ConsolidateCommand {
    pub async fn execute(&self, curator: &mut Curator, format: OutputFormat) -> CliResult<()> {
        let mut config = ConsolidationConfig::default();
        if let Some(window_secs) = self.window_secs {
            config.window_secs = window_secs;
        }
        if let Some(min_shared) = self.min_shared {
            config.min_shared_entities = min_shared;
        }

        let outcome = Consolidator::with_config(curator, config).run().await?;

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "examined": outcome.examined,
                    "groups": outcome.groups,
                    "merged": outcome.merged,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Examined", "Groups", "Merged"]);
                table.add_row([
                    outcome.examined.to_string(),
                    outcome.groups.to_string(),
                    outcome.merged.to_string(),
                ]);
                println!("{table}");

                if outcome.merged == 0 {
                    println!("Nothing to consolidate.");
                }
            }
        }

        Ok(())
    }
}
