use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use engram::curator::{Curator, MemoryFilter, TimeRange};

use crate::error::CliResult;
use crate::output::{OutputFormat, content_preview};

#[derive(Parser)]
pub struct TimelineCommand {
    #[clap(long, short, default_value = "7", help = "Number of days to look back")]
    pub days: i64,

    #[clap(long, short, help = "Filter by memory type (conversation, event, ...)")]
    pub r#type: Option<String>,
}

impl TimelineCommand {
    pub async fn execute(&self, curator: &Curator, format: OutputFormat) -> CliResult<()> {
        let mut filter = MemoryFilter::new();
        if let Some(ref raw) = self.r#type {
            filter = filter.with_memory_types(vec![super::memory::parse_memory_type(raw)?]);
        }

        let range = TimeRange::last_days(self.days);
        let days = curator.generate_timeline(&range, &filter);

        match format {
            OutputFormat::Json => {
                let output: Vec<_> = days
                    .iter()
                    .map(|day| {
                        serde_json::json!({
                            "day": day.day.to_string(),
                            "memories": day.memories.iter().map(|m| {
                                serde_json::json!({
                                    "id": m.id.to_string(),
                                    "type": m.memory_type.to_string(),
                                    "content": &m.content,
                                    "importance": m.importance,
                                    "created_at": m.created_at.to_rfc3339(),
                                })
                            }).collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                if days.is_empty() {
                    println!("No memories in the last {} days.", self.days);
                    return Ok(());
                }

                for day in &days {
                    println!("\n{}", day.day);
                    let mut table = Table::new();
                    table
                        .load_preset(UTF8_FULL_CONDENSED)
                        .set_content_arrangement(ContentArrangement::Dynamic)
                        .set_header(["Time", "Type", "Content", "Imp"]);

                    for memory in &day.memories {
                        table.add_row([
                            memory.created_at.format("%H:%M").to_string(),
                            memory.memory_type.to_string(),
                            content_preview(&memory.content, 50),
                            memory.importance.to_string(),
                        ]);
                    }

                    println!("{table}");
                }
            }
        }

        Ok(())
    }
}
