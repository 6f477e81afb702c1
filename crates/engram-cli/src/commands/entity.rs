use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use engram::curator::Curator;

use crate::error::CliResult;
use crate::output::{OutputFormat, content_preview, format_timestamp};

#[derive(Parser)]
pub struct EntityCommand {
    #[clap(help = "Entity name to summarize")]
    pub name: String,

    #[clap(long, default_value = "5", help = "Number of top memories to include")]
    pub top: usize,
}

impl EntityCommand {
    pub async fn execute(&self, curator: &Curator, format: OutputFormat) -> CliResult<()> {
        let summary = curator.generate_entity_summary(&self.name, self.top)?;

        match format {
            OutputFormat::Json => {
                let by_type: serde_json::Map<String, serde_json::Value> = summary
                    .type_histogram
                    .iter()
                    .map(|(memory_type, count)| {
                        (memory_type.to_string(), serde_json::json!(count))
                    })
                    .collect();
                let output = serde_json::json!({
                    "entity": summary.entity,
                    "mentions": summary.mention_count,
                    "first_mention": summary.first_mention.to_rfc3339(),
                    "last_mention": summary.last_mention.to_rfc3339(),
                    "mean_importance": summary.mean_importance,
                    "by_type": by_type,
                    "top_memories": summary.top_memories.iter().map(|m| {
                        serde_json::json!({
                            "id": m.id.to_string(),
                            "type": m.memory_type.to_string(),
                            "content": &m.content,
                            "importance": m.importance,
                            "created_at": m.created_at.to_rfc3339(),
                        })
                    }).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Property", "Value"]);

                table.add_row(["Entity", &summary.entity]);
                table.add_row(["Mentions", &summary.mention_count.to_string()]);
                table.add_row([
                    "First mention",
                    &format_timestamp(&summary.first_mention),
                ]);
                table.add_row(["Last mention", &format_timestamp(&summary.last_mention)]);
                table.add_row([
                    "Mean importance",
                    &format!("{:.2}", summary.mean_importance),
                ]);
                for (memory_type, count) in &summary.type_histogram {
                    table.add_row([
                        &format!("{memory_type} mentions"),
                        &count.to_string(),
                    ]);
                }

                println!("{table}");

                if !summary.top_memories.is_empty() {
                    println!("\nTop memories:");
                    let mut top = Table::new();
                    top.load_preset(UTF8_FULL_CONDENSED)
                        .set_content_arrangement(ContentArrangement::Dynamic)
                        .set_header(["Type", "Content", "Imp", "Created"]);

                    for memory in &summary.top_memories {
                        top.add_row([
                            memory.memory_type.to_string(),
                            content_preview(&memory.content, 50),
                            memory.importance.to_string(),
                            format_timestamp(&memory.created_at),
                        ]);
                    }

                    println!("{top}");
                }
            }
        }

        Ok(())
    }
}
