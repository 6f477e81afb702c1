use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use engram::curator::{Curator, MemoryFilter, SortOrder};
use engram::memory::types::{Memory, MemoryType};
use uuid::Uuid;

use crate::error::CliResult;
use crate::output::{OutputFormat, content_preview, format_timestamp, truncate_string};

#[derive(Parser)]
pub struct MemoryCommand {
    #[clap(subcommand)]
    pub command: MemorySubcommand,
}

#[derive(Subcommand)]
pub enum MemorySubcommand {
    #[clap(about = "List memories")]
    List(ListArgs),

    #[clap(about = "Show memory details")]
    Show(ShowArgs),

    #[clap(about = "Erase a memory and everything consolidated into it")]
    Erase(EraseArgs),
}

#[derive(Parser)]
pub struct ListArgs {
    #[clap(
        long,
        short,
        default_value = "20",
        help = "Maximum number of memories to display"
    )]
    pub limit: usize,

    #[clap(long, short, help = "Filter by memory type (conversation, event, ...)")]
    pub r#type: Option<String>,

    #[clap(long, help = "Filter to memories tagging this entity")]
    pub entity: Option<String>,

    #[clap(long, help = "Filter to memories from this conversation")]
    pub conversation: Option<String>,

    #[clap(long, help = "Minimum importance (1-5)")]
    pub min_importance: Option<u8>,

    #[clap(long, help = "Sort by importance instead of recency")]
    pub by_importance: bool,

    #[clap(long, help = "Include memories absorbed by consolidation")]
    pub all: bool,
}

#[derive(Parser)]
pub struct ShowArgs {
    #[clap(help = "Memory ID (UUID format)")]
    pub id: String,
}

#[derive(Parser)]
pub struct EraseArgs {
    #[clap(help = "Memory ID to erase (UUID format)")]
    pub id: String,
}

pub(crate) fn parse_memory_type(raw: &str) -> CliResult<MemoryType> {
    match raw {
        "conversation" => Ok(MemoryType::Conversation),
        "preference" => Ok(MemoryType::Preference),
        "event" => Ok(MemoryType::Event),
        "relationship" => Ok(MemoryType::Relationship),
        "achievement" => Ok(MemoryType::Achievement),
        "milestone" => Ok(MemoryType::Milestone),
        other => Err(format!(
            "Unknown memory type: {other}. Use one of conversation, preference, \
             event, relationship, achievement, milestone."
        )
        .into()),
    }
}

fn state_of(memory: &Memory) -> &'static str {
    if memory.removed { "absorbed" } else { "active" }
}

impl MemoryCommand {
    pub async fn execute(&self, curator: &mut Curator, format: OutputFormat) -> CliResult<()> {
        match &self.command {
            MemorySubcommand::List(args) => Self::list(curator, args, format).await,
            MemorySubcommand::Show(args) => Self::show(curator, args, format),
            MemorySubcommand::Erase(args) => Self::erase(curator, args, format).await,
        }
    }

    async fn list(curator: &mut Curator, args: &ListArgs, format: OutputFormat) -> CliResult<()> {
        let mut filter = MemoryFilter::new().with_limit(args.limit);
        if let Some(ref raw) = args.r#type {
            filter = filter.with_memory_types(vec![parse_memory_type(raw)?]);
        }
        if let Some(ref entity) = args.entity {
            filter = filter.with_entity(entity.clone());
        }
        if let Some(ref conversation) = args.conversation {
            filter = filter.with_conversation_id(conversation.clone());
        }
        if let Some(min_importance) = args.min_importance {
            filter = filter.with_min_importance(min_importance);
        }
        if args.by_importance {
            filter = filter.sorted_by(SortOrder::Importance);
        }
        if args.all {
            filter = filter.with_removed();
        }

        let memories = curator.retrieve_memories(&filter).await?;

        match format {
            OutputFormat::Json => {
                let output: Vec<_> = memories
                    .iter()
                    .map(|m| {
                        serde_json::json!({
                            "id": m.id.to_string(),
                            "type": m.memory_type.to_string(),
                            "content": &m.content,
                            "importance": m.importance,
                            "entities": m.entities,
                            "state": state_of(m),
                            "created_at": m.created_at.to_rfc3339(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                if memories.is_empty() {
                    println!("No memories found.");
                    return Ok(());
                }

                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["ID", "Type", "Content", "Imp", "Created", "State"]);

                for memory in &memories {
                    table.add_row([
                        truncate_string(&memory.id.to_string(), 8),
                        memory.memory_type.to_string(),
                        content_preview(&memory.content, 44),
                        memory.importance.to_string(),
                        format_timestamp(&memory.created_at),
                        state_of(memory).to_string(),
                    ]);
                }

                println!("{table}");
                println!("\nTotal: {} memories", memories.len());
            }
        }

        Ok(())
    }

    fn show(curator: &Curator, args: &ShowArgs, format: OutputFormat) -> CliResult<()> {
        let id = Uuid::parse_str(&args.id).map_err(|e| format!("Invalid UUID format: {e}"))?;

        let memory = curator
            .get(id)
            .ok_or_else(|| format!("Memory not found: {}", args.id))?;

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "id": memory.id.to_string(),
                    "type": memory.memory_type.to_string(),
                    "content": &memory.content,
                    "importance": memory.importance,
                    "entities": memory.entities,
                    "source": format!("{:?}", memory.source),
                    "conversation_id": memory.conversation_id,
                    "created_at": memory.created_at.to_rfc3339(),
                    "last_accessed": memory.last_accessed.to_rfc3339(),
                    "access_count": memory.access_count,
                    "state": state_of(memory),
                    "consolidated_into": memory.consolidated_into.map(|id| id.to_string()),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Property", "Value"]);

                let entities: Vec<&str> = memory.entities.iter().map(String::as_str).collect();
                table.add_row(["ID", &memory.id.to_string()]);
                table.add_row(["Type", &memory.memory_type.to_string()]);
                table.add_row(["Content", &memory.content.to_string()]);
                table.add_row(["Importance", &memory.importance.to_string()]);
                table.add_row(["Entities", &entities.join(", ")]);
                table.add_row(["Source", &format!("{:?}", memory.source)]);
                table.add_row([
                    "Conversation ID",
                    memory.conversation_id.as_deref().unwrap_or("-"),
                ]);
                table.add_row(["Created", &memory.created_at.to_rfc3339()]);
                table.add_row(["Last Accessed", &memory.last_accessed.to_rfc3339()]);
                table.add_row(["Access Count", &memory.access_count.to_string()]);
                table.add_row(["State", state_of(memory)]);
                if let Some(anchor) = memory.consolidated_into {
                    table.add_row(["Consolidated Into", &anchor.to_string()]);
                }

                println!("{table}");
            }
        }

        Ok(())
    }

    async fn erase(curator: &mut Curator, args: &EraseArgs, format: OutputFormat) -> CliResult<()> {
        let id = Uuid::parse_str(&args.id).map_err(|e| format!("Invalid UUID format: {e}"))?;

        curator.erase_memory(id).await?;

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "id": args.id,
                    "erased": true,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                println!("Erased memory {}", args.id);
            }
        }

        Ok(())
    }
}
