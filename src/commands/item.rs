use clap::{Args, Subcommand};
use pantrack_core::{DataService, ItemForm, PantryItem, SyncStore};

use super::{confirm, truncate, OutputFormat};

#[derive(Args)]
pub struct ItemCommand {
    #[command(subcommand)]
    pub command: ItemSubcommand,
}

#[derive(Subcommand)]
pub enum ItemSubcommand {
    /// List pantry items
    List {
        /// Only items whose name, description or tags contain this text
        #[arg(long, short)]
        search: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add an item to the pantry
    Add {
        /// Name of the item
        name: String,

        /// Short description
        #[arg(long, short)]
        description: Option<String>,

        /// Starting quantity
        #[arg(long, short, default_value_t = 1)]
        quantity: u32,

        /// Comma-separated tags (e.g. "dairy, cold")
        #[arg(long, short)]
        tags: Option<String>,
    },

    /// Increase an item's quantity by one
    Inc {
        /// Item ID
        id: i64,
    },

    /// Decrease an item's quantity by one (stops at zero)
    Dec {
        /// Item ID
        id: i64,
    },

    /// Delete an item
    Delete {
        /// Item ID
        id: i64,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl ItemCommand {
    pub async fn run<D: DataService>(
        &self,
        store: &mut SyncStore<D>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ItemSubcommand::List { search, format } => {
                let items = store.search(search.as_deref().unwrap_or(""));

                if items.is_empty() {
                    if store.is_empty() {
                        println!("Your pantry is empty. Add items with 'pantrack item add'.");
                    } else {
                        println!("No items found");
                    }
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&items)?);
                    }
                    OutputFormat::Text => print_items(&items),
                }
                Ok(())
            }

            ItemSubcommand::Add {
                name,
                description,
                quantity,
                tags,
            } => {
                let mut form = ItemForm::new(name.as_str())
                    .with_quantity(*quantity)
                    .with_description(description.clone().unwrap_or_default())
                    .with_tags(tags.clone().unwrap_or_default());

                let created = store.add_item(&mut form).await?;
                if created.is_empty() {
                    println!("Added item: {}", name.trim());
                }
                for item in &created {
                    println!("Added item:");
                    println!("{}", item);
                }
                Ok(())
            }

            ItemSubcommand::Inc { id } => {
                match store.increment(*id).await? {
                    Some(item) => println!("{}: {}", item.name, item.quantity),
                    None => return Err(format!("Item not found: {}", id).into()),
                }
                Ok(())
            }

            ItemSubcommand::Dec { id } => {
                let Some(current) = store.item(*id).cloned() else {
                    return Err(format!("Item not found: {}", id).into());
                };
                match store.decrement(*id).await? {
                    Some(item) => println!("{}: {}", item.name, item.quantity),
                    None => println!("{} is already at 0", current.name),
                }
                Ok(())
            }

            ItemSubcommand::Delete { id, force } => {
                let Some(item) = store.item(*id).cloned() else {
                    return Err(format!("Item not found: {}", id).into());
                };

                // Confirm deletion unless --force is used
                if !force && !confirm(&format!("Delete item '{}'?", item.name))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                store.delete_item(*id).await?;
                println!("Deleted item: {}", item.name);
                Ok(())
            }
        }
    }
}

fn print_items(items: &[&PantryItem]) {
    println!("{:<8}  {:<30}  {:>5}  TAGS", "ID", "NAME", "QTY");
    println!("{}", "-".repeat(80));
    for item in items {
        println!(
            "{:<8}  {:<30}  {:>5}  {}",
            item.id,
            truncate(&item.name, 30),
            item.quantity,
            item.tags.join(", ")
        );
    }
    println!("\nTotal: {} item(s)", items.len());
}

/// Prints every distinct tag in the pantry.
pub fn print_tags<D: DataService>(
    store: &SyncStore<D>,
    format: &OutputFormat,
) -> serde_json::Result<()> {
    let tags = store.all_tags();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tags)?),
        OutputFormat::Text if tags.is_empty() => println!("No tags found"),
        OutputFormat::Text => {
            for tag in &tags {
                println!("{}", tag);
            }
        }
    }
    Ok(())
}
