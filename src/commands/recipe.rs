use clap::{Args, Subcommand};
use pantrack_core::{
    DataService, GenerationConfig, GenerationService, Recipe, RecipeId, SyncStore,
};

use super::{confirm, truncate, OutputFormat};

#[derive(Args)]
pub struct RecipeCommand {
    #[command(subcommand)]
    pub command: RecipeSubcommand,
}

#[derive(Subcommand)]
pub enum RecipeSubcommand {
    /// List saved recipes
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a recipe's details
    Show {
        /// Recipe ID or name
        identifier: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Generate a new recipe from the current pantry and save it
    Generate {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete a recipe
    Delete {
        /// Recipe ID or name
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl RecipeCommand {
    /// Whether running this subcommand needs a generation service.
    pub fn needs_generator(&self) -> bool {
        matches!(self.command, RecipeSubcommand::Generate { .. })
    }

    pub async fn run<D, G>(
        &self,
        store: &mut SyncStore<D>,
        generator: Option<&G>,
        generation: &GenerationConfig,
    ) -> Result<(), Box<dyn std::error::Error>>
    where
        D: DataService,
        G: GenerationService + ?Sized,
    {
        match &self.command {
            RecipeSubcommand::List { format } => {
                let recipes = store.recipes();

                if recipes.is_empty() {
                    println!("No recipes found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(recipes)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<36}  {:<30}  INGREDIENTS", "ID", "NAME");
                        println!("{}", "-".repeat(80));
                        for recipe in recipes {
                            println!(
                                "{:<36}  {:<30}  {}",
                                recipe.id,
                                truncate(&recipe.name, 30),
                                recipe.ingredients.len()
                            );
                        }
                        println!("\nTotal: {} recipe(s)", recipes.len());
                    }
                }
                Ok(())
            }

            RecipeSubcommand::Show { identifier, format } => {
                let recipe = find_recipe(store.recipes(), identifier)
                    .ok_or_else(|| format!("Recipe not found: {}", identifier))?;
                print_recipe(recipe, format)?;
                Ok(())
            }

            RecipeSubcommand::Generate { format } => {
                let generator = generator.ok_or("Recipe generation is not configured")?;

                if store.is_empty() {
                    println!("Your pantry is empty; generating from nothing.");
                }
                println!("Generating recipe from {} item(s)...", store.items().len());

                match store.generate_recipe(generator, generation).await? {
                    Some(recipe) => {
                        println!("Saved recipe:");
                        print_recipe(&recipe, format)?;
                    }
                    None => println!("Recipe saved."),
                }
                Ok(())
            }

            RecipeSubcommand::Delete { identifier, force } => {
                let recipe = find_recipe(store.recipes(), identifier)
                    .cloned()
                    .ok_or_else(|| format!("Recipe not found: {}", identifier))?;

                // Confirm deletion unless --force is used
                if !force && !confirm(&format!("Delete recipe '{}'?", recipe.name))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                store.delete_recipe(&recipe.id).await?;
                println!("Deleted recipe: {}", recipe.name);
                Ok(())
            }
        }
    }
}

/// Looks a recipe up by id first, then by case-insensitive name.
fn find_recipe<'a>(recipes: &'a [Recipe], identifier: &str) -> Option<&'a Recipe> {
    let id = RecipeId::from(identifier);
    recipes
        .iter()
        .find(|r| r.id == id)
        .or_else(|| recipes.iter().find(|r| r.name.eq_ignore_ascii_case(identifier)))
}

fn print_recipe(recipe: &Recipe, format: &OutputFormat) -> serde_json::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(recipe)?),
        OutputFormat::Text => println!("{}", recipe),
    }
    Ok(())
}
