//! Prompt text in, recipe JSON out.

use thiserror::Error;

use crate::models::{GeneratedRecipe, PantryItem};

const INSTRUCTIONS: &str = r#"Given a list of pantry items, generate a recipe that uses those items in this format(json): Name, Description, ingredients, detailed instructions.
{
  "name": "String", // Name of the recipe
  "description": "String", // Brief description of the recipe
  "ingredients": [
    {
      "id": "Number", // ID of the ingredient from the pantry list
      "name": "String", // Name of the ingredient
      "quantity": "Number", // Quantity of the ingredient
      "unit": "String" // Unit of measurement (e.g., cup, tablespoon, can)
    }
  ],
  "instructions": [
    "String" // Each step of the recipe as a string
  ]
}"#;

/// Builds the generation prompt for `items`.
///
/// Each item is listed on its own line as
/// `{ id: 1, name: 'Egg', description: '', quantity: 2, tags: ["dairy"] }`.
pub fn build_prompt(items: &[PantryItem]) -> String {
    let listing = items
        .iter()
        .map(|item| {
            format!(
                "{{ id: {}, name: '{}', description: '{}', quantity: {}, tags: {} }}",
                item.id,
                item.name,
                item.description,
                item.quantity,
                serde_json::to_string(&item.tags).unwrap_or_else(|_| "[]".to_string())
            )
        })
        .collect::<Vec<_>>()
        .join(",\n");

    format!("{}\n\nItems:\n{}", INSTRUCTIONS, listing)
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("response does not match the recipe shape: {0}")]
    WrongShape(#[source] serde_json::Error),
}

/// Parses generated text into a recipe.
pub fn parse_generated(text: &str) -> Result<GeneratedRecipe, ParseError> {
    let value: serde_json::Value =
        serde_json::from_str(text.trim()).map_err(ParseError::InvalidJson)?;
    serde_json::from_value(value).map_err(ParseError::WrongShape)
}
