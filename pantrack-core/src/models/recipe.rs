use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::de::{self, NumberOrText};
use super::ingredient::Ingredient;
use crate::store::Record;

/// Service-assigned recipe identifier.
///
/// The `recipes` table may key on a uuid or a bigint; both are carried as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecipeId(String);

impl RecipeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecipeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for RecipeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match NumberOrText::deserialize(deserializer)? {
            NumberOrText::Int(n) => Ok(Self(n.to_string())),
            NumberOrText::Float(n) => Ok(Self(n.to_string())),
            NumberOrText::Text(s) => Ok(Self(s)),
        }
    }
}

/// A row of the `recipes` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub id: RecipeId,
    pub user_id: String,
    pub name: String,
    #[serde(default, deserialize_with = "de::null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "de::null_as_default")]
    pub ingredients: Vec<Ingredient>,
    #[serde(default, deserialize_with = "de::null_as_default")]
    pub instructions: Vec<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "de::lenient_timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for Recipe {
    type Id = RecipeId;

    fn id(&self) -> &RecipeId {
        &self.id
    }

    fn owner(&self) -> &str {
        &self.user_id
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.len()))?;

        if !self.description.is_empty() {
            writeln!(f, "{}", self.description)?;
        }

        if !self.ingredients.is_empty() {
            writeln!(f, "\nIngredients:")?;
            for ingredient in &self.ingredients {
                writeln!(f, "  - {}", ingredient)?;
            }
        }

        if !self.instructions.is_empty() {
            writeln!(f, "\nInstructions:")?;
            for (i, step) in self.instructions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, step)?;
            }
        }

        Ok(())
    }
}

/// The recipe shape the generation service is asked to produce.
///
/// All four fields are required; anything else is a malformed response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedRecipe {
    pub name: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
}

impl GeneratedRecipe {
    /// Attaches the owner, producing the insert payload for `recipes`.
    pub fn into_new_recipe(self, user_id: impl Into<String>) -> NewRecipe {
        NewRecipe {
            user_id: user_id.into(),
            name: self.name,
            description: self.description,
            ingredients: self.ingredients,
            instructions: self.instructions,
        }
    }
}

/// Insert payload for the `recipes` table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewRecipe {
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipe_id_from_number_or_text() {
        let id: RecipeId = serde_json::from_str("42").unwrap();
        assert_eq!(id.as_str(), "42");

        let id: RecipeId = serde_json::from_str(r#""5b1e9c2a-0c1d-4c5e-9a53-2f0d3c1e7b11""#).unwrap();
        assert_eq!(id.to_string(), "5b1e9c2a-0c1d-4c5e-9a53-2f0d3c1e7b11");
    }

    #[test]
    fn test_recipe_deserializes_row() {
        let recipe: Recipe = serde_json::from_str(
            r#"{
                "id": 9,
                "user_id": "user1",
                "name": "Omelette",
                "description": "Quick eggs",
                "ingredients": [{"id": 1, "name": "Egg", "quantity": 2, "unit": "each"}],
                "instructions": ["Crack eggs", "Cook"],
                "created_at": "2024-06-01T12:00:00.000000+00:00"
            }"#,
        )
        .unwrap();

        assert_eq!(recipe.id, RecipeId::new("9"));
        assert_eq!(recipe.ingredients[0].id, Some(1));
        assert_eq!(recipe.instructions.len(), 2);
    }

    #[test]
    fn test_generated_recipe_requires_all_fields() {
        let result: Result<GeneratedRecipe, _> =
            serde_json::from_str(r#"{"name":"Toast","description":"Bread","ingredients":[]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_into_new_recipe_attaches_owner() {
        let generated = GeneratedRecipe {
            name: "Toast".to_string(),
            description: "Bread, but warm".to_string(),
            ingredients: vec![Ingredient::new("Bread", 2.0, "slices").with_pantry_id(4)],
            instructions: vec!["Toast the bread".to_string()],
        };

        let new_recipe = generated.clone().into_new_recipe("user1");
        assert_eq!(new_recipe.user_id, "user1");
        assert_eq!(new_recipe.name, generated.name);
        assert_eq!(new_recipe.ingredients, generated.ingredients);
    }

    #[test]
    fn test_recipe_display() {
        let recipe = Recipe {
            id: RecipeId::new("1"),
            user_id: "user1".to_string(),
            name: "Omelette".to_string(),
            description: "Quick eggs".to_string(),
            ingredients: vec![Ingredient::new("Egg", 2.0, "each")],
            instructions: vec!["Crack eggs".to_string(), "Cook".to_string()],
            created_at: None,
        };

        let output = format!("{}", recipe);
        assert!(output.contains("Omelette"));
        assert!(output.contains("2 each Egg"));
        assert!(output.contains("2. Cook"));
    }
}
