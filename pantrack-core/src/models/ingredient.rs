use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

use super::de::NumberOrText;

/// One ingredient line of a generated recipe.
///
/// `id` points back at the pantry item the ingredient was drawn from; the
/// model may omit it for ingredients that are not in the pantry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    #[serde(default, deserialize_with = "deserialize_pantry_ref")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(deserialize_with = "deserialize_quantity")]
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            quantity,
            unit: unit.into(),
        }
    }

    pub fn with_pantry_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.is_empty() {
            write!(f, "{} {}", self.quantity, self.name)
        } else {
            write!(f, "{} {} {}", self.quantity, self.unit, self.name)
        }
    }
}

/// Accepts `1`, `1.0`, `"1"` or `null`. Non-numeric text is treated as no reference.
fn deserialize_pantry_ref<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(match raw {
        Some(NumberOrText::Int(n)) => Some(n),
        Some(NumberOrText::Float(n)) if n.fract() == 0.0 => Some(n as i64),
        Some(NumberOrText::Text(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Accepts `2`, `2.5` or `"2"`; text that is not a number is an error.
fn deserialize_quantity<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Int(n) => Ok(n as f64),
        NumberOrText::Float(n) => Ok(n),
        NumberOrText::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid quantity: {:?}", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingredient_new() {
        let ingredient = Ingredient::new("flour", 2.5, "cups");
        assert_eq!(ingredient.name, "flour");
        assert_eq!(ingredient.quantity, 2.5);
        assert_eq!(ingredient.unit, "cups");
        assert_eq!(ingredient.id, None);
    }

    #[test]
    fn test_ingredient_display() {
        let ingredient = Ingredient::new("flour", 2.5, "cups");
        assert_eq!(format!("{}", ingredient), "2.5 cups flour");
    }

    #[test]
    fn test_ingredient_display_no_unit() {
        let ingredient = Ingredient::new("eggs", 3.0, "");
        assert_eq!(format!("{}", ingredient), "3 eggs");
    }

    #[test]
    fn test_pantry_ref_accepts_numeric_text() {
        let ingredient: Ingredient =
            serde_json::from_str(r#"{"id":"7","name":"Egg","quantity":2,"unit":"each"}"#)
                .unwrap();
        assert_eq!(ingredient.id, Some(7));

        let ingredient: Ingredient =
            serde_json::from_str(r#"{"id":7.0,"name":"Egg","quantity":2,"unit":"each"}"#)
                .unwrap();
        assert_eq!(ingredient.id, Some(7));
    }

    #[test]
    fn test_quantity_accepts_numeric_text() {
        let ingredient: Ingredient =
            serde_json::from_str(r#"{"name":"Egg","quantity":"2","unit":"each"}"#).unwrap();
        assert_eq!(ingredient.quantity, 2.0);

        let ingredient: Ingredient =
            serde_json::from_str(r#"{"name":"Milk","quantity":" 0.5 ","unit":"cup"}"#).unwrap();
        assert_eq!(ingredient.quantity, 0.5);

        let result: Result<Ingredient, _> =
            serde_json::from_str(r#"{"name":"Salt","quantity":"a pinch"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_pantry_ref_missing_or_unusable() {
        let ingredient: Ingredient =
            serde_json::from_str(r#"{"name":"Salt","quantity":1,"unit":"pinch"}"#).unwrap();
        assert_eq!(ingredient.id, None);

        let ingredient: Ingredient =
            serde_json::from_str(r#"{"id":"n/a","name":"Salt","quantity":1}"#).unwrap();
        assert_eq!(ingredient.id, None);
        assert_eq!(ingredient.unit, "");
    }
}
