mod ingredient;
mod pantry_item;
mod recipe;

pub use ingredient::Ingredient;
pub use pantry_item::{
    all_tags, filter_items, parse_tags, FormError, ItemForm, NewPantryItem, PantryItem,
};
pub use recipe::{GeneratedRecipe, NewRecipe, Recipe, RecipeId};

/// Lenient deserializers for rows coming back from the hosted database.
///
/// Nullable text/array columns arrive as `null`, ids may be numbers or
/// strings, and timestamp columns may or may not carry an offset.
pub(crate) mod de {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    pub(crate) enum NumberOrText {
        Int(i64),
        Float(f64),
        Text(String),
    }

    pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }

    pub(crate) fn lenient_timestamp<'de, D>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.and_then(|s| parse_timestamp(&s)))
    }

    pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        // timestamp columns without a zone are stored as UTC
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::{Datelike, Timelike};

        #[test]
        fn test_parse_timestamp_with_offset() {
            let ts = parse_timestamp("2024-06-01T12:30:00.123456+00:00").unwrap();
            assert_eq!(ts.year(), 2024);
            assert_eq!(ts.hour(), 12);
        }

        #[test]
        fn test_parse_timestamp_without_zone() {
            let ts = parse_timestamp("2024-06-01T12:30:00.5").unwrap();
            assert_eq!(ts.minute(), 30);

            let ts = parse_timestamp("2024-06-01 08:00:00").unwrap();
            assert_eq!(ts.hour(), 8);
        }

        #[test]
        fn test_parse_timestamp_garbage() {
            assert!(parse_timestamp("yesterday").is_none());
        }
    }
}
