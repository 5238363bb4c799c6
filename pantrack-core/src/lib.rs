//! Pantrack Core Library
//!
//! Pantry models, the realtime sync store that mirrors the hosted tables,
//! and the recipe generation flow shared by Pantrack front-ends.

pub mod auth;
pub mod data;
pub mod generation;
pub mod models;
pub mod realtime;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{AuthClient, AuthError, Session};
pub use data::{DataError, DataService, Filter, RestClient, Table};
pub use generation::{
    build_prompt, parse_generated, FlowOutcome, FlowState, GeminiClient, GenerationConfig,
    GenerationError, GenerationService, ParseError, RecipeFlow,
};
pub use models::{
    all_tags, filter_items, parse_tags, FormError, GeneratedRecipe, Ingredient, ItemForm,
    NewPantryItem, NewRecipe, PantryItem, Recipe, RecipeId,
};
pub use realtime::{ChangeFeed, ChannelHandle, EventSink, RealtimeClient, RealtimeError};
pub use store::{
    Applied, ChangeEvent, EventError, RawChange, Record, RecordList, StoreError, StoreEvent,
    SyncStore,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
