//! The generate-parse-persist sequence behind "generate recipe".

use std::fmt;

use super::{build_prompt, parse_generated, GenerationConfig, GenerationService};
use crate::data::DataService;
use crate::models::Recipe;
use crate::store::{StoreError, SyncStore};

/// Where a generation run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Requesting,
    Parsing,
    Persisting,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowState::Idle => "idle",
            FlowState::Requesting => "requesting",
            FlowState::Parsing => "parsing",
            FlowState::Persisting => "persisting",
        };
        f.write_str(name)
    }
}

/// How the last run ended. `Failed` carries the stage that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
    Succeeded,
    Failed(FlowState),
}

/// One recipe generation run.
///
/// Every run starts and ends in [`FlowState::Idle`]; nothing is retried.
#[derive(Debug, Clone)]
pub struct RecipeFlow {
    state: FlowState,
    history: Vec<FlowState>,
    outcome: Option<FlowOutcome>,
}

impl Default for RecipeFlow {
    fn default() -> Self {
        Self {
            state: FlowState::Idle,
            history: vec![FlowState::Idle],
            outcome: None,
        }
    }
}

impl RecipeFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Every state visited, in order.
    pub fn history(&self) -> &[FlowState] {
        &self.history
    }

    pub fn outcome(&self) -> Option<FlowOutcome> {
        self.outcome
    }

    /// Generates a recipe from the store's items and saves it.
    ///
    /// A generated recipe that fails to parse or save is discarded.
    pub async fn run<D, G>(
        &mut self,
        store: &mut SyncStore<D>,
        service: &G,
        config: &GenerationConfig,
    ) -> Result<Option<Recipe>, StoreError>
    where
        D: DataService,
        G: GenerationService + ?Sized,
    {
        self.transition(FlowState::Requesting);
        let prompt = build_prompt(store.items());
        let text = match service.generate(&prompt, config).await {
            Ok(text) => text,
            Err(e) => return Err(self.fail(StoreError::Generation(e))),
        };

        self.transition(FlowState::Parsing);
        let generated = parse_generated(&text).map_err(|e| self.fail(StoreError::Parse(e)))?;

        self.transition(FlowState::Persisting);
        let new_recipe = generated.into_new_recipe(store.user_id());
        let created = store
            .insert_recipe(&new_recipe)
            .await
            .map_err(|e| self.fail(StoreError::Persist(e)))?;

        self.outcome = Some(FlowOutcome::Succeeded);
        self.transition(FlowState::Idle);
        tracing::info!(name = %new_recipe.name, "Generated recipe saved");
        Ok(created)
    }

    fn transition(&mut self, next: FlowState) {
        tracing::debug!(from = %self.state, to = %next, "Recipe flow");
        self.state = next;
        self.history.push(next);
    }

    fn fail(&mut self, error: StoreError) -> StoreError {
        let stage = self.state;
        tracing::debug!(stage = %stage, error = %error, "Recipe flow failed");
        self.outcome = Some(FlowOutcome::Failed(stage));
        self.transition(FlowState::Idle);
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Table;
    use crate::models::{Ingredient, RecipeId};
    use crate::testing::{item_row, MemoryData, Op, ScriptedGenerator};
    use serde_json::json;
    use std::sync::Arc;

    const OMELETTE: &str = r#"{
        "name": "Omelette",
        "description": "Quick eggs",
        "ingredients": [{"id": 1, "name": "Egg", "quantity": 2, "unit": "each"}],
        "instructions": ["Crack eggs", "Cook"]
    }"#;

    async fn egg_store() -> (SyncStore<Arc<MemoryData>>, Arc<MemoryData>) {
        let mut egg = item_row(1, "user1", "Egg", 2);
        egg["tags"] = json!(["dairy"]);
        let data = Arc::new(MemoryData::new().with_rows(Table::Pantry, vec![egg]));
        let (store, failures) = SyncStore::initialize(data.clone(), "user1").await;
        assert!(failures.is_empty());
        (store, data)
    }

    #[tokio::test]
    async fn test_prompt_embeds_pantry() {
        let (mut store, _) = egg_store().await;
        let generator = ScriptedGenerator::text(OMELETTE);

        RecipeFlow::new()
            .run(&mut store, &generator, &GenerationConfig::default())
            .await
            .unwrap();

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("id: 1"));
        assert!(prompts[0].contains("name: 'Egg'"));
        assert!(prompts[0].contains("quantity: 2"));
    }

    #[tokio::test]
    async fn test_success_persists_generated_fields() {
        let (mut store, data) = egg_store().await;
        let generator = ScriptedGenerator::text(OMELETTE);
        let mut flow = RecipeFlow::new();

        let recipe = flow
            .run(&mut store, &generator, &GenerationConfig::default())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(recipe.name, "Omelette");
        assert_eq!(recipe.description, "Quick eggs");
        assert_eq!(
            recipe.ingredients,
            vec![Ingredient::new("Egg", 2.0, "each").with_pantry_id(1)]
        );
        assert_eq!(recipe.instructions, vec!["Crack eggs", "Cook"]);

        let rows = data.rows(Table::Recipes);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["user_id"], json!("user1"));
        assert_eq!(rows[0]["name"], json!("Omelette"));
        assert_eq!(store.recipes().len(), 1);

        assert_eq!(flow.outcome(), Some(FlowOutcome::Succeeded));
        assert_eq!(
            flow.history(),
            &[
                FlowState::Idle,
                FlowState::Requesting,
                FlowState::Parsing,
                FlowState::Persisting,
                FlowState::Idle
            ]
        );
    }

    #[tokio::test]
    async fn test_echo_after_generation_is_noop() {
        let (mut store, _) = egg_store().await;
        let generator = ScriptedGenerator::text(OMELETTE);

        let recipe = store
            .generate_recipe(&generator, &GenerationConfig::default())
            .await
            .unwrap()
            .unwrap();

        let echoed = crate::store::StoreEvent::Recipe(crate::store::ChangeEvent::Insert(recipe));
        assert_eq!(store.apply(echoed), crate::store::Applied::Unchanged);
        assert_eq!(store.recipes().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_output_persists_nothing() {
        let (mut store, data) = egg_store().await;
        let generator = ScriptedGenerator::text("Here is a recipe: Omelette");
        let mut flow = RecipeFlow::new();

        let err = flow
            .run(&mut store, &generator, &GenerationConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Parse(_)));
        assert_eq!(flow.outcome(), Some(FlowOutcome::Failed(FlowState::Parsing)));
        assert_eq!(flow.state(), FlowState::Idle);
        assert_eq!(data.calls(Op::Insert), 0);
        assert!(store.recipes().is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure() {
        let (mut store, data) = egg_store().await;
        let generator = ScriptedGenerator::failing(429, "quota exceeded");
        let mut flow = RecipeFlow::new();

        let err = flow
            .run(&mut store, &generator, &GenerationConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Generation(_)));
        assert_eq!(
            flow.outcome(),
            Some(FlowOutcome::Failed(FlowState::Requesting))
        );
        assert_eq!(data.calls(Op::Insert), 0);
    }

    #[tokio::test]
    async fn test_persist_failure_discards_recipe() {
        let (mut store, data) = egg_store().await;
        data.fail(Op::Insert);
        let generator = ScriptedGenerator::text(OMELETTE);
        let mut flow = RecipeFlow::new();

        let err = flow
            .run(&mut store, &generator, &GenerationConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Persist(_)));
        assert_eq!(
            flow.outcome(),
            Some(FlowOutcome::Failed(FlowState::Persisting))
        );
        assert!(store.recipes().is_empty());
        assert!(store.recipe(&RecipeId::new("1")).is_none());
    }

    #[tokio::test]
    async fn test_insert_without_representation() {
        let (mut store, data) = egg_store().await;
        data.set_return_rows(false);
        let generator = ScriptedGenerator::text(OMELETTE);

        let created = store
            .generate_recipe(&generator, &GenerationConfig::default())
            .await
            .unwrap();

        assert!(created.is_none());
        assert!(store.recipes().is_empty());
        assert_eq!(data.rows(Table::Recipes).len(), 1);
    }
}
