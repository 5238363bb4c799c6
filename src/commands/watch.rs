//! Live view of pantry and recipe changes.

use pantrack_core::{
    ChangeEvent, ChangeFeed, DataService, RealtimeClient, StoreEvent, SyncStore, Table,
};

use super::connect;
use crate::config::Config;

/// Subscribes to both tables and prints every change until Ctrl-C.
pub async fn watch(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut connection = connect(config).await?;
    let (url, anon_key) = config.backend()?;
    let feed = RealtimeClient::new(
        url.to_string(),
        anon_key.to_string(),
        connection.session.access_token.clone(),
    );

    let result = follow(&mut connection.store, &feed).await;
    connection.store.teardown().await;
    result
}

async fn follow<D, F>(
    store: &mut SyncStore<D>,
    feed: &F,
) -> Result<(), Box<dyn std::error::Error>>
where
    D: DataService,
    F: ChangeFeed + ?Sized,
{
    for table in Table::ALL {
        store.subscribe(feed, table).await?;
    }

    println!(
        "Watching {} item(s) and {} recipe(s). Press Ctrl-C to stop.",
        store.items().len(),
        store.recipes().len()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Ok(());
            }
            event = store.next_event() => {
                let Some(event) = event else {
                    return Ok(());
                };
                let line = describe(&event);
                if store.apply(event).changed() {
                    if let Some(line) = line {
                        println!("{}", line);
                    }
                }
                if Table::ALL.iter().all(|t| !store.is_subscribed(*t)) {
                    return Err("All change channels closed".into());
                }
            }
        }
    }
}

/// One-line summary of a change, or `None` for channel notices.
fn describe(event: &StoreEvent) -> Option<String> {
    match event {
        StoreEvent::Item(ChangeEvent::Insert(item)) => {
            Some(format!("+ item {} '{}' (qty {})", item.id, item.name, item.quantity))
        }
        StoreEvent::Item(ChangeEvent::Update(item)) => {
            Some(format!("~ item {} '{}' (qty {})", item.id, item.name, item.quantity))
        }
        StoreEvent::Item(ChangeEvent::Delete(id)) => Some(format!("- item {}", id)),
        StoreEvent::Recipe(ChangeEvent::Insert(recipe)) => {
            Some(format!("+ recipe {} '{}'", recipe.id, recipe.name))
        }
        StoreEvent::Recipe(ChangeEvent::Update(recipe)) => {
            Some(format!("~ recipe {} '{}'", recipe.id, recipe.name))
        }
        StoreEvent::Recipe(ChangeEvent::Delete(id)) => Some(format!("- recipe {}", id)),
        StoreEvent::ChannelClosed { .. } => None,
    }
}
