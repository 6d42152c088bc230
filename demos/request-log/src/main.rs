//! Request log demo
//!
//! Tracks a handful of simulated autocomplete and search calls and prints
//! every folded action in its wire form, then the final state.

use lifecycle_core::environment::SystemClock;
use lifecycle_requests::{
    RequestEnvironment, RequestReducer, RequestState, create_request, remove_request,
    start_created, track, track_as, track_with_timeout,
};
use lifecycle_runtime::{Store, StoreConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "request_log=info,lifecycle_requests=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let env = RequestEnvironment::new(Arc::new(SystemClock));
    let config = StoreConfig::default().with_shutdown_timeout(Duration::from_secs(2));
    let store = Store::with_config(RequestState::new(), RequestReducer::new(), env, config);

    let mut log = store.subscribe_actions();
    let printer = tokio::spawn(async move {
        while let Ok(action) = log.recv().await {
            match serde_json::to_string(&action) {
                Ok(json) => println!("{json}"),
                Err(error) => tracing::warn!(%error, "Could not encode action"),
            }
        }
    });

    println!("=== Request log ===\n");

    // Suggestions for a query, resolved quickly
    let suggestions = track(&store, "AUTOCOMPLETE", async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok::<_, String>(vec!["rust", "rust book", "rustlings"])
    })
    .await?;
    tracing::info!(?suggestions, "Autocomplete resolved");

    // A search that was declared up front, then started under the same id
    let created = create_request("SEARCH").with_payload("rust");
    store.send(created.clone()).await?;
    let results = track_as(&store, start_created(&created), async {
        Ok::<_, String>(serde_json::json!({"items": 25}))
    })
    .await?;
    tracing::info!(%results, "Search resolved");

    // A failing call
    if let Err(error) = track(&store, "VIDEO_DETAILS", async {
        Err::<(), _>("quota exceeded")
    })
    .await
    {
        tracing::warn!(%error, "Video details failed");
    }

    // A call that exceeds its deadline
    if let Err(error) = track_with_timeout(&store, "RELATED", Duration::from_millis(10), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok::<_, String>(())
    })
    .await
    {
        tracing::warn!(%error, "Related videos cancelled");
    }

    // The declared search is no longer needed
    store.send(remove_request(created.id.clone())).await?;

    let snapshot = store.state(|s| serde_json::to_string_pretty(s)).await?;

    store.shutdown_default().await?;
    // Dropping the last store handle closes the log so the printer drains and exits.
    drop(store);
    let _ = printer.await;

    println!("\n=== Final state ===\n{snapshot}");

    Ok(())
}
