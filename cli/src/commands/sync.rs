use anyhow::{Result, bail};
use serde::Serialize;

use shadal_core::models::{CATEGORIES, Upsert};
use shadal_core::reconcile::Reconciler;

use super::helpers::{print_detail, reload_logger};

#[derive(Serialize)]
struct SyncReport {
    category: String,
    refreshed: usize,
    cached: usize,
}

/// Reconcile one category (or all of them) against the server listing and
/// wait for the follow-up fetches of outdated restaurants.
pub(crate) async fn cmd_sync(
    reconciler: &Reconciler,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let categories: Vec<&str> = match category {
        Some(c) => vec![c.trim()],
        None => CATEGORIES.to_vec(),
    };

    let mut reports = Vec::with_capacity(categories.len());
    for category in categories {
        let pending = reconciler.refresh_category(category).await;
        let refreshed = pending.len();
        pending.wait().await;
        reports.push(SyncReport {
            category: category.to_string(),
            refreshed,
            cached: reconciler.store().restaurants_by_category(category).len(),
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for r in &reports {
            println!(
                "{:<16} {:>4} cached, {} refreshed",
                r.category, r.cached, r.refreshed
            );
        }
    }
    Ok(())
}

pub(crate) async fn cmd_refresh(reconciler: &Reconciler, server_id: i64, json: bool) -> Result<()> {
    let store = reconciler.store();
    store
        .notifier()
        .subscribe_detail(server_id, reload_logger("detail"));

    let Some(upsert) = reconciler.refresh_restaurant(server_id).await else {
        bail!("Could not refresh restaurant {server_id}");
    };
    let Some(detail) = store.detail(server_id) else {
        bail!("Restaurant {server_id} vanished after refresh");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        match upsert {
            Upsert::Inserted { .. } => println!("Cached new restaurant {server_id}\n"),
            Upsert::Updated { .. } => println!("Updated restaurant {server_id}\n"),
        }
        print_detail(&detail);
    }
    Ok(())
}
