//! Catalog commands. Both require a signed-in session.
//!
//! # Usage
//!
//! ```bash
//! itemdeck items list
//! itemdeck items show 3
//! ```

use std::io::Write;

use itemdeck_client::state::AppState;
use itemdeck_core::{Item, ItemId};

use super::{CliError, require_user, write_json};

/// Longest title shown in the list view.
const TITLE_WIDTH: usize = 48;

/// Fetch and print the item feed.
pub async fn list(state: &AppState, json: bool) -> Result<(), CliError> {
    require_user(state)?;
    let page = state.catalog().fetch_items().await?;

    if json {
        return write_json(&page);
    }

    let mut out = std::io::stdout().lock();
    for item in &page.items {
        writeln!(out, "{}", list_row(item))?;
    }
    writeln!(out, "{} items", page.total)?;
    Ok(())
}

/// Fetch and print one item.
pub async fn show(state: &AppState, id: ItemId, json: bool) -> Result<(), CliError> {
    require_user(state)?;
    let item = state.catalog().fetch_item_by_id(id).await?;

    if json {
        return write_json(&item);
    }

    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", item.title)?;
    writeln!(out, "  id:       {}", item.id)?;
    writeln!(out, "  price:    {}", item.price)?;
    writeln!(out, "  category: {}", item.category)?;
    writeln!(
        out,
        "  rating:   {:.1} ({} reviews)",
        item.rating.rate, item.rating.count
    )?;
    writeln!(out, "  image:    {}", item.image)?;
    writeln!(out)?;
    writeln!(out, "{}", item.description)?;
    Ok(())
}

fn list_row(item: &Item) -> String {
    format!(
        "{:>4}  {:>9}  {:<11}  {:.1}  {}",
        item.id.as_i32(),
        item.price.to_string(),
        item.category,
        item.rating.rate,
        truncate(&item.title, TITLE_WIDTH)
    )
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max.saturating_sub(3)).collect();
    short.push_str("...");
    short
}
