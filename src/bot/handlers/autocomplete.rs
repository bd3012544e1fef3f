//! Autocomplete handlers for Discord slash command parameters.
//!
//! Suggestions are scoped to the caller: categories come from their selected
//! trip's budget and saved plans from their own library.

use crate::{
    bot::BotData,
    core::{budget, library},
    errors::Error,
};

/// Discord autocomplete limit
const MAX_SUGGESTIONS: usize = 25;

fn matching(candidates: impl IntoIterator<Item = String>, partial: &str) -> Vec<String> {
    let partial_lower = partial.to_lowercase();
    let mut matching: Vec<String> = candidates
        .into_iter()
        .filter(|c| c.to_lowercase().contains(&partial_lower))
        .take(MAX_SUGGESTIONS)
        .collect();

    // Sort alphabetically for consistent UX
    matching.sort();
    matching
}

/// Provides autocomplete suggestions for budget categories.
///
/// Uses the categories allocated in the author's selected trip. Before a
/// budget exists it offers the default category templates instead.
pub async fn autocomplete_category(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let data = ctx.data();
    let user_id = ctx.author().id.to_string();

    let allocated = match library::selected_group(&data.database, &user_id).await {
        Ok(Some(group)) => budget::get_budget(&data.database, group.id)
            .await
            .map(|view| view.allocations.into_iter().map(|a| a.name).collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    if allocated.is_empty() {
        let templates = data.categories.categories.iter().map(|t| t.name.clone());
        return matching(templates, partial);
    }
    matching(allocated, partial)
}

/// Provides autocomplete suggestions for the author's saved plans.
///
/// Values look like `#12 Lisbon in June`; the commands parse the ID back out.
pub async fn autocomplete_saved_plan(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let owner_id = ctx.author().id.to_string();

    let Ok(saved) = library::list_saved_plans(&ctx.data().database, &owner_id).await else {
        return Vec::new();
    };

    matching(
        saved.into_iter().map(|p| format!("#{} {}", p.id, p.title)),
        partial,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_filters_case_insensitively_and_sorts() {
        let names = ["Lodging", "Food", "Activities", "Fuel"].map(str::to_string);
        assert_eq!(matching(names, "f"), vec!["Food", "Fuel"]);
    }

    #[test]
    fn test_matching_caps_suggestions() {
        let many = (0..40).map(|i| format!("Category {i}"));
        assert_eq!(matching(many, "").len(), MAX_SUGGESTIONS);
    }
}
