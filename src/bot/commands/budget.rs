//! Budget Discord commands - overview, allocations, category locks and member shares.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, commands::selected_group_or_reply, handlers::autocomplete},
        core::{
            budget::{self, AllocationInput},
            group, itinerary,
            realtime::ChangeKind,
            report,
        },
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::collections::HashMap;
    use std::fmt::Write;

    /// Parent command for the trip budget.
    #[poise::command(
        slash_command,
        subcommands(
            "budget_show",
            "budget_set",
            "budget_allocate",
            "budget_remove",
            "budget_lock",
            "budget_unlock",
            "budget_share",
            "budget_wallet",
            "budget_analyze"
        )
    )]
    pub async fn budget(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Budget commands. Available subcommands:\n\
            `/budget show` - Spending per category\n\
            `/budget set` - Set the total and split it across the default categories (leader)\n\
            `/budget allocate` - Set one category's budget (leader)\n\
            `/budget remove` - Remove a category (leader)\n\
            `/budget lock` / `/budget unlock` - Restrict a category to the leader\n\
            `/budget share` - Set a member's budget share\n\
            `/budget wallet` - Record what's left of your share\n\
            `/budget analyze` - Ask the AI for saving tips";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Shows spending per category for the selected trip.
    #[poise::command(slash_command, rename = "show")]
    pub async fn budget_show(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };

        let state = ctx.data().dashboard(trip.id).await?.state().await;
        let categories = state.category_summaries();
        if categories.is_empty() {
            ctx.say("📊 No budget yet. The leader can set one with `/budget set`.")
                .await?;
            return Ok(());
        }

        let fields: Vec<(String, String, bool)> = categories
            .iter()
            .map(|c| {
                let locked = state.allocations.iter().any(|a| a.name == c.name && a.is_locked);
                let lock = if locked { " 🔒" } else { "" };
                (
                    format!("{}{lock}", c.name),
                    report::format_category_line(c),
                    false,
                )
            })
            .collect();

        let totals = state.totals();
        let embed = serenity::CreateEmbed::default()
            .title(format!("📊 {} Budget", trip.name))
            .description(format!(
                "**Spent:** ${:.2} / ${:.2}\n{}\n**Remaining:** {}",
                totals.total_spent,
                totals.total_budget,
                report::format_progress_bar(totals.percent_used, Some(15)),
                report::format_signed_amount(totals.total_remaining)
            ))
            .color(0x0034_98DB)
            .fields(fields)
            .footer(serenity::CreateEmbedFooter::new(format!(
                "{} | {} → {}",
                trip.destination, trip.start_date, trip.end_date
            )));

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }

    /// Sets the total budget and splits it across the default categories.
    #[poise::command(slash_command, rename = "set")]
    pub async fn budget_set(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Total trip budget"] total: f64,
    ) -> Result<()> {
        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let actor_id = ctx.author().id.to_string();

        let allocations = budget::allocations_from_templates(total, &data.categories);
        let view =
            budget::save_allocations(&data.database, trip.id, &actor_id, total, &allocations)
                .await?;
        data.feed.notify(trip.id, ChangeKind::Budget);

        let mut response = format!("✅ Budget for **{}** set to ${total:.2}:\n", trip.name);
        for allocation in &view.allocations {
            writeln!(
                &mut response,
                "• {}: ${:.2}",
                allocation.name, allocation.budgeted
            )?;
        }
        ctx.say(response).await?;
        Ok(())
    }

    /// Sets one category's budget; the total becomes the sum of all categories.
    #[poise::command(slash_command, rename = "allocate")]
    pub async fn budget_allocate(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Category name"]
        #[autocomplete = "autocomplete::autocomplete_category"]
        category: String,
        #[description = "Amount budgeted for the category"] amount: f64,
        #[description = "Display color, e.g. #16a34a"] color: Option<String>,
    ) -> Result<()> {
        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let actor_id = ctx.author().id.to_string();

        let view = budget::get_budget(&data.database, trip.id).await?;
        let mut inputs: Vec<AllocationInput> = view
            .allocations
            .iter()
            .filter(|a| a.name != category.trim())
            .map(|a| AllocationInput {
                name: a.name.clone(),
                budgeted: a.budgeted,
                color: Some(a.color.clone()),
            })
            .collect();
        inputs.push(AllocationInput {
            name: category.trim().to_string(),
            budgeted: amount,
            color,
        });
        let total: f64 = inputs.iter().map(|a| a.budgeted).sum();

        budget::save_allocations(&data.database, trip.id, &actor_id, total, &inputs).await?;
        data.feed.notify(trip.id, ChangeKind::Budget);

        ctx.say(format!(
            "✅ **{}** now has ${amount:.2}. Total budget: ${total:.2}.",
            category.trim()
        ))
        .await?;
        Ok(())
    }

    /// Removes a category; the total shrinks by its budget.
    #[poise::command(slash_command, rename = "remove")]
    pub async fn budget_remove(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Category name"]
        #[autocomplete = "autocomplete::autocomplete_category"]
        category: String,
    ) -> Result<()> {
        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let actor_id = ctx.author().id.to_string();

        let view = budget::get_budget(&data.database, trip.id).await?;
        if view.allocation(&category).is_none() {
            return Err(Error::CategoryNotFound { name: category });
        }

        let inputs: Vec<AllocationInput> = view
            .allocations
            .iter()
            .filter(|a| a.name != category)
            .map(|a| AllocationInput {
                name: a.name.clone(),
                budgeted: a.budgeted,
                color: Some(a.color.clone()),
            })
            .collect();
        let total: f64 = inputs.iter().map(|a| a.budgeted).sum();

        budget::save_allocations(&data.database, trip.id, &actor_id, total, &inputs).await?;
        data.feed.notify(trip.id, ChangeKind::Budget);

        ctx.say(format!(
            "🗑️ Removed **{category}**. Total budget: ${total:.2}."
        ))
        .await?;
        Ok(())
    }

    async fn set_lock(
        ctx: poise::Context<'_, BotData, Error>,
        category: &str,
        locked: bool,
    ) -> Result<()> {
        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let actor_id = ctx.author().id.to_string();

        let dashboard = data.dashboard(trip.id).await?;
        dashboard
            .lock_category_optimistic(&actor_id, category, locked)
            .await?;
        data.feed.notify(trip.id, ChangeKind::Budget);

        let message = if locked {
            format!("🔒 **{category}** is locked. Only the leader can add expenses to it.")
        } else {
            format!("🔓 **{category}** is open to everyone again.")
        };
        ctx.say(message).await?;
        Ok(())
    }

    /// Locks a category so only the leader can add expenses to it.
    #[poise::command(slash_command, rename = "lock")]
    pub async fn budget_lock(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Category name"]
        #[autocomplete = "autocomplete::autocomplete_category"]
        category: String,
    ) -> Result<()> {
        set_lock(ctx, &category, true).await
    }

    /// Unlocks a category for everyone.
    #[poise::command(slash_command, rename = "unlock")]
    pub async fn budget_unlock(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Category name"]
        #[autocomplete = "autocomplete::autocomplete_category"]
        category: String,
    ) -> Result<()> {
        set_lock(ctx, &category, false).await
    }

    /// Sets how much a member commits to the trip. Defaults to yourself.
    #[poise::command(slash_command, rename = "share")]
    pub async fn budget_share(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Committed amount"] amount: f64,
        #[description = "Member (leader only, defaults to you)"] user: Option<serenity::User>,
    ) -> Result<()> {
        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let actor_id = ctx.author().id.to_string();
        let target_id = user.as_ref().map_or_else(|| actor_id.clone(), |u| u.id.to_string());

        let dashboard = data.dashboard(trip.id).await?;
        let updated = dashboard
            .update_shares_optimistic(&actor_id, HashMap::from([(target_id, amount)]))
            .await?;
        data.feed.notify(trip.id, ChangeKind::Members);

        for member in updated {
            ctx.say(format!(
                "✅ {} commits ${:.2} (wallet ${:.2}).",
                member.display_name, member.budget_share, member.wallet_balance
            ))
            .await?;
        }
        Ok(())
    }

    /// Records how much of your share is left in your wallet.
    #[poise::command(slash_command, rename = "wallet")]
    pub async fn budget_wallet(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Amount left"] amount: f64,
    ) -> Result<()> {
        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let user_id = ctx.author().id.to_string();

        let member = group::set_wallet_balance(&data.database, trip.id, &user_id, amount).await?;
        data.feed.notify(trip.id, ChangeKind::Members);

        ctx.say(format!(
            "👛 Wallet set to ${:.2} of your ${:.2} share.",
            member.wallet_balance, member.budget_share
        ))
        .await?;
        Ok(())
    }

    /// Asks the AI where the trip is overspending.
    #[poise::command(slash_command, rename = "analyze")]
    pub async fn budget_analyze(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };
        let Some(planner) = ctx.data().planner.clone() else {
            ctx.say("🤖 AI features are not configured for this bot.")
                .await?;
            return Ok(());
        };

        ctx.defer().await?;
        let dashboard = ctx.data().dashboard(trip.id).await?;
        let state = dashboard.state().await;
        let advice = itinerary::analyze_budget(
            planner.as_ref(),
            &state.totals(),
            &state.category_summaries(),
        )
        .await?;

        ctx.say(format!("🤖 **Budget advice for {}**\n{advice}", trip.name))
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
