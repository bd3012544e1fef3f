//! Trip Discord commands - create, join, select and leave groups.
//!
//! Most other commands act on the group the author selected here.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            commands::{author_name, parse_date, selected_group_or_reply},
        },
        core::{group, library, realtime::ChangeKind},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Parent command for trip groups.
    #[poise::command(
        slash_command,
        subcommands(
            "trip_create",
            "trip_join",
            "trip_select",
            "trip_list",
            "trip_info",
            "trip_leave",
            "trip_kick"
        )
    )]
    pub async fn trip(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Trip commands. Available subcommands:\n\
            `/trip create` - Start a new trip as its leader\n\
            `/trip join` - Join a trip by its ID\n\
            `/trip select` - Choose the trip other commands act on\n\
            `/trip list` - List your trips\n\
            `/trip info` - Show the selected trip and its members\n\
            `/trip leave` - Leave the selected trip\n\
            `/trip kick` - Remove a member (leader only)";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Creates a trip with you as the leader and selects it.
    #[poise::command(slash_command, rename = "create")]
    pub async fn trip_create(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Name of the trip"] name: String,
        #[description = "Where you're going"] destination: String,
        #[description = "First day (YYYY-MM-DD)"] start_date: String,
        #[description = "Last day (YYYY-MM-DD)"] end_date: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let user_id = ctx.author().id.to_string();

        let start = parse_date(&start_date)?;
        let end = parse_date(&end_date)?;

        let trip = group::create_group(
            db,
            name,
            destination,
            start,
            end,
            user_id.clone(),
            author_name(ctx),
        )
        .await?;
        library::select_group(db, &user_id, trip.id).await?;

        ctx.say(format!(
            "✅ Created trip **{}** to {} ({} → {}). Trip ID: **{}**. Others can join with `/trip join {}`.",
            trip.name, trip.destination, trip.start_date, trip.end_date, trip.id, trip.id
        ))
        .await?;
        Ok(())
    }

    /// Joins a trip and selects it.
    #[poise::command(slash_command, rename = "join")]
    pub async fn trip_join(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Trip ID shared by the leader"] trip_id: i64,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let user_id = ctx.author().id.to_string();

        group::add_member(db, trip_id, user_id.clone(), author_name(ctx)).await?;
        let trip = library::select_group(db, &user_id, trip_id).await?;
        ctx.data().feed.notify(trip_id, ChangeKind::Members);

        ctx.say(format!(
            "✅ You joined **{}** to {}!",
            trip.name, trip.destination
        ))
        .await?;
        Ok(())
    }

    /// Chooses the trip other commands act on.
    #[poise::command(slash_command, rename = "select")]
    pub async fn trip_select(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Trip ID"] trip_id: i64,
    ) -> Result<()> {
        let user_id = ctx.author().id.to_string();
        let trip = library::select_group(&ctx.data().database, &user_id, trip_id).await?;

        ctx.say(format!("📌 Now working on **{}**.", trip.name))
            .await?;
        Ok(())
    }

    /// Lists the trips you belong to.
    #[poise::command(slash_command, rename = "list")]
    pub async fn trip_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let db = &ctx.data().database;
        let user_id = ctx.author().id.to_string();

        let trips = group::list_groups_for_user(db, &user_id).await?;
        if trips.is_empty() {
            ctx.say("🧳 You're not in any trip yet. Create one with `/trip create`.")
                .await?;
            return Ok(());
        }

        let selected_id = library::selected_group(db, &user_id)
            .await?
            .map(|g| g.id);

        let mut response = String::from("🧳 **Your Trips**\n\n");
        for trip in trips {
            let marker = if Some(trip.id) == selected_id { "📌" } else { "•" };
            let role = if group::is_leader(&trip, &user_id) {
                " (leader)"
            } else {
                ""
            };
            writeln!(
                &mut response,
                "{marker} **{}** #{} - {} ({} → {}){role}",
                trip.name, trip.id, trip.destination, trip.start_date, trip.end_date
            )?;
        }

        ctx.say(response).await?;
        Ok(())
    }

    /// Shows the selected trip and its members.
    #[poise::command(slash_command, rename = "info")]
    pub async fn trip_info(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };
        let members = group::list_members(&ctx.data().database, trip.id).await?;

        let mut response = format!(
            "🧳 **{}** #{}\n📍 {}\n📅 {} → {}\n\n**Members ({}):**\n",
            trip.name,
            trip.id,
            trip.destination,
            trip.start_date,
            trip.end_date,
            members.len()
        );
        for member in &members {
            let crown = if group::is_leader(&trip, &member.user_id) {
                "👑 "
            } else {
                ""
            };
            writeln!(
                &mut response,
                "• {crown}{} - share ${:.2}, wallet ${:.2}",
                member.display_name, member.budget_share, member.wallet_balance
            )?;
        }

        ctx.say(response).await?;
        Ok(())
    }

    /// Leaves the selected trip.
    #[poise::command(slash_command, rename = "leave")]
    pub async fn trip_leave(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };
        let user_id = ctx.author().id.to_string();

        group::remove_member(&ctx.data().database, trip.id, &user_id, &user_id).await?;
        ctx.data().feed.notify(trip.id, ChangeKind::Members);

        ctx.say(format!("👋 You left **{}**.", trip.name)).await?;
        Ok(())
    }

    /// Removes a member from the selected trip (leader only).
    #[poise::command(slash_command, rename = "kick")]
    pub async fn trip_kick(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Member to remove"] user: serenity::User,
    ) -> Result<()> {
        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };
        let actor_id = ctx.author().id.to_string();

        group::remove_member(
            &ctx.data().database,
            trip.id,
            &actor_id,
            &user.id.to_string(),
        )
        .await?;
        ctx.data().feed.notify(trip.id, ChangeKind::Members);

        ctx.say(format!("✅ Removed {} from **{}**.", user.name, trip.name))
            .await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
