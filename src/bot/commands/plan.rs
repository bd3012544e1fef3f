//! Plan Discord commands - AI itineraries, the saved-plan library and plan voting.
//!
//! The itinerary a group is working on is cached per group; `/plan save` copies
//! it into the author's personal library, and `/plan propose` puts its budget up
//! for a vote.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            commands::{MESSAGE_BUDGET, fit_message, selected_group_or_reply},
            handlers::autocomplete,
        },
        core::{
            budget, group,
            itinerary::{self, AiTripPlanData, TripRequest},
            library,
            plan::{self, PlanProposal, PlanState, PlanStatus},
            realtime::ChangeKind,
            report,
        },
        errors::{Error, Result},
    };
    use std::fmt::Write;

    /// Parses a saved-plan reference like `#12 Lisbon` or `12`.
    pub(crate) fn parse_plan_ref(value: &str) -> Option<i64> {
        let trimmed = value.trim().trim_start_matches('#');
        let digits: String = trimmed.chars().take_while(char::is_ascii_digit).collect();
        digits.parse().ok()
    }

    /// Renders an itinerary below `heading`, dropping days that don't fit in one message.
    fn render_itinerary(heading: &str, plan: &AiTripPlanData) -> Result<String> {
        let mut out = heading.to_string();
        if !plan.overview.route.is_empty() {
            writeln!(&mut out, "🗺️ **{}**", plan.overview.route)?;
        }
        writeln!(
            &mut out,
            "💰 Estimated total: ${:.2} (lodging ${:.2}, food ${:.2}, activities ${:.2}, transport ${:.2})\n",
            plan.cost_breakdown.total,
            plan.cost_breakdown.accommodation,
            plan.cost_breakdown.food,
            plan.cost_breakdown.activities,
            plan.cost_breakdown.transport
        )?;

        for (shown, day) in plan.days.iter().enumerate() {
            let rendered = report::format_day(day)?;
            if out.len() + rendered.len() > MESSAGE_BUDGET {
                writeln!(&mut out, "_…{} more day(s)_", plan.days.len() - shown)?;
                break;
            }
            writeln!(&mut out, "{rendered}\n")?;
        }
        Ok(fit_message(out))
    }

    fn render_state(state: &PlanState) -> Result<String> {
        let mut out = format!(
            "📜 **Plan #{}** - {}\n💰 Total ${:.2}\n",
            state.plan.id,
            match state.status {
                PlanStatus::Pending => "awaiting approval",
                PlanStatus::Locked => "locked ✅",
            },
            state.plan.total_budget
        );
        for (name, amount) in state.category_budgets()? {
            writeln!(&mut out, "• {name}: ${amount:.2}")?;
        }
        write!(
            &mut out,
            "👍 {}/{} approvals ({} needed)",
            state.approvals.len(),
            state.member_count,
            state.approvals_required()
        )?;
        if state.plan.sync_to_budget {
            out.push_str("\n🔄 Replaces the trip budget once locked");
        }
        Ok(out)
    }

    /// Parent command for itineraries and plans.
    #[poise::command(
        slash_command,
        subcommands(
            "plan_generate",
            "plan_revise",
            "plan_show",
            "plan_save",
            "plan_library",
            "plan_load",
            "plan_delete",
            "plan_propose",
            "plan_approve",
            "plan_status"
        )
    )]
    pub async fn plan(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Plan commands. Available subcommands:\n\
            `/plan generate` - Ask the AI for an itinerary\n\
            `/plan revise` - Ask for changes to the current itinerary\n\
            `/plan show` - Show the current itinerary\n\
            `/plan save` / `/plan library` / `/plan load` / `/plan delete` - Your saved plans\n\
            `/plan propose` - Put the plan's budget up for a vote (leader)\n\
            `/plan approve` - Vote for the proposed plan\n\
            `/plan status` - Show the proposed plan and its votes";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Generates an itinerary for the selected trip.
    #[poise::command(slash_command, rename = "generate")]
    pub async fn plan_generate(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Total budget (defaults to the trip budget)"] budget: Option<f64>,
        #[description = "Interests, comma separated"] interests: Option<String>,
        #[description = "Where you travel from"] origin: Option<String>,
        #[description = "Number of travelers (defaults to the member count)"] travelers: Option<
            u32,
        >,
    ) -> Result<()> {
        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let Some(planner) = data.planner.clone() else {
            ctx.say("🤖 AI features are not configured for this bot.")
                .await?;
            return Ok(());
        };

        ctx.defer().await?;

        let budget_total = match budget {
            Some(total) => total,
            None => budget::get_budget(&data.database, trip.id).await?.total_budget,
        };
        let travelers = match travelers {
            Some(n) => n,
            None => u32::try_from(group::list_members(&data.database, trip.id).await?.len())?,
        };

        let request = TripRequest {
            destination: trip.destination.clone(),
            origin,
            start_date: trip.start_date,
            end_date: trip.end_date,
            budget: budget_total,
            travelers,
            interests: interests
                .as_deref()
                .map(|s| {
                    s.split(',')
                        .map(str::trim)
                        .filter(|i| !i.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        };

        let itinerary = itinerary::generate_itinerary(planner.as_ref(), &request).await?;
        library::cache_current_plan(&data.database, trip.id, &itinerary).await?;

        ctx.say(render_itinerary("", &itinerary)?).await?;
        Ok(())
    }

    /// Asks the AI to change the current itinerary.
    #[poise::command(slash_command, rename = "revise")]
    pub async fn plan_revise(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "What to change"] feedback: String,
    ) -> Result<()> {
        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let Some(planner) = data.planner.clone() else {
            ctx.say("🤖 AI features are not configured for this bot.")
                .await?;
            return Ok(());
        };
        let Some(previous) = library::cached_current_plan(&data.database, trip.id).await? else {
            ctx.say("🗺️ No itinerary yet. Generate one with `/plan generate`.")
                .await?;
            return Ok(());
        };

        ctx.defer().await?;
        let revised = itinerary::regenerate_itinerary(planner.as_ref(), &previous, &feedback).await?;
        library::cache_current_plan(&data.database, trip.id, &revised).await?;

        ctx.say(render_itinerary("", &revised)?).await?;
        Ok(())
    }

    /// Shows the itinerary the trip is working on.
    #[poise::command(slash_command, rename = "show")]
    pub async fn plan_show(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };
        match library::cached_current_plan(&ctx.data().database, trip.id).await? {
            Some(itinerary) => ctx.say(render_itinerary("", &itinerary)?).await?,
            None => {
                ctx.say("🗺️ No itinerary yet. Generate one with `/plan generate`.")
                    .await?
            }
        };
        Ok(())
    }

    /// Saves the current itinerary to your library.
    #[poise::command(slash_command, rename = "save")]
    pub async fn plan_save(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Title (defaults to the route)"] title: Option<String>,
    ) -> Result<()> {
        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };
        let db = &ctx.data().database;
        let Some(itinerary) = library::cached_current_plan(db, trip.id).await? else {
            ctx.say("🗺️ Nothing to save yet. Generate a plan with `/plan generate`.")
                .await?;
            return Ok(());
        };

        let owner_id = ctx.author().id.to_string();
        let saved =
            library::save_plan(db, &owner_id, title.as_deref().unwrap_or_default(), &itinerary)
                .await?;

        ctx.say(format!("💾 Saved **{}** as plan #{}.", saved.title, saved.id))
            .await?;
        Ok(())
    }

    /// Lists your saved plans.
    #[poise::command(slash_command, rename = "library")]
    pub async fn plan_library(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let owner_id = ctx.author().id.to_string();
        let saved = library::list_saved_plans(&ctx.data().database, &owner_id).await?;

        if saved.is_empty() {
            ctx.say("📚 Your library is empty. Save a plan with `/plan save`.")
                .await?;
            return Ok(());
        }

        let mut response = String::from("📚 **Your Saved Plans**\n\n");
        for plan in saved {
            writeln!(
                &mut response,
                "• #{} **{}** - saved {}",
                plan.id,
                plan.title,
                plan.created_at.format("%Y-%m-%d")
            )?;
        }
        ctx.say(fit_message(response)).await?;
        Ok(())
    }

    /// Makes a saved plan the selected trip's current itinerary.
    #[poise::command(slash_command, rename = "load")]
    pub async fn plan_load(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Saved plan"]
        #[autocomplete = "autocomplete::autocomplete_saved_plan"]
        saved_plan: String,
    ) -> Result<()> {
        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };
        let Some(plan_id) = parse_plan_ref(&saved_plan) else {
            ctx.say(format!("❌ '{saved_plan}' is not a saved plan."))
                .await?;
            return Ok(());
        };

        let db = &ctx.data().database;
        let owner_id = ctx.author().id.to_string();
        let (saved, itinerary) = library::get_saved_plan(db, &owner_id, plan_id).await?;
        library::cache_current_plan(db, trip.id, &itinerary).await?;

        let heading = format!("📂 Loaded **{}** into {}.\n\n", saved.title, trip.name);
        ctx.say(render_itinerary(&heading, &itinerary)?).await?;
        Ok(())
    }

    /// Deletes one of your saved plans.
    #[poise::command(slash_command, rename = "delete")]
    pub async fn plan_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Saved plan"]
        #[autocomplete = "autocomplete::autocomplete_saved_plan"]
        saved_plan: String,
    ) -> Result<()> {
        let Some(plan_id) = parse_plan_ref(&saved_plan) else {
            ctx.say(format!("❌ '{saved_plan}' is not a saved plan."))
                .await?;
            return Ok(());
        };

        let owner_id = ctx.author().id.to_string();
        let deleted =
            library::delete_saved_plan(&ctx.data().database, &owner_id, plan_id).await?;

        ctx.say(format!("🗑️ Deleted **{}**.", deleted.title)).await?;
        Ok(())
    }

    /// Puts a plan up for a vote: the current itinerary's costs, or the current budget.
    #[poise::command(slash_command, rename = "propose")]
    pub async fn plan_propose(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Replace the trip budget when locked (default: true)"] sync_to_budget: Option<
            bool,
        >,
        #[description = "Freeze the current budget instead of the itinerary"] from_budget: Option<
            bool,
        >,
    ) -> Result<()> {
        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let actor_id = ctx.author().id.to_string();

        let cached = if from_budget.unwrap_or(false) {
            None
        } else {
            library::cached_current_plan(&data.database, trip.id).await?
        };
        let proposal = match cached {
            Some(itinerary) => {
                PlanProposal::from_itinerary(itinerary, sync_to_budget.unwrap_or(true))?
            }
            None => {
                let view = budget::get_budget(&data.database, trip.id).await?;
                PlanProposal::from_budget(&view)
            }
        };

        let state = plan::propose_plan(&data.database, trip.id, &actor_id, proposal).await?;
        data.feed.notify(trip.id, ChangeKind::FinalizedPlan);

        ctx.say(format!(
            "🗳️ New plan proposed for **{}**! Vote with `/plan approve`.\n\n{}",
            trip.name,
            render_state(&state)?
        ))
        .await?;
        Ok(())
    }

    /// Approves the plan proposed for the selected trip.
    #[poise::command(slash_command, rename = "approve")]
    pub async fn plan_approve(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let Some(current) = plan::current_plan_for_group(&data.database, trip.id).await? else {
            ctx.say("🗳️ Nothing to vote on. The leader can propose with `/plan propose`.")
                .await?;
            return Ok(());
        };

        let user_id = ctx.author().id.to_string();
        let state = plan::approve_plan(&data.database, current.plan.id, &user_id).await?;
        data.feed.notify(trip.id, ChangeKind::FinalizedPlan);

        let headline = if state.status == PlanStatus::Locked {
            if state.plan.sync_to_budget {
                data.feed.notify(trip.id, ChangeKind::Budget);
            }
            "🎉 The plan has a majority and is now locked!"
        } else {
            "👍 Your approval is recorded."
        };

        ctx.say(format!("{headline}\n\n{}", render_state(&state)?))
            .await?;
        Ok(())
    }

    /// Shows the proposed plan and its votes.
    #[poise::command(slash_command, rename = "status")]
    pub async fn plan_status(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };
        let user_id = ctx.author().id.to_string();

        match plan::current_plan_for_group(&ctx.data().database, trip.id).await? {
            Some(state) => {
                let mut response = render_state(&state)?;
                if state.status == PlanStatus::Pending && !state.has_approved(&user_id) {
                    response.push_str("\nYou haven't voted yet: `/plan approve`");
                }
                ctx.say(response).await?;
            }
            None => {
                ctx.say("🗳️ No plan has been proposed for this trip.")
                    .await?;
            }
        }
        Ok(())
    }

}

// Re-export all commands
pub use inner::*;
