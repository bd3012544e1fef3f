//! Settlement Discord command - who owes whom.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, commands::selected_group_or_reply},
        core::report,
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Shows each member's balance and the payments that settle the trip.
    #[poise::command(slash_command, prefix_command)]
    pub async fn settle(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };

        let trip_report =
            report::generate_trip_report(&ctx.data().database, trip.id, Some(0)).await?;

        let mut balances = String::new();
        for member in &trip_report.members {
            writeln!(&mut balances, "{}", report::format_settlement_line(member))?;
        }

        let mut transfers = String::new();
        if trip_report.transfers.is_empty() {
            transfers.push_str("Everyone is settled up! 🎉");
        } else {
            for transfer in &trip_report.transfers {
                writeln!(
                    &mut transfers,
                    "• {}",
                    report::format_transfer_line(&trip_report, transfer)
                )?;
            }
        }

        let embed = serenity::CreateEmbed::default()
            .title(format!("💸 Settlement for {}", trip.name))
            .description(format!(
                "Total spent: ${:.2} of ${:.2}",
                trip_report.totals.total_spent, trip_report.totals.total_budget
            ))
            .color(0x0027_AE60)
            .field("Balances", balances, false)
            .field("Suggested payments", transfers, false);

        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
