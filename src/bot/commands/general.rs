//! General Discord commands - ping, help, and other utility commands.
//! This module contains simple commands that don't require database operations.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    ///
    /// Most commands act on the trip you picked with `/trip select`.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**TripBuddy Help**\n\
        Plan a group trip and share its budget.\n\n\
        **Trips**\n\
        • `/trip create <name> <destination> <start> <end>` - Start a trip; you become its leader.\n\
        • `/trip join <id>` / `/trip select <id>` - Join a trip, or switch the trip your commands act on.\n\
        • `/trip info` / `/trip list` - Members and your trips.\n\n\
        **Money**\n\
        • `/budget show` - Spending per category.\n\
        • `/budget set <total>` - Split a total across the default categories (leader).\n\
        • `/expense add <category> <amount> <description>` - Log something you paid for.\n\
        • `/settle` - Who owes whom.\n\n\
        **Planning**\n\
        • `/plan generate` - Ask the AI for an itinerary.\n\
        • `/plan propose` / `/plan approve` - Vote the plan in; a majority locks it.\n\
        • `/plan save` / `/plan library` - Keep itineraries for later.\n\n\
        **Utility**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.\n\n\
        Each command group prints its subcommands when run on its own.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
