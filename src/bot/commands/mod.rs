//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Budget overview, allocations, locks and member shares
pub mod budget;

/// Expense logging
pub mod expense;

/// General utility commands
pub mod general;

/// AI itineraries, the saved-plan library and finalized plan voting
pub mod plan;

/// Settlement overview
pub mod settle;

/// Group creation, membership and selection
pub mod trip;

// Export commands
pub use budget::*;
pub use expense::*;
pub use general::*;
pub use plan::*;
pub use settle::*;
pub use trip::*;

use crate::{
    bot::BotData,
    core::library,
    entities::trip_group,
    errors::{Error, Result},
};
use chrono::NaiveDate;
use poise::serenity_prelude as serenity;

/// Every command the bot registers.
#[must_use]
pub fn all_commands() -> Vec<poise::Command<BotData, Error>> {
    vec![
        trip(),
        budget(),
        expense(),
        settle(),
        plan(),
        ping(),
        help(),
    ]
}

/// The author's selected group, or a hint reply and `None` if there is none.
pub(crate) async fn selected_group_or_reply(
    ctx: poise::Context<'_, BotData, Error>,
) -> Result<Option<trip_group::Model>> {
    let user_id = ctx.author().id.to_string();
    let selected = library::selected_group(&ctx.data().database, &user_id).await?;
    if selected.is_none() {
        ctx.say("ℹ️ You haven't selected a trip yet. Use `/trip list` and `/trip select`, or `/trip create`.")
            .await?;
    }
    Ok(selected)
}

/// Name shown for the command author.
pub(crate) fn author_name(ctx: poise::Context<'_, BotData, Error>) -> String {
    let author = ctx.author();
    author
        .global_name
        .clone()
        .unwrap_or_else(|| author.name.clone())
}

/// Replies are kept under this many bytes, below Discord's 2000 character limit.
pub(crate) const MESSAGE_BUDGET: usize = 1900;

/// Cuts `text` to [`MESSAGE_BUDGET`] on a character boundary, marking the cut.
pub(crate) fn fit_message(mut text: String) -> String {
    if text.len() > MESSAGE_BUDGET {
        let mut cut = MESSAGE_BUDGET;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push('…');
    }
    text
}

/// Parses a `YYYY-MM-DD` date argument.
pub(crate) fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| Error::Config {
        message: format!("'{value}' is not a date, use YYYY-MM-DD"),
    })
}

/// Extracts user IDs from a list of mentions (`<@123>`, `<@!123>`) or raw IDs.
///
/// # Errors
/// Returns `Error::Config` if a token is neither, or if the list names no one.
pub(crate) fn parse_user_ids(value: &str) -> Result<Vec<String>> {
    let ids = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(|token| {
            serenity::utils::parse_user_mention(token)
                .map(|id| id.get())
                .or_else(|| token.parse::<u64>().ok().filter(|id| *id != 0))
                .map(|id| id.to_string())
                .ok_or_else(|| Error::Config {
                    message: format!("'{token}' is not a user mention or ID"),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    if ids.is_empty() {
        return Err(Error::Config {
            message: "Mention at least one member to split with".to_string(),
        });
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_user_ids() {
        assert_eq!(
            parse_user_ids("<@123>, <@!456> 789").unwrap(),
            vec!["123".to_string(), "456".to_string(), "789".to_string()]
        );
    }

    #[test]
    fn test_parse_user_ids_rejects_names_and_role_mentions() {
        for input in ["bob", "@bob", "<@&123>", "<@123> everyone", "", " , "] {
            assert!(
                matches!(parse_user_ids(input), Err(Error::Config { .. })),
                "accepted {input:?}"
            );
        }
    }

    #[test]
    fn test_fit_message() {
        assert_eq!(fit_message("short".to_string()), "short");

        let long = "€".repeat(MESSAGE_BUDGET);
        let fitted = fit_message(long);
        assert!(fitted.len() <= MESSAGE_BUDGET + '…'.len_utf8());
        assert!(fitted.ends_with('…'));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date(" 2026-06-01 ").unwrap(),
            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
        );
        assert!(matches!(
            parse_date("06/01/2026").unwrap_err(),
            Error::Config { .. }
        ));
    }
}
