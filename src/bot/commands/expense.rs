//! Expense Discord commands - add, list and delete trip expenses.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{
            BotData,
            commands::{
                MESSAGE_BUDGET, fit_message, parse_date, parse_user_ids, selected_group_or_reply,
            },
            handlers::autocomplete,
        },
        core::{
            expense::{self, ExpenseWithSplits, NewExpense},
            realtime::ChangeKind,
            report,
        },
        errors::{Error, Result},
    };
    use std::fmt::Write;

    /// Lists up to `limit` expenses, stopping early when the reply would get too long.
    fn render_expense_list(
        trip_name: &str,
        expenses: &[ExpenseWithSplits],
        limit: usize,
    ) -> Result<String> {
        let mut response = format!("🧾 **Expenses for {trip_name}**\n\n");
        let mut shown = 0;
        for item in expenses.iter().take(limit) {
            let line = format!("• {}\n", report::format_expense_line(item));
            if response.len() + line.len() > MESSAGE_BUDGET {
                break;
            }
            response.push_str(&line);
            shown += 1;
        }
        if expenses.len() > shown {
            writeln!(&mut response, "_…and {} more_", expenses.len() - shown)?;
        }
        Ok(fit_message(response))
    }

    /// Parent command for trip expenses.
    #[poise::command(
        slash_command,
        subcommands("expense_add", "expense_list", "expense_delete")
    )]
    pub async fn expense(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Expense commands. Available subcommands:\n\
            `/expense add` - Log something you paid for\n\
            `/expense list` - Show recent expenses\n\
            `/expense delete` - Delete an expense you logged";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Logs an expense you paid, split equally between members.
    #[poise::command(slash_command, rename = "add")]
    pub async fn expense_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Budget category"]
        #[autocomplete = "autocomplete::autocomplete_category"]
        category: String,
        #[description = "Amount paid"] amount: f64,
        #[description = "What it was for"] description: String,
        #[description = "Members to split with (mentions); defaults to everyone"]
        split_with: Option<String>,
        #[description = "Date (YYYY-MM-DD), defaults to today"] date: Option<String>,
        #[description = "Link to a receipt"] receipt_url: Option<String>,
    ) -> Result<()> {
        // Validate amount parameter
        if amount.is_nan() || amount.is_infinite() {
            ctx.say("❌ Invalid amount: must be a valid number").await?;
            return Ok(());
        }
        if amount <= 0.0 {
            ctx.say("❌ Invalid amount: must be greater than zero")
                .await?;
            return Ok(());
        }

        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };
        let data = ctx.data();
        let payer_id = ctx.author().id.to_string();

        let date = match date {
            Some(value) => parse_date(&value)?,
            None => chrono::Local::now().date_naive(),
        };
        let split_between = split_with
            .as_deref()
            .map(parse_user_ids)
            .transpose()?
            .unwrap_or_default();

        let dashboard = data.dashboard(trip.id).await?;
        let stored = dashboard
            .add_expense_optimistic(
                &payer_id,
                NewExpense {
                    category: category.trim().to_string(),
                    amount,
                    description,
                    date,
                    receipt_url,
                    split_between,
                },
            )
            .await?;
        data.feed.notify(trip.id, ChangeKind::Expenses);

        let state = dashboard.state().await;
        let mut response = format!(
            "✅ Logged ${:.2} for **{}** in {}, split {} way{} (${:.2} each). Expense ID: {}",
            stored.expense.amount,
            stored.expense.description,
            stored.expense.category,
            stored.split_between.len(),
            if stored.split_between.len() == 1 { "" } else { "s" },
            stored.share_per_member(),
            stored.expense.id
        );
        if let Some(summary) = state
            .category_summaries()
            .into_iter()
            .find(|s| s.name == stored.expense.category)
        {
            write!(&mut response, "\n{}", report::format_category_line(&summary))?;
        }

        ctx.say(response).await?;
        Ok(())
    }

    /// Shows the most recent expenses of the selected trip.
    #[poise::command(slash_command, rename = "list")]
    pub async fn expense_list(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "How many to show (default 10)"] limit: Option<u64>,
    ) -> Result<()> {
        let Some(trip) = selected_group_or_reply(ctx).await? else {
            return Ok(());
        };

        let expenses = expense::list_expenses(&ctx.data().database, trip.id).await?;
        if expenses.is_empty() {
            ctx.say("🧾 No expenses yet. Log one with `/expense add`.")
                .await?;
            return Ok(());
        }

        let limit = usize::try_from(limit.unwrap_or(10)).unwrap_or(usize::MAX);
        ctx.say(render_expense_list(&trip.name, &expenses, limit)?)
            .await?;
        Ok(())
    }

    /// Deletes an expense (payer or leader only).
    #[poise::command(slash_command, rename = "delete")]
    pub async fn expense_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Expense ID from `/expense list`"] expense_id: i64,
    ) -> Result<()> {
        let data = ctx.data();
        let actor_id = ctx.author().id.to_string();

        let deleted = expense::delete_expense(&data.database, expense_id, &actor_id).await?;
        data.feed.notify(deleted.group_id, ChangeKind::Expenses);

        ctx.say(format!(
            "🗑️ Deleted expense #{} (${:.2} for {}).",
            deleted.id, deleted.amount, deleted.description
        ))
        .await?;
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::entities::group_expense;

        fn expense(id: i64) -> ExpenseWithSplits {
            ExpenseWithSplits {
                expense: group_expense::Model {
                    id,
                    group_id: 1,
                    category: "Food".to_string(),
                    amount: 12.5,
                    description: format!("Lunch number {id} at the market by the river"),
                    paid_by_id: "alice".to_string(),
                    paid_by_name: "Alice".to_string(),
                    date: chrono::NaiveDate::from_ymd_opt(2026, 6, 1).unwrap_or_default(),
                    receipt_url: None,
                    created_at: chrono::Utc::now(),
                },
                split_between: vec!["alice".to_string(), "bob".to_string()],
            }
        }

        #[test]
        fn test_expense_list_respects_limit() -> Result<()> {
            let expenses: Vec<_> = (1..=5).map(expense).collect();
            let text = render_expense_list("Lisbon", &expenses, 2)?;
            assert_eq!(text.matches("• ").count(), 2);
            assert!(text.ends_with("_…and 3 more_\n"));
            Ok(())
        }

        #[test]
        fn test_expense_list_fits_in_one_message() -> Result<()> {
            let expenses: Vec<_> = (1..=500).map(expense).collect();
            let text = render_expense_list("Lisbon", &expenses, usize::MAX)?;
            assert!(text.chars().count() < 2000);
            assert!(text.contains("more_"));
            Ok(())
        }
    }
}

// Re-export all commands
pub use inner::*;
