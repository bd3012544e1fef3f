use dotenvy::dotenv;
use poise::serenity_prelude as serenity;
use std::{env, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use trip_buddy::{
    bot::{self, BotData},
    config::{ai, categories, database},
    core::itinerary::{HttpPlanner, ItineraryPlanner},
    errors::{Error, Result},
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Category templates from config.toml
    let category_config = categories::load_default_config()
        .inspect_err(|e| error!("Invalid category configuration: {}", e))?;
    info!(
        "Loaded {} default budget categories.",
        category_config.categories.len()
    );

    // 4. Database
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. AI backend, optional
    let planner: Option<Arc<dyn ItineraryPlanner>> = match ai::get_ai_settings() {
        Some(settings) => {
            info!("AI itineraries enabled (model {}).", settings.model);
            Some(Arc::new(HttpPlanner::new(settings)?))
        }
        None => {
            warn!("AI_API_KEY not set, itinerary commands are disabled.");
            None
        }
    };

    // 6. Run the bot
    let token = env::var("DISCORD_BOT_TOKEN")
        .inspect_err(|e| error!("DISCORD_BOT_TOKEN not found: {}", e))?;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: bot::all_commands(),
            on_error: |error| Box::pin(bot::on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(BotData::new(db, planner, category_config))
            })
        })
        .build();

    info!("Setting up Serenity client for Poise framework...");
    let mut client =
        serenity::ClientBuilder::new(&token, serenity::GatewayIntents::non_privileged())
            .framework(framework)
            .await
            .inspect_err(|e| error!("Error creating client: {:?}", e))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {:?}", e))
        .map_err(Error::from)
}
