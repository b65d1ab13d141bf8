/*
 *  Olympus - Discord bot serving leaderboards from a shared score spreadsheet.
 *  Copyright (C) 2025  Manuel de Castro
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */
mod catalog;
mod commands;
mod config;
mod dispatch;
mod error;
mod pagination;
mod query;
mod render;
mod score;
mod utils;

use crate::config::BotConfig;
use crate::dispatch::Cooldowns;
use crate::score::{DriveSource, ScoreStore};
use poise::serenity_prelude as serenity;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Path of the configuration file, relative to the working directory.
const CONFIG_PATH: &str = "config.json";

/* Poise-required data types: */

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/**
 * State shared by every command. Cloning is cheap: it only clones handles.
 */
#[derive(Clone)]
pub struct Data {
    pub config: Arc<BotConfig>,
    pub store: Arc<ScoreStore<DriveSource>>,
    /// Every known tank, for random recommendations.
    pub catalog: Arc<Vec<String>>,
    pub cooldowns: Arc<Cooldowns>,
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        // Ready (bot is started):
        serenity::FullEvent::Ready { data_about_bot, .. } => {
            info!(
                user = %data_about_bot.user.tag(),
                guilds = data_about_bot.guilds.len(),
                "Olympus is connected."
            );
            ctx.set_presence(
                Some(serenity::ActivityData::watching(format!(
                    "{};help",
                    data.config.prefix
                ))),
                serenity::OnlineStatus::Online,
            );
        }
        // Any message could be a text command:
        serenity::FullEvent::Message { new_message } => {
            commands::handle_message(ctx, new_message, data);
        }
        _ => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let Ok(token) = env::var("DISCORD_TOKEN") else {
        error!("Discord token not provided (in DISCORD_TOKEN environmental variable).");
        return ExitCode::FAILURE;
    };
    let config = match config::load_config(CONFIG_PATH) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, path = CONFIG_PATH, "Could not load the configuration.");
            return ExitCode::FAILURE;
        }
    };
    let source = match DriveSource::new(&config) {
        Ok(source) => source,
        Err(err) => {
            error!(error = %err, "Could not build the HTTP client.");
            return ExitCode::FAILURE;
        }
    };

    let catalog = catalog::load_catalog(&config).await;
    let data = Data {
        store: Arc::new(ScoreStore::new(source, config.freshness())),
        cooldowns: Arc::new(Cooldowns::new(config.cooldown())),
        catalog: Arc::new(catalog),
        config: Arc::new(config),
    };

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![commands::help::help(), commands::license::license()],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(data)
            })
        })
        .build();

    let mut client = match serenity::Client::builder(token, intents)
        .framework(framework) // For command handling, using poise.
        .await
    {
        Ok(client) => client,
        Err(err) => {
            error!(error = %err, "Could not create the Discord bot client object.");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = client.start().await {
        error!(error = %err, "The Discord bot crashed.");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
