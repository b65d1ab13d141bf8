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
pub mod help;
pub mod leaderboard;
pub mod license;
pub mod lookup;
pub mod random;
pub mod screenshot;

use crate::dispatch::{self, Command, Verb};
use crate::error::CommandError;
use crate::{Data, Error};
use poise::serenity_prelude as serenity;
use serenity::all::Message;
use tracing::{debug, error, warn};

/// Reply sent when a command fails for reasons the user cannot do anything about.
const FAILURE_NOTICE: &str = "Something went wrong while running that command. Try again later.";

/**
 * Entry point for every message the bot sees.
 *
 * Messages that are not commands, come from bots or arrive during the sender's cooldown are
 * ignored. Accepted commands run in their own task, so a slow reply never holds the gateway and a
 * failure (even a panic) only ends that command, with a notice to the user.
 */
pub fn handle_message(ctx: &serenity::Context, msg: &Message, data: &Data) {
    if msg.author.bot {
        return;
    }
    let Some(command) = dispatch::parse(&msg.content, &data.config.prefix) else {
        return;
    };
    if !data.cooldowns.try_accept(msg.author.id) {
        debug!(author_id = %msg.author.id, "Dropped a command sent during the cooldown.");
        return;
    }

    let (ctx, msg, data) = (ctx.clone(), msg.clone(), data.clone());
    tokio::spawn(async move {
        let task = tokio::spawn({
            let (ctx, msg, data) = (ctx.clone(), msg.clone(), data.clone());
            async move { run(&ctx, &msg, &data, &command).await }
        });

        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(join_error) => Err(join_error.into()),
        };
        if let Err(err) = outcome {
            report(&ctx, &msg, err).await;
        }
    });
}

async fn run(
    ctx: &serenity::Context,
    msg: &Message,
    data: &Data,
    command: &Command,
) -> Result<(), Error> {
    match command.verb() {
        Verb::Help => help::send_help(ctx, msg, data).await,
        Verb::Random => random::random(ctx, msg, data, command).await,
        Verb::Screenshot => screenshot::screenshot(ctx, msg, data, command).await,
        Verb::All
        | Verb::Best
        | Verb::BestPerTank
        | Verb::Name
        | Verb::Tank
        | Verb::Date
        | Verb::Page => leaderboard::table(ctx, msg, data, command).await,
    }
}

/// Tells the user why their command failed.
async fn report(ctx: &serenity::Context, msg: &Message, err: Error) {
    let text = match err.downcast_ref::<CommandError>() {
        Some(command_error) => {
            debug!(error = %command_error, command = %msg.content, "Command refused.");
            command_error.user_message()
        }
        None => {
            error!(error = %err, command = %msg.content, "Command failed.");
            FAILURE_NOTICE.to_string()
        }
    };

    if let Err(err) = msg.channel_id.say(&ctx.http, text).await {
        warn!(error = %err, channel_id = %msg.channel_id, "Could not send an error reply.");
    }
}
