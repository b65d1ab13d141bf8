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
use crate::dispatch::Command;
use crate::error::CommandError;
use crate::query;
use crate::render;
use crate::score::ScoreRecord;
use crate::{Data, Error};
use poise::serenity_prelude as serenity;
use serenity::all::{CreateEmbed, CreateMessage, Message};

/// Link to the screenshot of a submission, from a template where `{id}` stands for the id.
fn screenshot_link(template: &str, id: &str) -> String {
    template.replace("{id}", id.trim())
}

fn screenshot_embed(record: &ScoreRecord, link: String) -> CreateEmbed {
    let mut description = format!("**Score:** {}", render::format_score(record.score()));
    if record.date().is_some() {
        description.push_str(&format!(
            "\n**Date:** {}",
            render::format_date(record.date().as_deref())
        ));
    }

    CreateEmbed::new()
        .title(format!("{} ({})", record.name(), record.tank()))
        .description(description)
        .url(link.clone())
        .image(link)
}

/**
 * Shows the screenshot behind a submission, looked up by its id.
 */
#[olympus::log_cmd(msg)]
pub async fn screenshot(
    ctx: &serenity::Context,
    msg: &Message,
    data: &Data,
    command: &Command,
) -> Result<(), Error> {
    let id = command.arg(0).ok_or_else(|| {
        CommandError::InvalidArgument(format!("Usage: `{};s;<id>`", data.config.prefix))
    })?;
    let Some(template) = data.config.screenshot_url.as_deref() else {
        return Err(CommandError::InvalidArgument(
            "Screenshots are not available on this bot.".to_string(),
        )
        .into());
    };

    let records = data.store.get_scores().await.map_err(CommandError::from)?;
    let record = query::find_by_id(&records, id)?;
    let link = screenshot_link(template, record.id().as_deref().unwrap_or(id));

    msg.channel_id
        .send_message(
            &ctx.http,
            CreateMessage::new().embed(screenshot_embed(&record, link)),
        )
        .await?;

    Ok(())
}
