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
use crate::render;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;
use serenity::all::{ChannelId, Message, User};

/**
 * Anything a command can be triggered by: a text message or a slash command context.
 */
pub trait Invocation {
    /// The command as the user typed it.
    fn invocation_text(&self) -> String;
    /// The user who triggered the command.
    fn invoker(&self) -> &User;
}

impl Invocation for Message {
    fn invocation_text(&self) -> String {
        self.content.clone()
    }

    fn invoker(&self) -> &User {
        &self.author
    }
}

impl Invocation for Context<'_> {
    fn invocation_text(&self) -> String {
        self.invocation_string()
    }

    fn invoker(&self) -> &User {
        self.author()
    }
}

/**
 * Macro for logging the usage of a command.
 */
macro_rules! elog_cmd {
    ($ctx:ident) => {{
        use crate::utils::Invocation as _;
        tracing::info!(
            command = %$ctx.invocation_text(),
            author = %$ctx.invoker().tag(),
            author_id = %$ctx.invoker().id,
            "Executing command."
        );
    }};
}
pub(crate) use elog_cmd;

/**
 * Sends text to a channel as code blocks, split over as many messages as needed to stay within
 * `limit` characters per message.
 */
pub async fn say_chunked(
    http: &serenity::Http,
    channel: ChannelId,
    lines: &[String],
    limit: usize,
) -> Result<(), Error> {
    let budget = limit.saturating_sub(render::FENCE_OVERHEAD);
    for chunk in render::chunk_lines(lines, budget) {
        channel.say(http, render::code_block(&chunk)).await?;
    }

    Ok(())
}
