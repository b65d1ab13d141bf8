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
use crate::commands::lookup;
use crate::dispatch::{self, Command, RowRange, Verb};
use crate::error::CommandError;
use crate::pagination::{self, Frame, Nav, PageState, PageSurface};
use crate::query::{self, DerivedView, Lookup, Query};
use crate::render::{self, RenderOptions};
use crate::{Data, Error};
use futures_util::stream::{BoxStream, StreamExt as _};
use poise::serenity_prelude as serenity;
use serenity::all::{
    ButtonStyle, ComponentInteraction, ComponentInteractionCollector, CreateActionRow,
    CreateButton, CreateEmbed, CreateEmbedFooter, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateMessage, EditMessage, Message,
};
use std::time::Duration;

/// Reads a positional argument the verb cannot do without.
fn require_arg<'a>(command: &'a Command, data: &Data, usage: &str) -> Result<&'a str, CommandError> {
    command.arg(0).ok_or_else(|| {
        CommandError::InvalidArgument(format!("Usage: `{};{}`", data.config.prefix, usage))
    })
}

/**
 * Answers the table commands (everything but help, random and screenshots).
 *
 * Arguments are validated before the scoreboard is touched, so a malformed command never costs a
 * download.
 */
#[olympus::log_cmd(msg)]
pub async fn table(
    ctx: &serenity::Context,
    msg: &Message,
    data: &Data,
    command: &Command,
) -> Result<(), Error> {
    let config = &data.config;
    dispatch::authorize(command.verb(), &msg.author.name, config)?;
    let range = command.row_range(config.max_range)?;
    let class = command.class_filter();

    let query = match command.verb() {
        Verb::All => Query::All,
        Verb::Best => Query::Best,
        Verb::BestPerTank => Query::BestPerTank,
        Verb::Page => {
            if range.is_none() {
                return Err(CommandError::InvalidArgument(format!(
                    "Usage: `{};p;1-{}`",
                    config.prefix, config.max_range
                ))
                .into());
            }
            Query::Ranked
        }
        Verb::Date => Query::Day(query::parse_day(require_arg(command, data, "d;2024-01-05")?)?),
        Verb::Name => {
            let name = require_arg(command, data, "n;<name>")?;
            let records = data.store.get_scores().await.map_err(CommandError::from)?;
            let known = query::distinct_names(&records);
            match resolve(ctx, msg, data, "player", name, &known).await? {
                Some(name) => Query::Name(name),
                None => return Ok(()),
            }
        }
        Verb::Tank => {
            let tank = require_arg(command, data, "t;<tank>")?;
            let records = data.store.get_scores().await.map_err(CommandError::from)?;
            let known = query::distinct_tanks(&records);
            match resolve(ctx, msg, data, "tank", tank, &known).await? {
                Some(tank) => Query::Tank(tank),
                None => return Ok(()),
            }
        }
        Verb::Help | Verb::Random | Verb::Screenshot => return Ok(()),
    };

    let records = data.store.get_scores().await.map_err(CommandError::from)?;
    let view = query::derive(&records, &query, class)?;

    present(ctx, msg, data, view, range).await
}

/// Settles which known value a name or tank argument means, asking the user when unsure.
async fn resolve(
    ctx: &serenity::Context,
    msg: &Message,
    data: &Data,
    subject: &str,
    wanted: &str,
    known: &[String],
) -> Result<Option<String>, Error> {
    let config = &data.config;
    match query::lookup(known, wanted, config.fuzzy_count, config.fuzzy_cutoff)? {
        Lookup::Exact(value) => Ok(Some(value)),
        Lookup::Suggestions(candidates) => {
            lookup::ask(ctx, msg, data, subject, wanted, &candidates).await
        }
    }
}

/// Custom identifiers of the navigation buttons of one reply.
struct NavButtons {
    prev: String,
    next: String,
}

impl NavButtons {
    fn for_command(msg: &Message) -> NavButtons {
        Self {
            prev: format!("olymp-prev-{}", msg.id),
            next: format!("olymp-next-{}", msg.id),
        }
    }

    fn nav(&self, custom_id: &str) -> Option<Nav> {
        if custom_id == self.prev {
            Some(Nav::Prev)
        } else if custom_id == self.next {
            Some(Nav::Next)
        } else {
            None
        }
    }

    fn row(&self, frame: &Frame) -> Vec<CreateActionRow> {
        vec![CreateActionRow::Buttons(vec![
            CreateButton::new(&self.prev)
                .label("⬅ Back")
                .style(ButtonStyle::Secondary)
                .disabled(!frame.has_prev),
            CreateButton::new(&self.next)
                .label("Next ➡")
                .style(ButtonStyle::Secondary)
                .disabled(!frame.has_next),
        ])]
    }
}

/// The card showing one page: title, table as a code block, and row counts in the footer.
fn page_embed(frame: &Frame, limit: usize) -> CreateEmbed {
    let chunks = render::chunk_lines(&frame.lines, limit.saturating_sub(render::FENCE_OVERHEAD));
    let body = chunks.first().map(String::as_str).unwrap_or("");
    let footer = if chunks.len() > 1 {
        format!("{} (truncated)", frame.footer)
    } else {
        frame.footer.clone()
    };

    CreateEmbed::new()
        .title(&frame.title)
        .description(render::code_block(body))
        .footer(CreateEmbedFooter::new(footer))
}

/// A sent leaderboard reply whose buttons drive the pagination.
struct DiscordPages {
    ctx: serenity::Context,
    reply: Message,
    buttons: NavButtons,
    limit: usize,
    /// Every press on the reply, collected for as long as it is served.
    presses: BoxStream<'static, ComponentInteraction>,
}

impl PageSurface for DiscordPages {
    type Press = ComponentInteraction;

    async fn next_press(&mut self, idle: Duration) -> Option<(ComponentInteraction, Nav)> {
        let buttons = &self.buttons;
        pagination::next_nav(&mut self.presses, idle, |press: &ComponentInteraction| {
            buttons.nav(&press.data.custom_id)
        })
        .await
    }

    async fn show(&mut self, press: ComponentInteraction, frame: &Frame) -> Result<(), Error> {
        press
            .create_response(
                &self.ctx.http,
                CreateInteractionResponse::UpdateMessage(
                    CreateInteractionResponseMessage::new()
                        .embed(page_embed(frame, self.limit))
                        .components(self.buttons.row(frame)),
                ),
            )
            .await?;

        Ok(())
    }

    async fn close(&mut self, frame: &Frame) -> Result<(), Error> {
        self.reply
            .edit(
                &self.ctx.http,
                EditMessage::new().components(self.buttons.row(frame)),
            )
            .await?;

        Ok(())
    }
}

/**
 * Sends the first page of a view and keeps serving its Prev/Next buttons until they go idle.
 *
 * With a range, the reply starts at its first row and pages have its length; otherwise pages have
 * the configured default size.
 */
async fn present(
    ctx: &serenity::Context,
    msg: &Message,
    data: &Data,
    view: DerivedView,
    range: Option<RowRange>,
) -> Result<(), Error> {
    let config = &data.config;
    let options = RenderOptions {
        tank_width: config.tank_width,
    };
    let (offset, page_size) = match range {
        Some(range) => (range.offset(), range.len()),
        None => (0, config.page_size),
    };

    let mut state = PageState::new(view, offset, page_size, options)?;
    if range.is_some_and(|r| r.clamped()) {
        state = state.with_warning(format!("⚠ Range limited to {} rows.", config.max_range));
    }

    let frame = state.frame();
    let mut message = CreateMessage::new().embed(page_embed(&frame, config.message_limit));
    // Everything fits in one page: nothing to navigate.
    if !(frame.has_prev || frame.has_next) {
        msg.channel_id.send_message(&ctx.http, message).await?;
        return Ok(());
    }
    let buttons = NavButtons::for_command(msg);
    message = message.components(buttons.row(&frame));
    let reply = msg.channel_id.send_message(&ctx.http, message).await?;

    let presses = ComponentInteractionCollector::new(ctx)
        .message_id(reply.id)
        .stream()
        .boxed();
    let mut surface = DiscordPages {
        ctx: ctx.clone(),
        reply,
        buttons,
        limit: config.message_limit,
        presses,
    };
    pagination::drive(&mut state, &mut surface, config.page_timeout()).await;

    Ok(())
}
