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
use crate::query::{self, RecommendMode};
use crate::score::ScoreRecord;
use crate::{Data, Error};
use futures_util::StreamExt as _;
use poise::serenity_prelude as serenity;
use serenity::all::{
    ButtonStyle, ComponentInteractionCollector, CreateActionRow, CreateButton,
    CreateInteractionResponse, CreateInteractionResponseMessage, CreateMessage, EditMessage,
    Message,
};
use tokio::time::timeout;
use tracing::debug;

fn reroll_row(id: &str, disabled: bool) -> Vec<CreateActionRow> {
    vec![CreateActionRow::Buttons(vec![CreateButton::new(id)
        .label("🎲 Reroll")
        .style(ButtonStyle::Primary)
        .disabled(disabled)])]
}

/// Draws one recommendation as reply text. The generator never outlives the call.
fn draw(records: &[ScoreRecord], catalog: &[String], mode: RecommendMode) -> Result<String, CommandError> {
    let mut rng = rand::thread_rng();
    query::recommend(records, catalog, mode, &mut rng).map(|r| r.message())
}

/**
 * Recommends a random tank to play, with a button to draw again.
 *
 * Modes: `a` picks an existing submission, `b` a catalog tank nobody has played yet, `r` any
 * catalog tank.
 */
#[olympus::log_cmd(msg)]
pub async fn random(
    ctx: &serenity::Context,
    msg: &Message,
    data: &Data,
    command: &Command,
) -> Result<(), Error> {
    let mode = command
        .arg(0)
        .and_then(RecommendMode::from_arg)
        .ok_or_else(|| {
            CommandError::InvalidArgument(format!(
                "Usage: `{};r;<a|b|r>` (a: existing submission, b: unplayed tank, r: any tank)",
                data.config.prefix
            ))
        })?;

    let records = data.store.get_scores().await.map_err(CommandError::from)?;
    let text = draw(&records, &data.catalog, mode)?;

    let id = format!("olymp-reroll-{}", msg.id);
    let mut reply = msg
        .channel_id
        .send_message(
            &ctx.http,
            CreateMessage::new().content(text).components(reroll_row(&id, false)),
        )
        .await?;

    let wanted = id.clone();
    let mut presses = ComponentInteractionCollector::new(ctx)
        .message_id(reply.id)
        .filter(move |press| press.data.custom_id == wanted)
        .stream()
        .boxed();
    while let Ok(Some(press)) = timeout(data.config.page_timeout(), presses.next()).await {
        let text = draw(&records, &data.catalog, mode)?;
        press
            .create_response(
                &ctx.http,
                CreateInteractionResponse::UpdateMessage(
                    CreateInteractionResponseMessage::new().content(text),
                ),
            )
            .await?;
    }

    if let Err(err) = reply
        .edit(&ctx.http, EditMessage::new().components(reroll_row(&id, true)))
        .await
    {
        debug!(error = %err, "Could not disable an expired reroll button.");
    }

    Ok(())
}
