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
use crate::{Data, Error};
use poise::serenity_prelude as serenity;
use serenity::all::{
    ButtonStyle, ComponentInteractionCollector, CreateActionRow, CreateButton,
    CreateInteractionResponse, CreateInteractionResponseMessage, CreateMessage, EditMessage,
    Message,
};
use tracing::debug;

/// Discord rejects button labels longer than this.
const MAX_LABEL_CHARS: usize = 80;

fn candidate_buttons(ids: &[String], candidates: &[String], disabled: bool) -> Vec<CreateActionRow> {
    vec![CreateActionRow::Buttons(
        ids.iter()
            .zip(candidates)
            .map(|(id, candidate)| {
                CreateButton::new(id)
                    .label(candidate.chars().take(MAX_LABEL_CHARS).collect::<String>())
                    .style(ButtonStyle::Primary)
                    .disabled(disabled)
            })
            .collect(),
    )]
}

/**
 * Offers "did you mean" candidates as buttons and waits for the author of the command to pick one.
 *
 * Returns `None` if nobody picked anything before the reply timed out; the command then simply
 * ends, since guessing for the user is never an option.
 */
pub async fn ask(
    ctx: &serenity::Context,
    msg: &Message,
    data: &Data,
    subject: &str,
    wanted: &str,
    candidates: &[String],
) -> Result<Option<String>, Error> {
    let ids: Vec<String> = (0..candidates.len())
        .map(|i| format!("olymp-pick-{}-{}", msg.id, i))
        .collect();

    let mut prompt = msg
        .channel_id
        .send_message(
            &ctx.http,
            CreateMessage::new()
                .content(format!(
                    "There is no {} called `{}`. Did you mean:",
                    subject, wanted
                ))
                .components(candidate_buttons(&ids, candidates, false)),
        )
        .await?;

    let picked = ComponentInteractionCollector::new(ctx)
        .message_id(prompt.id)
        .author_id(msg.author.id)
        .timeout(data.config.page_timeout())
        .await;

    let Some(press) = picked else {
        let disabled = EditMessage::new().components(candidate_buttons(&ids, candidates, true));
        if let Err(err) = prompt.edit(&ctx.http, disabled).await {
            debug!(error = %err, "Could not disable the buttons of an expired suggestion.");
        }
        return Ok(None);
    };

    let Some(choice) = ids
        .iter()
        .position(|id| *id == press.data.custom_id)
        .map(|i| candidates[i].clone())
    else {
        return Ok(None);
    };

    press
        .create_response(
            &ctx.http,
            CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new()
                    .content(format!("Showing results for `{}`.", choice))
                    .components(Vec::new()),
            ),
        )
        .await?;

    Ok(Some(choice))
}
