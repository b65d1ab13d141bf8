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
use crate::config::BotConfig;
use crate::utils;
use crate::{Context, Data, Error};
use poise::serenity_prelude as serenity;
use serenity::all::Message;

/**
 * The command reference, one line per command, written with the configured prefix.
 */
pub fn help_lines(config: &BotConfig) -> Vec<String> {
    let p = &config.prefix;
    let max = config.max_range;
    vec![
        "Olympus leaderboard commands (fields are separated by ';'):".to_string(),
        String::new(),
        format!("{p};b [;class] [;1-{max}]      best score of every player"),
        format!("{p};c [;class] [;1-{max}]      best score of every tank"),
        format!("{p};n;<name> [;class] [;1-{max}]  scores of a player"),
        format!("{p};t;<tank> [;class] [;1-{max}]  scores with a tank"),
        format!("{p};d;<date> [;class] [;1-{max}]  scores of a day (2024-01-05 or 05-01-2024)"),
        format!("{p};p;<start-end> [;class]    any rows of the full ranking"),
        format!("{p};a [;class] [;1-{max}]      every submission (restricted)"),
        format!("{p};r;<a|b|r>                random tank: a submission, an unplayed tank, any tank"),
        format!("{p};s;<id>                    screenshot of a submission"),
        format!("{p};h                         this help"),
        String::new(),
        "Long forms also work: all, best, tanks, name, tank, date, page, random, shot, help.".to_string(),
        format!("Ranges show at most {max} rows. Use the buttons under a table to change pages."),
    ]
}

/// Answers `h`/`help` in the channel the command came from.
#[olympus::log_cmd(msg)]
pub async fn send_help(ctx: &serenity::Context, msg: &Message, data: &Data) -> Result<(), Error> {
    utils::say_chunked(
        &ctx.http,
        msg.channel_id,
        &help_lines(&data.config),
        data.config.message_limit,
    )
    .await
}

#[poise::command(
    slash_command,
    ephemeral,
    description_localized("en-US", "Get help for using Olympus."),
    description_localized("es-ES", "Obtener ayuda para usar Olympus.")
)]
#[olympus::log_cmd]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let lines = help_lines(&ctx.data().config);
    ctx.reply(crate::render::code_block(&lines.join("\n"))).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_uses_the_configured_prefix() {
        let config = BotConfig {
            prefix: String::from("?lb"),
            ..BotConfig::default()
        };
        let lines = help_lines(&config);
        assert!(lines.iter().any(|l| l.starts_with("?lb;b")));
        assert!(!lines.iter().any(|l| l.contains("!olymp")));
    }
}
