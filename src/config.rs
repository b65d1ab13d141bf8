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
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/* Data structures: */

/**
 * Header names of the spreadsheet columns the bot reads.
 *
 * Lookups against the spreadsheet header are case-insensitive and ignore surrounding whitespace,
 * so only the spelling matters here.
 */
#[cfg_attr(debug_assertions, derive(Debug))]
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ColumnNames {
    /// Submitter identity (required).
    pub name: String,
    /// Tank (category) label (required).
    pub tank: String,
    /// Raw score (required).
    pub score: String,
    /// Submission date.
    pub date: String,
    /// External reference, used for screenshot lookups.
    pub id: String,
    /// Name shown in game, which may differ from the submitter identity.
    pub in_game_name: String,
    /// Single-letter classification code.
    pub class: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            name: String::from("True Name"),
            tank: String::from("Tank Type"),
            score: String::from("Score"),
            date: String::from("Date"),
            id: String::from("ID"),
            in_game_name: String::from("Name in game"),
            class: String::from("Class"),
        }
    }
}

/**
 * Data structure encapsulating the configuration of the bot.
 *
 * Every field has a default, so a `config.json` only needs to list what it overrides.
 */
#[cfg_attr(debug_assertions, derive(Debug))]
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BotConfig {
    /// Literal first field of every command (e.g. "!olymp" for "!olymp;b").
    pub prefix: String,
    /// User name allowed to run restricted commands.
    pub privileged_user: String,
    /// Download URL of the score spreadsheet (xlsx).
    pub scores_url: String,
    /// Download URL of the JSON tank catalog.
    pub catalog_url: String,
    /// Screenshot link template; `{id}` is replaced by the record's id.
    pub screenshot_url: Option<String>,
    /// Spreadsheet header names.
    pub columns: ColumnNames,
    /// Seconds a downloaded spreadsheet is served before downloading it again.
    pub freshness_secs: u64,
    /// Seconds before an HTTP request is abandoned.
    pub fetch_timeout_secs: u64,
    /// Seconds a user must wait between two commands.
    pub cooldown_secs: u64,
    /// Rows per page when no range is given.
    pub page_size: usize,
    /// Largest number of rows a single page (or requested range) may show.
    pub max_range: usize,
    /// Seconds of inactivity after which interactive replies stop accepting clicks.
    pub page_timeout_secs: u64,
    /// Maximum characters per message sent to Discord.
    pub message_limit: usize,
    /// Width tank labels are truncated to in tables.
    pub tank_width: usize,
    /// Minimum similarity (0..1) for a value to be offered as a "did you mean" candidate.
    pub fuzzy_cutoff: f64,
    /// Maximum number of "did you mean" candidates.
    pub fuzzy_count: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: String::from("!olymp"),
            privileged_user: String::from("tejm_of_curonia"),
            scores_url: String::from(
                "https://drive.google.com/uc?id=1YMzE4FXjH4wctFektINwhCDjzZ0xqCP6&export=download",
            ),
            catalog_url: String::from(
                "https://drive.google.com/uc?export=download&id=1pGcmeDcTqx2h_HXA_R24JbaqQiBHhYMQ",
            ),
            screenshot_url: None,
            columns: ColumnNames::default(),
            freshness_secs: 30,
            fetch_timeout_secs: 20,
            cooldown_secs: 5,
            page_size: 10,
            max_range: 15,
            page_timeout_secs: 120,
            message_limit: 1900,
            tank_width: 9,
            fuzzy_cutoff: 0.6,
            fuzzy_count: 3,
        }
    }
}

impl BotConfig {
    /// Brings out-of-range numeric settings back to usable values.
    fn normalize(mut self) -> Self {
        self.max_range = self.max_range.max(1);
        self.page_size = self.page_size.clamp(1, self.max_range);
        self.fuzzy_count = self.fuzzy_count.max(1);
        self.fuzzy_cutoff = self.fuzzy_cutoff.clamp(0.0, 1.0);
        // Room for the code fence and at least one line.
        self.message_limit = self.message_limit.max(64);
        self
    }

    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }
}

/**
 * Loads the bot configuration from a JSON file.
 * If the file does not exist, the default configuration is used.
 */
pub fn load_config(path: impl AsRef<Path>) -> Result<BotConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(BotConfig::default());
    }

    let json = fs::read_to_string(path)?;
    parse_config(&json)
}

/**
 * Parses a JSON configuration document.
 */
pub fn parse_config(json: &str) -> Result<BotConfig, ConfigError> {
    let config: BotConfig = serde_json::from_str(json)?;
    Ok(config.normalize())
}
