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
use std::io;
use thiserror::Error;

/// Errors raised while loading `config.json`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read the configuration file: {0}")]
    Read(#[from] io::Error),
    #[error("could not parse the configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised while downloading or parsing remote data.
#[derive(Debug, Error)]
pub enum DataError {
    /// Nothing could be fetched and there is no earlier copy to fall back to.
    #[error("no score data is available")]
    Unavailable,
    #[error("download failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("could not read the spreadsheet: {0}")]
    Spreadsheet(String),
    #[error("the spreadsheet has no `{0}` column")]
    MissingColumn(String),
    #[error("could not parse the tank catalog: {0}")]
    Catalog(#[from] serde_json::Error),
}

/**
 * Failures of a single command, recovered at the message handling boundary.
 *
 * Every variant maps to a message shown to the user; none of them is fatal for the bot.
 */
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("score data unavailable")]
    DataUnavailable,
    #[error("permission denied")]
    PermissionDenied,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CommandError {
    /// The text replied to the user who triggered the command.
    pub fn user_message(&self) -> String {
        match self {
            CommandError::DataUnavailable => {
                "The scoreboard could not be downloaded right now. Try again later.".to_string()
            }
            CommandError::PermissionDenied => {
                "**Error:** You are not allowed to use this command.".to_string()
            }
            CommandError::NotFound(what) => format!("No results for {}.", what),
            CommandError::InvalidArgument(hint) => format!("**Error:** {}", hint),
        }
    }
}

impl From<DataError> for CommandError {
    fn from(_: DataError) -> Self {
        CommandError::DataUnavailable
    }
}
