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
use crate::error::DataError;
use crate::query::same_text;
use serde::Deserialize;
use tracing::{info, warn};

/// Layout of the JSON document listing every known tank.
#[derive(Deserialize)]
struct CatalogDocument {
    tanks: Vec<String>,
}

/**
 * Parses the tank catalog, dropping blank and repeated names (case-insensitively).
 */
pub fn parse_catalog(json: &str) -> Result<Vec<String>, DataError> {
    let document: CatalogDocument = serde_json::from_str(json)?;

    let mut tanks: Vec<String> = Vec::with_capacity(document.tanks.len());
    for tank in document.tanks {
        let tank = tank.trim();
        if tank.is_empty() || tanks.iter().any(|t| same_text(t, tank)) {
            continue;
        }
        tanks.push(tank.to_string());
    }

    Ok(tanks)
}

async fn fetch_catalog(config: &BotConfig) -> Result<Vec<String>, DataError> {
    let client = reqwest::Client::builder()
        .timeout(config.fetch_timeout())
        .build()?;
    let json = client
        .get(&config.catalog_url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    parse_catalog(&json)
}

/**
 * Downloads the tank catalog once, at startup.
 *
 * The catalog only feeds random recommendations, so a failed download leaves it empty instead of
 * stopping the bot.
 */
pub async fn load_catalog(config: &BotConfig) -> Vec<String> {
    match fetch_catalog(config).await {
        Ok(tanks) => {
            info!(tanks = tanks.len(), "Loaded the tank catalog.");
            tanks
        }
        Err(err) => {
            warn!(error = %err, "Could not load the tank catalog, random recommendations are limited.");
            Vec::new()
        }
    }
}
