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
use crate::config::{BotConfig, ColumnNames};
use crate::error::DataError;
use crate::query::same_text;
use calamine::{Data, Reader, Xlsx};
use chrono::NaiveDate;
use getset::{CopyGetters, Getters};
use std::future::Future;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{error, info, warn};

/* Data structures: */

/// One row of the scoreboard.
///
/// Records are immutable once loaded. Optional spreadsheet columns are typed `Option`s, so a
/// missing column and an empty cell look the same to the rest of the bot.
#[derive(Clone, Debug, PartialEq, Getters, CopyGetters)]
pub struct ScoreRecord {
    /// Submitter identity.
    #[getset(get = "pub")]
    name: String,
    /// Tank (category) label.
    #[getset(get = "pub")]
    tank: String,
    /// Score, never negative.
    #[getset(get_copy = "pub")]
    score: f64,
    /// Submission date as written in the spreadsheet.
    #[getset(get = "pub")]
    date: Option<String>,
    /// External reference, for screenshot lookups.
    #[getset(get = "pub")]
    id: Option<String>,
    /// Name shown in game.
    #[getset(get = "pub")]
    in_game_name: Option<String>,
    /// Single-letter classification code.
    #[getset(get_copy = "pub")]
    class: Option<char>,
}

impl ScoreRecord {
    /// Builds a record from its mandatory fields. The score is coerced with [`coerce_score`].
    pub fn new(name: impl Into<String>, tank: impl Into<String>, score: &str) -> ScoreRecord {
        Self {
            name: name.into(),
            tank: tank.into(),
            score: coerce_score(score),
            date: None,
            id: None,
            in_game_name: None,
            class: None,
        }
    }

    #[cfg(test)]
    pub fn with_date(mut self, date: &str) -> Self {
        self.date = Some(date.to_string());
        self
    }

    #[cfg(test)]
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    #[cfg(test)]
    pub fn with_class(mut self, class: char) -> Self {
        self.class = Some(class);
        self
    }

    /// The calendar day of the submission, read from the first 10 characters of the date.
    pub fn day(&self) -> Option<NaiveDate> {
        let date = self.date.as_deref()?;
        let head: String = date.trim().chars().take(10).collect();
        NaiveDate::parse_from_str(&head, "%Y-%m-%d").ok()
    }
}

/**
 * Turns a raw score cell into a number.
 *
 * Thousands separators are ignored; anything unparsable, negative or non-finite becomes zero.
 */
pub fn coerce_score(raw: &str) -> f64 {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    match cleaned.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value,
        _ => 0.0,
    }
}

/* Spreadsheet ingestion: */

/// Position of each known column in a spreadsheet header.
struct Schema {
    name: usize,
    tank: usize,
    score: usize,
    date: Option<usize>,
    id: Option<usize>,
    in_game_name: Option<usize>,
    class: Option<usize>,
}

impl Schema {
    fn resolve(columns: &ColumnNames, header: &[String]) -> Result<Schema, DataError> {
        let find = |wanted: &str| {
            header
                .iter()
                .position(|h| same_text(h.trim(), wanted.trim()))
        };
        let require = |wanted: &String| {
            find(wanted).ok_or_else(|| DataError::MissingColumn(wanted.clone()))
        };

        Ok(Schema {
            name: require(&columns.name)?,
            tank: require(&columns.tank)?,
            score: require(&columns.score)?,
            date: find(&columns.date),
            id: find(&columns.id),
            in_game_name: find(&columns.in_game_name),
            class: find(&columns.class),
        })
    }

    fn record(&self, row: &[String]) -> ScoreRecord {
        let cell = |i: usize| row.get(i).map(|c| c.trim()).unwrap_or("");
        let optional = |i: Option<usize>| {
            i.map(cell)
                .filter(|c| !c.is_empty())
                .map(|c| c.to_string())
        };

        let mut record = ScoreRecord::new(cell(self.name), cell(self.tank), cell(self.score));
        record.date = optional(self.date);
        record.id = optional(self.id);
        record.in_game_name = optional(self.in_game_name);
        record.class = optional(self.class).and_then(|c| c.chars().next());
        record
    }
}

/**
 * Converts a header row plus data rows of text cells into score records.
 *
 * Header names are matched ignoring case and surrounding whitespace; extra columns are ignored and
 * rows whose cells are all blank are skipped.
 */
pub fn records_from_rows<I>(
    columns: &ColumnNames,
    header: &[String],
    rows: I,
) -> Result<Vec<ScoreRecord>, DataError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let schema = Schema::resolve(columns, header)?;

    Ok(rows
        .into_iter()
        .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
        .map(|row| schema.record(&row))
        .collect())
}

/**
 * Parses the first worksheet of an xlsx workbook into score records.
 */
pub fn parse_xlsx(bytes: Vec<u8>, columns: &ColumnNames) -> Result<Vec<ScoreRecord>, DataError> {
    let mut workbook =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| DataError::Spreadsheet(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DataError::Spreadsheet("the workbook has no worksheets".to_string()))?
        .map_err(|e| DataError::Spreadsheet(e.to_string()))?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let header = rows
        .next()
        .ok_or_else(|| DataError::Spreadsheet("the worksheet is empty".to_string()))?;

    records_from_rows(columns, &header, rows)
}

/// Text form of a spreadsheet cell, as the rest of the bot expects it.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        // Integral floats (the usual case for scores) must not render as "2000000.0".
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
        other => other.to_string(),
    }
}

/* Sources and cache: */

/**
 * Where score records come from.
 *
 * The store only depends on this trait, so the network download can be swapped out.
 */
pub trait ScoreSource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<Vec<ScoreRecord>, DataError>> + Send;
}

/// Downloads the score spreadsheet over HTTP.
pub struct DriveSource {
    client: reqwest::Client,
    url: String,
    columns: ColumnNames,
}

impl DriveSource {
    pub fn new(config: &BotConfig) -> Result<DriveSource, DataError> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout())
            .build()?;

        Ok(Self {
            client,
            url: config.scores_url.clone(),
            columns: config.columns.clone(),
        })
    }
}

impl ScoreSource for DriveSource {
    async fn fetch(&self) -> Result<Vec<ScoreRecord>, DataError> {
        let bytes = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        parse_xlsx(bytes.to_vec(), &self.columns)
    }
}

/// A downloaded copy of the scoreboard.
struct Snapshot {
    records: Arc<[ScoreRecord]>,
    fetched_at: Instant,
}

/**
 * Process-wide cache of the scoreboard.
 *
 * Empty at startup, filled on the first query and downloaded again once older than the freshness
 * window. The lock is held for the whole refresh, so concurrent callers wait for a single download
 * instead of starting their own. Snapshots are immutable: a refresh swaps in a new one and never
 * touches what earlier callers hold.
 */
pub struct ScoreStore<S> {
    source: S,
    freshness: Duration,
    cache: Mutex<Option<Snapshot>>,
}

impl<S: ScoreSource> ScoreStore<S> {
    pub fn new(source: S, freshness: Duration) -> ScoreStore<S> {
        Self {
            source,
            freshness,
            cache: Mutex::new(None),
        }
    }

    /**
     * Returns the current scoreboard, downloading it first if the cached copy is stale.
     *
     * When the download fails, an earlier copy is served if there is one.
     */
    pub async fn get_scores(&self) -> Result<Arc<[ScoreRecord]>, DataError> {
        let mut cache = self.cache.lock().await;

        if let Some(snapshot) = cache.as_ref() {
            if snapshot.fetched_at.elapsed() < self.freshness {
                return Ok(snapshot.records.clone());
            }
        }

        match self.source.fetch().await {
            Ok(records) => {
                info!(rows = records.len(), "Downloaded a fresh copy of the scoreboard.");
                let records: Arc<[ScoreRecord]> = records.into();
                *cache = Some(Snapshot {
                    records: records.clone(),
                    fetched_at: Instant::now(),
                });
                Ok(records)
            }
            Err(err) => match cache.as_ref() {
                Some(snapshot) => {
                    warn!(error = %err, "Could not refresh the scoreboard, serving the previous copy.");
                    Ok(snapshot.records.clone())
                }
                None => {
                    error!(error = %err, "Could not download the scoreboard.");
                    Err(DataError::Unavailable)
                }
            },
        }
    }
}
