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
use crate::error::CommandError;
use crate::score::ScoreRecord;
use chrono::NaiveDate;
use getset::Getters;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/* Views: */

/// A column of a rendered table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    /// Row number within the whole view.
    Index,
    Score,
    Name,
    Tank,
    Date,
}

impl Column {
    pub fn label(&self) -> &'static str {
        match self {
            Column::Index => "Ņ",
            Column::Score => "Score",
            Column::Name => "Name",
            Column::Tank => "Tank",
            Column::Date => "Date",
        }
    }
}

/// Column order of most tables.
pub const PLAYER_COLUMNS: [Column; 5] = [
    Column::Index,
    Column::Score,
    Column::Name,
    Column::Tank,
    Column::Date,
];

/// Column order of per-tank tables.
pub const TANK_COLUMNS: [Column; 5] = [
    Column::Index,
    Column::Tank,
    Column::Name,
    Column::Score,
    Column::Date,
];

/**
 * The rows computed for one command, with how to show them.
 *
 * Rows are owned copies, so a view stays valid however long its reply lives, whatever happens to
 * the score cache meanwhile.
 */
#[derive(Clone, Debug, PartialEq, Getters)]
pub struct DerivedView {
    #[getset(get = "pub")]
    title: String,
    #[getset(get = "pub")]
    columns: Vec<Column>,
    #[getset(get = "pub")]
    rows: Vec<ScoreRecord>,
}

impl DerivedView {
    pub fn new(title: impl Into<String>, columns: &[Column], rows: Vec<ScoreRecord>) -> Self {
        Self {
            title: title.into(),
            columns: columns.to_vec(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keeps only the rows whose classification code is `code` (ignoring case).
    fn retain_class(&mut self, code: char) {
        self.rows.retain(|r| {
            r.class()
                .is_some_and(|c| c.eq_ignore_ascii_case(&code))
        });
        self.title = format!("{} (class {})", self.title, code.to_ascii_uppercase());
    }
}

/* Queries: */

/// What a table command asks for.
#[derive(Clone, Debug, PartialEq)]
pub enum Query {
    /// Every row, in spreadsheet order.
    All,
    /// Best row of each submitter.
    Best,
    /// Best row of each tank.
    BestPerTank,
    /// Rows of one submitter.
    Name(String),
    /// Rows of one tank.
    Tank(String),
    /// Rows submitted on one day.
    Day(NaiveDate),
    /// Every row, best first.
    Ranked,
}

/**
 * Computes the view for a query, optionally restricted to one classification code.
 *
 * An empty result is reported as `NotFound`.
 */
pub fn derive(
    records: &[ScoreRecord],
    query: &Query,
    class: Option<char>,
) -> Result<DerivedView, CommandError> {
    let (mut view, what) = match query {
        Query::All => (
            DerivedView::new("All scores", &PLAYER_COLUMNS, records.to_vec()),
            "the scoreboard".to_string(),
        ),
        Query::Best => (
            DerivedView::new(
                "Best score per player",
                &PLAYER_COLUMNS,
                keep_first_by(by_score(records.iter()), |r| r.name()),
            ),
            "the scoreboard".to_string(),
        ),
        Query::BestPerTank => (
            DerivedView::new(
                "Best score per tank",
                &TANK_COLUMNS,
                keep_first_by(by_score(records.iter()), |r| r.tank()),
            ),
            "the scoreboard".to_string(),
        ),
        Query::Name(name) => (
            DerivedView::new(
                format!("Scores of {}", name),
                &PLAYER_COLUMNS,
                by_score(records.iter().filter(|r| same_text(r.name(), name))),
            ),
            format!("player `{}`", name),
        ),
        Query::Tank(tank) => (
            DerivedView::new(
                format!("Scores with {}", tank),
                &TANK_COLUMNS,
                by_score(records.iter().filter(|r| same_text(r.tank(), tank))),
            ),
            format!("tank `{}`", tank),
        ),
        Query::Day(day) => (
            DerivedView::new(
                format!("Scores from {}", day.format("%Y-%m-%d")),
                &PLAYER_COLUMNS,
                records
                    .iter()
                    .filter(|r| r.day() == Some(*day))
                    .cloned()
                    .collect(),
            ),
            format!("{}", day.format("%Y-%m-%d")),
        ),
        Query::Ranked => (
            DerivedView::new("Leaderboard", &PLAYER_COLUMNS, by_score(records.iter())),
            "the scoreboard".to_string(),
        ),
    };

    if let Some(code) = class {
        view.retain_class(code);
    }

    if view.is_empty() {
        return Err(CommandError::NotFound(what));
    }

    Ok(view)
}

/// Compares two labels ignoring case, for any script.
pub fn same_text(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Copies the rows, best score first. Ties keep their original order.
fn by_score<'a>(records: impl Iterator<Item = &'a ScoreRecord>) -> Vec<ScoreRecord> {
    let mut rows: Vec<ScoreRecord> = records.cloned().collect();
    rows.sort_by(|a, b| b.score().total_cmp(&a.score()));
    rows
}

/// Keeps the first row of each distinct key (compared without case).
fn keep_first_by<F>(rows: Vec<ScoreRecord>, key: F) -> Vec<ScoreRecord>
where
    F: Fn(&ScoreRecord) -> &String,
{
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|r| seen.insert(key(r).to_lowercase()))
        .collect()
}

/**
 * Parses a day given as `YYYY-MM-DD` or `DD-MM-YYYY`.
 */
pub fn parse_day(arg: &str) -> Result<NaiveDate, CommandError> {
    let arg = arg.trim();
    NaiveDate::parse_from_str(arg, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(arg, "%d-%m-%Y"))
        .map_err(|_| {
            CommandError::InvalidArgument(format!(
                "`{}` is not a date. Use `2024-01-05` or `05-01-2024`.",
                arg
            ))
        })
}

/**
 * Finds the submission with the given external id.
 */
pub fn find_by_id(records: &[ScoreRecord], id: &str) -> Result<ScoreRecord, CommandError> {
    records
        .iter()
        .find(|r| r.id().as_deref().is_some_and(|i| same_text(i.trim(), id.trim())))
        .cloned()
        .ok_or_else(|| CommandError::NotFound(format!("submission `{}`", id)))
}

/* Fuzzy lookup: */

/// Outcome of looking a name or tank up.
#[derive(Clone, Debug, PartialEq)]
pub enum Lookup {
    /// The value exists as given (up to case).
    Exact(String),
    /// The value does not exist; these are the closest known ones, best first.
    Suggestions(Vec<String>),
}

/// Distinct submitter names, in first-seen order.
pub fn distinct_names(records: &[ScoreRecord]) -> Vec<String> {
    distinct(records.iter().map(|r| r.name()))
}

/// Distinct tank labels, in first-seen order.
pub fn distinct_tanks(records: &[ScoreRecord]) -> Vec<String> {
    distinct(records.iter().map(|r| r.tank()))
}

fn distinct<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| !v.is_empty() && seen.insert(v.to_lowercase()))
        .cloned()
        .collect()
}

/**
 * Looks `wanted` up among `known` values.
 *
 * Without an exact (case-insensitive) match, the `count` most similar values scoring at least
 * `cutoff` are suggested instead. Nothing is ever picked on the user's behalf.
 */
pub fn lookup(
    known: &[String],
    wanted: &str,
    count: usize,
    cutoff: f64,
) -> Result<Lookup, CommandError> {
    let wanted = wanted.trim();
    if known.iter().any(|k| same_text(k, wanted)) {
        return Ok(Lookup::Exact(wanted.to_string()));
    }

    let needle = wanted.to_lowercase();
    let mut scored: Vec<(f64, &String)> = known
        .iter()
        .map(|k| (strsim::normalized_levenshtein(&needle, &k.to_lowercase()), k))
        .filter(|(similarity, _)| *similarity >= cutoff)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    let suggestions: Vec<String> = scored
        .into_iter()
        .take(count)
        .map(|(_, k)| k.clone())
        .collect();
    if suggestions.is_empty() {
        return Err(CommandError::NotFound(format!("`{}`", wanted)));
    }

    Ok(Lookup::Suggestions(suggestions))
}

/* Random recommendations: */

/// How a random tank is picked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecommendMode {
    /// A tank of an existing submission, credited to its submitter.
    Existing,
    /// A catalog tank nobody has a score with yet.
    Unused,
    /// Any catalog tank.
    Any,
}

impl RecommendMode {
    pub fn from_arg(arg: &str) -> Option<RecommendMode> {
        match arg.trim().to_lowercase().as_str() {
            "a" => Some(RecommendMode::Existing),
            "b" => Some(RecommendMode::Unused),
            "r" => Some(RecommendMode::Any),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recommendation {
    tank: String,
    by: Option<String>,
}

impl Recommendation {
    pub fn message(&self) -> String {
        match &self.by {
            Some(by) => format!("The Mountain recommends **{}** by **{}**.", self.tank, by),
            None => format!("The Mountain recommends **{}**.", self.tank),
        }
    }
}

/**
 * Picks a random tank to play next.
 */
pub fn recommend<R: Rng + ?Sized>(
    records: &[ScoreRecord],
    catalog: &[String],
    mode: RecommendMode,
    rng: &mut R,
) -> Result<Recommendation, CommandError> {
    match mode {
        RecommendMode::Existing => {
            let record = records
                .choose(rng)
                .ok_or_else(|| CommandError::NotFound("scores to pick from".to_string()))?;
            Ok(Recommendation {
                tank: record.tank().clone(),
                by: Some(
                    record
                        .in_game_name()
                        .clone()
                        .unwrap_or_else(|| record.name().clone()),
                ),
            })
        }
        RecommendMode::Unused => {
            let used: HashSet<String> = records.iter().map(|r| r.tank().to_lowercase()).collect();
            let unused: Vec<&String> = catalog
                .iter()
                .filter(|t| !used.contains(&t.to_lowercase()))
                .collect();
            let tank = unused
                .choose(rng)
                .ok_or_else(|| CommandError::NotFound("tanks without a score".to_string()))?;
            Ok(Recommendation {
                tank: (*tank).clone(),
                by: None,
            })
        }
        RecommendMode::Any => {
            let tank = catalog
                .choose(rng)
                .ok_or_else(|| CommandError::NotFound("tanks in the catalog".to_string()))?;
            Ok(Recommendation {
                tank: tank.clone(),
                by: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn board() -> Vec<ScoreRecord> {
        vec![
            ScoreRecord::new("Ann", "AutoTurret", "2,000,000").with_date("2024-01-05 10:00"),
            ScoreRecord::new("Bob", "Destroyer", "900000").with_date("2024-01-06"),
            ScoreRecord::new("ann", "Destroyer", "3,500,000").with_date("2024-01-05 22:10"),
            ScoreRecord::new("Cid", "Overlord", "1200000")
                .with_date("2024-02-01")
                .with_class('q'),
            ScoreRecord::new("Bob", "Overlord", "1200000").with_class('Q'),
            ScoreRecord::new("Ann", "Twin", "100").with_id("A7"),
        ]
    }

    fn names(view: &DerivedView) -> Vec<&str> {
        view.rows().iter().map(|r| r.name().as_str()).collect()
    }

    #[test]
    fn best_keeps_each_players_maximum_once() {
        let records = board();
        let view = derive(&records, &Query::Best, None).expect("rows");

        let mut max_by_player: HashMap<String, f64> = HashMap::new();
        for r in &records {
            let best = max_by_player.entry(r.name().to_lowercase()).or_insert(0.0);
            *best = best.max(r.score());
        }

        let mut seen = HashSet::new();
        for row in view.rows() {
            let key = row.name().to_lowercase();
            assert!(seen.insert(key.clone()), "{} appears twice", key);
            assert_eq!(row.score(), max_by_player[&key]);
        }
        assert_eq!(seen.len(), max_by_player.len());
        assert_eq!(names(&view), vec!["ann", "Cid", "Bob"]);
    }

    #[test]
    fn non_ascii_names_match_in_any_case() {
        let records = vec![
            ScoreRecord::new("Ärne", "Twin", "5,000,000"),
            ScoreRecord::new("ärne", "Destroyer", "7,000,000"),
            ScoreRecord::new("Bob", "Twin", "1"),
        ];

        let known = distinct_names(&records);
        assert_eq!(lookup(&known, "ÄRNE", 3, 0.6), Ok(Lookup::Exact("ÄRNE".to_string())));

        let view = derive(&records, &Query::Name("ärne".to_string()), None).expect("rows");
        assert_eq!(names(&view), vec!["ärne", "Ärne"]);

        let best = derive(&records, &Query::Best, None).expect("rows");
        assert_eq!(names(&best), vec!["ärne", "Bob"]);
        assert!(same_text("ÖL", "öl"));
    }

    #[test]
    fn ties_keep_first_seen_row() {
        let view = derive(&board(), &Query::BestPerTank, None).expect("rows");
        let overlord = view
            .rows()
            .iter()
            .find(|r| r.tank() == "Overlord")
            .expect("overlord row");
        assert_eq!(overlord.name(), "Cid");
        assert_eq!(view.columns()[1], Column::Tank);
    }

    #[test]
    fn name_match_ignores_case_and_sorts_by_score() {
        let view = derive(&board(), &Query::Name("ANN".to_string()), None).expect("rows");
        let scores: Vec<f64> = view.rows().iter().map(|r| r.score()).collect();
        assert_eq!(scores, vec![3_500_000.0, 2_000_000.0, 100.0]);
    }

    #[test]
    fn day_matches_only_the_date_part() {
        let day = parse_day("05-01-2024").expect("day-first date");
        assert_eq!(day, parse_day("2024-01-05").expect("year-first date"));

        let view = derive(&board(), &Query::Day(day), None).expect("rows");
        assert_eq!(names(&view), vec!["Ann", "ann"]);
    }

    #[test]
    fn bad_date_is_an_invalid_argument() {
        assert!(matches!(
            parse_day("yesterday"),
            Err(CommandError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_day("2024-13-40"),
            Err(CommandError::InvalidArgument(_))
        ));
    }

    #[test]
    fn class_filter_restricts_any_view() {
        let view = derive(&board(), &Query::Ranked, Some('Q')).expect("rows");
        assert_eq!(names(&view), vec!["Cid", "Bob"]);
        assert!(view.title().ends_with("(class Q)"));

        assert!(matches!(
            derive(&board(), &Query::Tank("Twin".to_string()), Some('q')),
            Err(CommandError::NotFound(_))
        ));
    }

    #[test]
    fn empty_board_is_not_found() {
        assert!(matches!(
            derive(&[], &Query::Best, None),
            Err(CommandError::NotFound(_))
        ));
    }

    #[test]
    fn misspelled_tank_is_suggested() {
        let tanks = distinct_tanks(&board());
        assert_eq!(
            lookup(&tanks, "destroyr", 3, 0.6),
            Ok(Lookup::Suggestions(vec!["Destroyer".to_string()]))
        );
        assert_eq!(
            lookup(&tanks, "overlord", 3, 0.6),
            Ok(Lookup::Exact("overlord".to_string()))
        );
        assert!(matches!(
            lookup(&tanks, "zzzzzzzz", 3, 0.6),
            Err(CommandError::NotFound(_))
        ));
    }

    #[test]
    fn distinct_names_ignore_case() {
        assert_eq!(distinct_names(&board()), vec!["Ann", "Bob", "Cid"]);
    }

    #[test]
    fn screenshot_lookup_by_id() {
        let records = board();
        assert_eq!(find_by_id(&records, "a7").expect("found").tank(), "Twin");
        assert!(find_by_id(&records, "B1").is_err());
    }

    #[test]
    fn recommendations_draw_from_the_right_pool() {
        let records = board();
        let catalog: Vec<String> = ["Destroyer", "Sniper", "Overlord", "Twin", "AutoTurret"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..20 {
            let unused = recommend(&records, &catalog, RecommendMode::Unused, &mut rng)
                .expect("one unused tank");
            assert_eq!(unused.message(), "The Mountain recommends **Sniper**.");

            let existing = recommend(&records, &catalog, RecommendMode::Existing, &mut rng)
                .expect("records exist");
            assert!(existing.message().contains(" by **"));
        }

        assert!(matches!(
            recommend(&records, &[], RecommendMode::Any, &mut rng),
            Err(CommandError::NotFound(_))
        ));
        assert!(matches!(
            recommend(&[], &catalog, RecommendMode::Existing, &mut rng),
            Err(CommandError::NotFound(_))
        ));
        assert_eq!(RecommendMode::from_arg("B"), Some(RecommendMode::Unused));
        assert_eq!(RecommendMode::from_arg("x"), None);
    }
}
