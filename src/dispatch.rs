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
use crate::error::CommandError;
use crate::query::same_text;
use parking_lot::Mutex;
use regex::Regex;
use serenity::all::UserId;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

/// Field separator of text commands.
pub const DELIMITER: char = ';';

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s*-\s*(\d+)$").expect("Failed to compile the row range regex.")
});

/**
 * The command keyword, selecting what the bot computes.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    /// Whole table, restricted to the privileged user.
    All,
    /// Best score of every submitter.
    Best,
    /// Best score of every tank.
    BestPerTank,
    /// Every score of one submitter.
    Name,
    /// Every score of one tank.
    Tank,
    /// Every score submitted on one day.
    Date,
    /// A range of rows of the whole table.
    Page,
    /// Random tank recommendation.
    Random,
    /// Screenshot of one submission.
    Screenshot,
    Help,
}

impl Verb {
    fn from_keyword(word: &str) -> Option<Verb> {
        let verb = match word.to_lowercase().as_str() {
            "a" | "all" => Verb::All,
            "b" | "best" => Verb::Best,
            "c" | "tanks" => Verb::BestPerTank,
            "n" | "name" => Verb::Name,
            "t" | "tank" => Verb::Tank,
            "d" | "date" => Verb::Date,
            "p" | "page" => Verb::Page,
            "r" | "random" => Verb::Random,
            "s" | "shot" => Verb::Screenshot,
            "h" | "help" => Verb::Help,
            _ => return None,
        };

        Some(verb)
    }

    /// Number of positional arguments the verb reads before an optional class filter.
    pub fn positional(&self) -> usize {
        match self {
            Verb::Name | Verb::Tank | Verb::Date | Verb::Random | Verb::Screenshot => 1,
            Verb::All | Verb::Best | Verb::BestPerTank | Verb::Page | Verb::Help => 0,
        }
    }
}

/**
 * A requested window of rows, 1-based and inclusive on both ends.
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowRange {
    start: usize,
    end: usize,
    clamped: bool,
}

impl RowRange {
    /**
     * Validates a `start-end` pair.
     *
     * Ranges longer than `max_len` rows are not rejected: they are cut down to `max_len` rows
     * starting at `start`, and flagged so the reply can warn about it.
     */
    pub fn new(start: usize, end: usize, max_len: usize) -> Result<RowRange, CommandError> {
        if start == 0 {
            return Err(CommandError::InvalidArgument(
                "Rows are numbered from 1, e.g. `1-10`.".to_string(),
            ));
        }
        if end < start {
            return Err(CommandError::InvalidArgument(format!(
                "The range `{}-{}` ends before it starts.",
                start, end
            )));
        }

        let max_len = max_len.max(1);
        if end - start + 1 > max_len {
            return Ok(Self {
                start,
                end: start.saturating_add(max_len - 1),
                clamped: true,
            });
        }

        Ok(Self {
            start,
            end,
            clamped: false,
        })
    }

    #[cfg(test)]
    pub fn start(&self) -> usize {
        self.start
    }

    #[cfg(test)]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Zero-based index of the first row.
    pub fn offset(&self) -> usize {
        self.start - 1
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Whether the requested range was longer than allowed and got cut down.
    pub fn clamped(&self) -> bool {
        self.clamped
    }
}

/**
 * A recognised text command.
 */
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    verb: Verb,
    args: Vec<String>,
    range: Option<(usize, usize)>,
}

impl Command {
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// Positional argument `index`, not counting the verb nor the range.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// The validated row range, if the command carried one.
    pub fn row_range(&self, max_len: usize) -> Result<Option<RowRange>, CommandError> {
        self.range
            .map(|(start, end)| RowRange::new(start, end, max_len))
            .transpose()
    }

    /// Classification code restricting the rows of table commands, if given.
    pub fn class_filter(&self) -> Option<char> {
        let code = self.arg(self.verb.positional())?;
        let mut chars = code.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => Some(c),
            _ => None,
        }
    }
}

/**
 * Checks that `author` may run `verb`. Only the configured privileged user may list every row.
 */
pub fn authorize(verb: Verb, author: &str, config: &BotConfig) -> Result<(), CommandError> {
    match verb {
        Verb::All if !same_text(author.trim(), config.privileged_user.trim()) => {
            Err(CommandError::PermissionDenied)
        }
        _ => Ok(()),
    }
}

/**
 * Parses a message into a command.
 *
 * Returns `None` for anything that is not addressed to the bot or whose verb is unknown, so such
 * messages are simply ignored.
 */
pub fn parse(raw: &str, prefix: &str) -> Option<Command> {
    let mut fields = raw.trim().split(DELIMITER).map(str::trim);

    if fields.next()? != prefix {
        return None;
    }
    let verb = Verb::from_keyword(fields.next()?)?;

    let mut args = Vec::new();
    let mut range = None;
    for field in fields.filter(|f| !f.is_empty()) {
        if range.is_none() {
            if let Some(caps) = RANGE_RE.captures(field) {
                // Absurdly long numbers saturate, and are then clamped or rejected like any other.
                let number = |i: usize| caps[i].parse::<usize>().unwrap_or(usize::MAX);
                range = Some((number(1), number(2)));
                continue;
            }
        }
        args.push(field.to_string());
    }

    Some(Command { verb, args, range })
}

/**
 * Per-sender rate limit: a command arriving before the sender's cooldown window has elapsed since
 * their last accepted command is dropped.
 */
pub struct Cooldowns {
    window: Duration,
    last_accepted: Mutex<HashMap<UserId, Instant>>,
}

impl Cooldowns {
    pub fn new(window: Duration) -> Cooldowns {
        Self {
            window,
            last_accepted: Mutex::new(HashMap::new()),
        }
    }

    /// Accepts a command from `user` now, unless they are still cooling down.
    pub fn try_accept(&self, user: UserId) -> bool {
        self.try_accept_at(user, Instant::now())
    }

    fn try_accept_at(&self, user: UserId, now: Instant) -> bool {
        let mut last_accepted = self.last_accepted.lock();

        if let Some(last) = last_accepted.get(&user) {
            if now.saturating_duration_since(*last) < self.window {
                return false;
            }
        }

        // Forget senders whose window is over, so the map does not grow forever.
        let window = self.window;
        last_accepted.retain(|_, last| now.saturating_duration_since(*last) < window);
        last_accepted.insert(user, now);

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verb_is_case_insensitive_and_unknown_verbs_are_ignored() {
        assert_eq!(parse("!olymp;B", "!olymp").map(|c| c.verb()), Some(Verb::Best));
        assert_eq!(parse("!olymp;Tanks", "!olymp").map(|c| c.verb()), Some(Verb::BestPerTank));
        assert_eq!(parse("!olymp;zzz", "!olymp"), None);
        assert_eq!(parse("!olymp", "!olymp"), None);
        assert_eq!(parse("hello;b", "!olymp"), None);
        assert_eq!(parse("!olympus;b", "!olymp"), None);
    }

    #[test]
    fn only_the_privileged_user_lists_everything() {
        let config = BotConfig {
            privileged_user: String::from("Tejm_of_Curonia"),
            ..BotConfig::default()
        };

        assert_eq!(authorize(Verb::All, "Tejm_of_Curonia", &config), Ok(()));
        assert_eq!(authorize(Verb::All, "tejm_of_curonia", &config), Ok(()));
        assert_eq!(
            authorize(Verb::All, "someone_else", &config),
            Err(CommandError::PermissionDenied)
        );
        assert_eq!(authorize(Verb::Best, "someone_else", &config), Ok(()));

        // Refusal comes first, even for a command that would fail its own validation.
        let cmd = parse("!olymp;a;0-3", "!olymp").expect("command");
        assert_eq!(
            authorize(cmd.verb(), "someone_else", &config),
            Err(CommandError::PermissionDenied)
        );
        assert!(cmd.row_range(15).is_err());
    }

    #[test]
    fn range_is_extracted_from_any_position() {
        let cmd = parse("!olymp;n;3-7;Ann;x", "!olymp").expect("command");
        assert_eq!(cmd.arg(0), Some("Ann"));
        assert_eq!(cmd.arg(1), Some("x"));
        assert_eq!(cmd.class_filter(), Some('x'));

        let range = cmd.row_range(15).expect("valid").expect("present");
        assert_eq!((range.start(), range.end(), range.offset()), (3, 7, 2));
        assert!(!range.clamped());
    }

    #[test]
    fn only_the_first_range_is_taken() {
        let cmd = parse("!olymp;p;1-5;6-9", "!olymp").expect("command");
        let range = cmd.row_range(15).expect("valid").expect("present");
        assert_eq!(range.end(), 5);
        assert_eq!(cmd.arg(0), Some("6-9"));
    }

    #[test]
    fn dates_are_not_mistaken_for_ranges() {
        let cmd = parse("!olymp;d;2024-01-05", "!olymp").expect("command");
        assert_eq!(cmd.arg(0), Some("2024-01-05"));
        assert_eq!(cmd.row_range(15), Ok(None));
    }

    #[test]
    fn oversized_range_is_clamped_from_its_start() {
        let range = RowRange::new(4, 100, 15).expect("clamped, not rejected");
        assert_eq!((range.start(), range.end(), range.len()), (4, 18, 15));
        assert!(range.clamped());

        let range = RowRange::new(1, 15, 15).expect("exactly the limit");
        assert!(!range.clamped());
    }

    #[test]
    fn backwards_or_zero_ranges_are_invalid() {
        assert!(matches!(
            RowRange::new(9, 3, 15),
            Err(CommandError::InvalidArgument(_))
        ));
        assert!(matches!(
            RowRange::new(0, 3, 15),
            Err(CommandError::InvalidArgument(_))
        ));
    }

    #[test]
    fn class_filter_needs_a_single_letter_after_positional_args() {
        assert_eq!(parse("!olymp;b;q", "!olymp").and_then(|c| c.class_filter()), Some('q'));
        assert_eq!(parse("!olymp;b;qq", "!olymp").and_then(|c| c.class_filter()), None);
        // The name itself is never taken as a filter.
        assert_eq!(parse("!olymp;n;q", "!olymp").and_then(|c| c.class_filter()), None);
    }

    #[test]
    fn cooldown_drops_commands_inside_the_window() {
        let cooldowns = Cooldowns::new(Duration::from_secs(5));
        let ann = UserId::new(1);
        let bob = UserId::new(2);
        let t0 = Instant::now();

        assert!(cooldowns.try_accept_at(ann, t0));
        assert!(!cooldowns.try_accept_at(ann, t0 + Duration::from_secs(2)));
        assert!(cooldowns.try_accept_at(bob, t0 + Duration::from_secs(2)));
        // Dropped commands do not extend the window.
        assert!(cooldowns.try_accept_at(ann, t0 + Duration::from_secs(5)));
    }
}
