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
use crate::query::{Column, DerivedView};
use crate::score::ScoreRecord;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Unit appended to scores, which are shown in millions.
pub const SCORE_UNIT: &str = "M";

/// Characters a code block fence adds around its content ("```\n" + "\n```").
pub const FENCE_OVERHEAD: usize = 8;

/// Long tank name fragments and their short forms.
const TANK_ABBREVIATIONS: &[(&str, &str)] = &[
    ("Annihilator", "Ann."),
    ("Destroyer", "D."),
    ("Overlord", "OL."),
    ("Overseer", "OS."),
    ("Triple", "T."),
    ("Penta", "P."),
    ("Quad", "Q."),
    ("Auto", "A."),
];

/// Display settings that do not depend on the view.
#[derive(Clone, Copy, Debug)]
pub struct RenderOptions {
    /// Width tank labels are truncated to.
    pub tank_width: usize,
}

/// Formats a score in millions, e.g. `2000000` as `2.000 M`.
pub fn format_score(score: f64) -> String {
    format!("{:.3} {}", score / 1_000_000.0, SCORE_UNIT)
}

/// Keeps the `YYYY-MM-DD` part of a date, whatever precision it was written with.
pub fn format_date(date: Option<&str>) -> String {
    date.map(|d| d.trim().chars().take(10).collect())
        .unwrap_or_default()
}

/**
 * Shortens a tank label for tables: known fragments are abbreviated (in any case), the rest is
 * title-cased (any non-letter starts a new word) and the result is cut to `width` columns.
 */
pub fn abbreviate_tank(tank: &str, width: usize) -> String {
    truncate_to_width(&shorten(tank.trim()), width)
}

fn abbreviation_at(text: &str, at: usize) -> Option<(usize, &'static str)> {
    TANK_ABBREVIATIONS.iter().find_map(|(long, short)| {
        text.get(at..at + long.len())
            .filter(|found| found.eq_ignore_ascii_case(long))
            .map(|_| (long.len(), *short))
    })
}

fn shorten(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    let mut at = 0;
    while let Some(c) = text[at..].chars().next() {
        // Abbreviations are written as they are; the word after one starts anew.
        if let Some((consumed, short)) = abbreviation_at(text, at) {
            out.push_str(short);
            in_word = false;
            at += consumed;
            continue;
        }

        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
        at += c.len_utf8();
    }
    out
}

fn truncate_to_width(text: &str, width: usize) -> String {
    let mut used = 0;
    text.chars()
        .take_while(|c| {
            used += c.width().unwrap_or(0);
            used <= width
        })
        .collect()
}

fn cell(column: Column, position: usize, record: &ScoreRecord, options: &RenderOptions) -> String {
    match column {
        Column::Index => position.to_string(),
        Column::Score => format_score(record.score()),
        Column::Name => record.name().clone(),
        Column::Tank => abbreviate_tank(record.tank(), options.tank_width),
        Column::Date => format_date(record.date().as_deref()),
    }
}

/**
 * Renders `count` rows of a view, starting at row `offset`, as a fixed-width grid.
 *
 * The output is a header line, a separator line and one line per row. Row numbers count from the
 * start of the whole view, not of the rendered slice. Column widths are display widths, so the
 * grid lines up in a monospace font even with wide characters.
 */
pub fn render(
    view: &DerivedView,
    offset: usize,
    count: usize,
    options: &RenderOptions,
) -> Vec<String> {
    let columns = view.columns();
    let header: Vec<String> = columns.iter().map(|c| c.label().to_string()).collect();
    let body: Vec<Vec<String>> = view
        .rows()
        .iter()
        .enumerate()
        .skip(offset)
        .take(count)
        .map(|(i, record)| {
            columns
                .iter()
                .map(|c| cell(*c, i + 1, record, options))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = (0..columns.len())
        .map(|i| {
            std::iter::once(&header)
                .chain(body.iter())
                .map(|row| UnicodeWidthStr::width(row[i].as_str()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_row = |row: &[String]| {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(text, width)| {
                let padding = width.saturating_sub(UnicodeWidthStr::width(text.as_str()));
                format!("{}{}", text, " ".repeat(padding))
            })
            .collect();
        format!("| {} |", cells.join(" | "))
    };
    let separator = format!(
        "| {} |",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join(" | ")
    );

    let mut lines = Vec::with_capacity(body.len() + 2);
    lines.push(format_row(header.as_slice()));
    lines.push(separator);
    lines.extend(body.iter().map(|row| format_row(row.as_slice())));
    lines
}

/**
 * Groups lines into chunks of at most `limit` characters, breaking only between lines.
 *
 * A single line longer than `limit` is cut short, since it could not be sent otherwise.
 */
pub fn chunk_lines(lines: &[String], limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    let mut current_lines = 0;

    for line in lines {
        let line: String = line.chars().take(limit).collect();
        let line_len = line.chars().count();

        if current_lines > 0 && current_len + 1 + line_len > limit {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
            current_lines = 0;
        }
        if current_lines > 0 {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(&line);
        current_len += line_len;
        current_lines += 1;
    }
    if current_lines > 0 {
        chunks.push(current);
    }

    chunks
}

/// Wraps text in a code block.
pub fn code_block(text: &str) -> String {
    format!("```\n{}\n```", text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{PLAYER_COLUMNS, TANK_COLUMNS};

    const OPTIONS: RenderOptions = RenderOptions { tank_width: 9 };

    /// Reads column labels and widths back from a header and separator line.
    fn parse_header(header: &str, separator: &str) -> Vec<(String, usize)> {
        let strip = |line: &str| {
            line.trim_start_matches("| ")
                .trim_end_matches(" |")
                .split(" | ")
                .map(str::to_string)
                .collect::<Vec<_>>()
        };

        strip(header)
            .into_iter()
            .zip(strip(separator))
            .map(|(label, dashes)| (label.trim_end().to_string(), dashes.len()))
            .collect()
    }

    fn view(rows: Vec<ScoreRecord>) -> DerivedView {
        DerivedView::new("Test", &PLAYER_COLUMNS, rows)
    }

    #[test]
    fn scenario_row_is_formatted() {
        let v = view(vec![
            ScoreRecord::new("Ann", "AutoTurret", "2,000,000").with_date("2024-01-05 10:00"),
        ]);
        let lines = render(&v, 0, 10, &OPTIONS);

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "| 1 | 2.000 M | Ann  | A.Turret | 2024-01-05 |");
    }

    #[test]
    fn values_are_formatted() {
        assert_eq!(format_score(0.0), "0.000 M");
        assert_eq!(format_score(1_234_567.0), "1.235 M");
        assert_eq!(format_date(Some("2024-01-05T10:00:00Z")), "2024-01-05");
        assert_eq!(format_date(Some("2024")), "2024");
        assert_eq!(format_date(None), "");
    }

    #[test]
    fn tank_abbreviation_tolerates_anything() {
        assert_eq!(abbreviate_tank("AutoTurret", 9), "A.Turret");
        assert_eq!(abbreviate_tank("Triple Twin", 9), "T. Twin");
        assert_eq!(abbreviate_tank("hybrid", 9), "Hybrid");
        assert_eq!(abbreviate_tank("BattleshipCarrier", 9), "Battleshi");
        assert_eq!(abbreviate_tank("", 9), "");
        assert_eq!(abbreviate_tank("戦車戦車戦車", 9), "戦車戦車");
    }

    #[test]
    fn abbreviations_ignore_case_and_keep_their_spelling() {
        assert_eq!(abbreviate_tank("autoturret", 9), "A.Turret");
        assert_eq!(abbreviate_tank("OVERLORD", 9), "OL.");
        assert_eq!(abbreviate_tank("Overseer", 9), "OS.");
        assert_eq!(abbreviate_tank("overlord-x", 9), "OL.-X");
        assert_eq!(abbreviate_tank("Ärger", 9), "Ärger");
    }

    #[test]
    fn header_round_trip_recovers_columns_and_widths() {
        let v = DerivedView::new(
            "Test",
            &TANK_COLUMNS,
            vec![
                ScoreRecord::new("Ann", "Destroyer", "3500000").with_date("2024-01-05"),
                ScoreRecord::new("Žofie", "Overlord", "12"),
                ScoreRecord::new("漢字の名前", "Twin", "999999999"),
            ],
        );
        let lines = render(&v, 0, 10, &OPTIONS);
        let parsed = parse_header(&lines[0], &lines[1]);

        let labels: Vec<&str> = parsed.iter().map(|(l, _)| l.as_str()).collect();
        let expected: Vec<&str> = TANK_COLUMNS.iter().map(|c| c.label()).collect();
        assert_eq!(labels, expected);

        for (i, record) in v.rows().iter().enumerate() {
            for (column, (_, width)) in TANK_COLUMNS.iter().zip(&parsed) {
                let text = cell(*column, i + 1, record, &OPTIONS);
                assert!(UnicodeWidthStr::width(text.as_str()) <= *width);
            }
        }

        let display_width = UnicodeWidthStr::width(lines[0].as_str());
        assert!(lines
            .iter()
            .all(|l| UnicodeWidthStr::width(l.as_str()) == display_width));
    }

    #[test]
    fn row_numbers_count_from_the_whole_view() {
        let rows = (0..30)
            .map(|i| ScoreRecord::new(format!("p{}", i), "Twin", "1"))
            .collect();
        let lines = render(&view(rows), 20, 5, &OPTIONS);

        assert_eq!(lines.len(), 7);
        assert!(lines[2].starts_with("| 21 "));
        assert!(lines[6].starts_with("| 25 "));
    }

    #[test]
    fn chunks_respect_the_limit_and_line_boundaries() {
        let lines: Vec<String> = (0..200).map(|i| format!("line number {:03}", i)).collect();
        let chunks = chunk_lines(&lines, 100);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
        let rejoined: Vec<String> = chunks
            .iter()
            .flat_map(|c| c.lines().map(str::to_string))
            .collect();
        assert_eq!(rejoined, lines);
    }

    #[test]
    fn overlong_line_is_cut() {
        let chunks = chunk_lines(&["x".repeat(50), "short".to_string()], 20);
        assert_eq!(chunks, vec!["x".repeat(20), "short".to_string()]);
        assert!(chunk_lines(&[], 20).is_empty());
    }
}
