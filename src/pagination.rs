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
use crate::query::DerivedView;
use crate::render::{self, RenderOptions};
use crate::Error;
use futures_util::{Stream, StreamExt as _};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// A navigation button press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Nav {
    Prev,
    Next,
}

/// Everything a reply shows for one page.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub title: String,
    pub lines: Vec<String>,
    pub footer: String,
    pub has_prev: bool,
    pub has_next: bool,
}

/**
 * Page state of one interactive reply.
 *
 * The offset always points at a row of the view and the page size never changes. Once expired, the
 * state ignores every further navigation.
 */
pub struct PageState {
    view: DerivedView,
    offset: usize,
    page_size: usize,
    warning: Option<String>,
    options: RenderOptions,
    expired: bool,
}

impl PageState {
    pub fn new(
        view: DerivedView,
        offset: usize,
        page_size: usize,
        options: RenderOptions,
    ) -> Result<PageState, CommandError> {
        if offset >= view.len() {
            return Err(CommandError::InvalidArgument(format!(
                "There are only {} rows to show.",
                view.len()
            )));
        }

        Ok(Self {
            view,
            offset,
            page_size: page_size.max(1),
            warning: None,
            options,
            expired: false,
        })
    }

    /// Attaches a warning shown in front of the footer of every page.
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    #[cfg(test)]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[cfg(test)]
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Highest page-aligned offset that still shows rows.
    pub fn max_offset(&self) -> usize {
        (self.view.len().saturating_sub(1) / self.page_size) * self.page_size
    }

    /// Moves one page back or forth, stopping at either end. Returns `None` once expired.
    pub fn navigate(&mut self, nav: Nav) -> Option<Frame> {
        if self.expired {
            return None;
        }

        self.offset = match nav {
            Nav::Prev => self.offset.saturating_sub(self.page_size),
            // A range may start past the last aligned page; never move backwards on Next.
            Nav::Next => (self.offset + self.page_size)
                .min(self.max_offset())
                .max(self.offset),
        };

        Some(self.frame())
    }

    /// Stops accepting navigation. Returns `true` only for the call that actually expired it.
    pub fn expire(&mut self) -> bool {
        !std::mem::replace(&mut self.expired, true)
    }

    /// Renders the current page.
    pub fn frame(&self) -> Frame {
        let total = self.view.len();
        let last = (self.offset + self.page_size).min(total);
        let rows = format!("Rows {}-{} / {}", self.offset + 1, last, total);

        Frame {
            title: self.view.title().clone(),
            lines: render::render(&self.view, self.offset, self.page_size, &self.options),
            footer: match &self.warning {
                Some(warning) => format!("{} {}", warning, rows),
                None => rows,
            },
            has_prev: !self.expired && self.offset > 0,
            has_next: !self.expired && self.offset < self.max_offset(),
        }
    }
}

/**
 * Something that shows pages and reports navigation presses, such as a chat message with buttons.
 */
pub trait PageSurface: Send {
    /// Transport-specific handle of a press, needed to answer it.
    type Press: Send;

    /// Waits up to `idle` for the next press; `None` when nobody pressed anything in time.
    fn next_press(
        &mut self,
        idle: Duration,
    ) -> impl Future<Output = Option<(Self::Press, Nav)>> + Send;

    /// Answers a press by showing `frame`.
    fn show(
        &mut self,
        press: Self::Press,
        frame: &Frame,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Shows `frame` with navigation disabled.
    fn close(&mut self, frame: &Frame) -> impl Future<Output = Result<(), Error>> + Send;
}

/**
 * Waits up to `idle` for the next press on `presses` that `nav_of` recognizes; others are skipped.
 *
 * The stream is meant to live as long as the reply, so presses arriving while an earlier one is
 * being answered wait in it instead of going unanswered.
 */
pub async fn next_nav<S, P, F>(presses: &mut S, idle: Duration, nav_of: F) -> Option<(P, Nav)>
where
    S: Stream<Item = P> + Unpin,
    F: Fn(&P) -> Option<Nav>,
{
    loop {
        let press = tokio::time::timeout(idle, presses.next()).await.ok()??;
        if let Some(nav) = nav_of(&press) {
            return Some((press, nav));
        }
    }
}

/**
 * Serves navigation presses until the surface stays idle for `idle`, then expires the state and
 * disables the surface's controls.
 *
 * Failing to update or close the surface (e.g. the message was deleted) is logged and never
 * propagated.
 */
pub async fn drive<S: PageSurface>(state: &mut PageState, surface: &mut S, idle: Duration) {
    while let Some((press, nav)) = surface.next_press(idle).await {
        let Some(frame) = state.navigate(nav) else {
            break;
        };
        if let Err(err) = surface.show(press, &frame).await {
            warn!(error = %err, "Could not update a paginated reply.");
        }
    }

    if state.expire() {
        if let Err(err) = surface.close(&state.frame()).await {
            debug!(error = %err, "Could not disable the buttons of an expired reply.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::PLAYER_COLUMNS;
    use crate::score::ScoreRecord;
    use futures_util::stream;
    use std::collections::VecDeque;

    const OPTIONS: RenderOptions = RenderOptions { tank_width: 9 };

    fn view(len: usize) -> DerivedView {
        DerivedView::new(
            "Test",
            &PLAYER_COLUMNS,
            (0..len)
                .map(|i| ScoreRecord::new(format!("p{}", i), "Twin", "1"))
                .collect(),
        )
    }

    fn state(len: usize, offset: usize, page_size: usize) -> PageState {
        PageState::new(view(len), offset, page_size, OPTIONS).expect("valid state")
    }

    #[test]
    fn boundaries_are_idempotent() {
        let mut s = state(23, 0, 10);
        assert_eq!(s.max_offset(), 20);

        s.navigate(Nav::Prev);
        assert_eq!(s.offset(), 0);

        s.navigate(Nav::Next);
        s.navigate(Nav::Next);
        assert_eq!(s.offset(), 20);
        let frame = s.navigate(Nav::Next).expect("not expired");
        assert_eq!(s.offset(), 20);
        assert_eq!(frame.footer, "Rows 21-23 / 23");
        assert!(frame.has_prev && !frame.has_next);
    }

    #[test]
    fn unaligned_start_never_moves_backwards() {
        let mut s = state(12, 11, 5);
        assert_eq!(s.max_offset(), 10);
        s.navigate(Nav::Next);
        assert_eq!(s.offset(), 11);
        s.navigate(Nav::Prev);
        assert_eq!(s.offset(), 6);
    }

    #[test]
    fn frame_numbers_rows_from_the_whole_view() {
        let mut s = state(30, 0, 10).with_warning("Range limited to 10 rows.");
        let frame = s.navigate(Nav::Next).expect("not expired");

        assert_eq!(frame.lines.len(), 12);
        assert!(frame.lines[2].starts_with("| 11 "));
        assert_eq!(frame.footer, "Range limited to 10 rows. Rows 11-20 / 30");
    }

    #[test]
    fn offset_past_the_end_is_rejected() {
        assert!(matches!(
            PageState::new(view(5), 5, 10, OPTIONS),
            Err(CommandError::InvalidArgument(_))
        ));
    }

    #[test]
    fn expiry_is_idempotent_and_final() {
        let mut s = state(30, 0, 10);
        assert!(s.expire());
        assert!(!s.expire());
        assert!(s.is_expired());
        assert_eq!(s.navigate(Nav::Next), None);
        assert_eq!(s.offset(), 0);

        let frame = s.frame();
        assert!(!frame.has_prev && !frame.has_next);
    }

    struct FakeSurface {
        presses: VecDeque<Nav>,
        shown: Vec<Frame>,
        closed: Vec<Frame>,
        fail: bool,
    }

    impl FakeSurface {
        fn new(presses: &[Nav], fail: bool) -> Self {
            Self {
                presses: presses.iter().copied().collect(),
                shown: Vec::new(),
                closed: Vec::new(),
                fail,
            }
        }
    }

    impl PageSurface for FakeSurface {
        type Press = ();

        async fn next_press(&mut self, _idle: Duration) -> Option<((), Nav)> {
            self.presses.pop_front().map(|nav| ((), nav))
        }

        async fn show(&mut self, _press: (), frame: &Frame) -> Result<(), Error> {
            self.shown.push(frame.clone());
            if self.fail {
                return Err("message deleted".into());
            }
            Ok(())
        }

        async fn close(&mut self, frame: &Frame) -> Result<(), Error> {
            self.closed.push(frame.clone());
            if self.fail {
                return Err("message deleted".into());
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn driver_serves_presses_then_closes_once() {
        let mut s = state(25, 0, 10);
        let mut surface = FakeSurface::new(&[Nav::Next, Nav::Next, Nav::Next, Nav::Prev], false);

        drive(&mut s, &mut surface, Duration::from_secs(1)).await;

        let footers: Vec<&str> = surface.shown.iter().map(|f| f.footer.as_str()).collect();
        assert_eq!(
            footers,
            vec![
                "Rows 11-20 / 25",
                "Rows 21-25 / 25",
                "Rows 21-25 / 25",
                "Rows 11-20 / 25"
            ]
        );
        assert!(s.is_expired());
        assert_eq!(surface.closed.len(), 1);
        assert!(!surface.closed[0].has_next);

        // A second run on an expired state neither navigates nor closes again.
        let mut late = FakeSurface::new(&[Nav::Next], false);
        drive(&mut s, &mut late, Duration::from_secs(1)).await;
        assert!(late.shown.is_empty());
        assert!(late.closed.is_empty());
    }

    #[tokio::test]
    async fn surface_failures_are_swallowed() {
        let mut s = state(25, 0, 10);
        let mut surface = FakeSurface::new(&[Nav::Next], true);

        drive(&mut s, &mut surface, Duration::from_secs(1)).await;

        assert_eq!(surface.shown.len(), 1);
        assert_eq!(surface.closed.len(), 1);
        assert!(s.is_expired());
    }

    fn nav_of(press: &&str) -> Option<Nav> {
        match *press {
            "prev" => Some(Nav::Prev),
            "next" => Some(Nav::Next),
            _ => None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn queued_presses_are_served_in_order() {
        let idle = Duration::from_secs(120);
        let mut presses = stream::iter(vec!["next", "reroll", "prev", "next"]);

        assert_eq!(next_nav(&mut presses, idle, nav_of).await, Some(("next", Nav::Next)));
        assert_eq!(next_nav(&mut presses, idle, nav_of).await, Some(("prev", Nav::Prev)));
        assert_eq!(next_nav(&mut presses, idle, nav_of).await, Some(("next", Nav::Next)));
        assert_eq!(next_nav(&mut presses, idle, nav_of).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_reply_goes_idle() {
        let idle = Duration::from_secs(120);
        let start = tokio::time::Instant::now();
        let mut presses = stream::pending::<&str>();

        assert_eq!(next_nav(&mut presses, idle, nav_of).await, None);
        assert!(start.elapsed() >= idle);
    }
}
