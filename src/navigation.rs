//! Cursor and scroll state over a result set.
//!
//! `offset` is the first visible row, `cursor` the highlighted row within the page.
//! Header rows are never selectable; every transition ends on a match row when the
//! visible page has one. Row counts are always read live, so the buffer may grow
//! between calls.

use crate::buffer::{Entry, ResultBuffer};

pub trait RowSource {
    fn row_count(&self) -> usize;
    fn is_header(&self, index: usize) -> bool;
}

impl RowSource for [Entry] {
    fn row_count(&self) -> usize {
        self.len()
    }

    fn is_header(&self, index: usize) -> bool {
        self.get(index).is_some_and(Entry::is_header)
    }
}

impl RowSource for ResultBuffer {
    fn row_count(&self) -> usize {
        self.len()
    }

    fn is_header(&self, index: usize) -> bool {
        self.get(index).is_some_and(Entry::is_header)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Navigator {
    offset: usize,
    cursor: usize,
}

impl Navigator {
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Index of the match row under the cursor.
    pub fn selected<R: RowSource + ?Sized>(&self, rows: &R) -> Option<usize> {
        let index = self.offset + self.cursor;
        (index < rows.row_count() && !rows.is_header(index)).then_some(index)
    }

    pub fn line_down<R: RowSource + ?Sized>(&mut self, rows: &R, height: usize) {
        let count = rows.row_count();
        if count == 0 || height == 0 {
            return;
        }
        let last = height - 1;
        if self.cursor >= last {
            self.page_down(rows, height);
            return;
        }
        if self.offset + self.cursor + 1 >= count {
            return;
        }

        let mut cursor = self.cursor + 1;
        if rows.is_header(self.offset + cursor) {
            if self.offset + cursor + 1 >= count {
                return;
            }
            cursor += 1;
        }
        if cursor > last {
            self.page_down(rows, height);
            return;
        }
        self.cursor = cursor;
    }

    pub fn line_up<R: RowSource + ?Sized>(&mut self, rows: &R, height: usize) {
        if rows.row_count() == 0 || height == 0 {
            return;
        }
        if self.cursor == 0 {
            self.page_up(rows, height);
            return;
        }

        let mut cursor = self.cursor - 1;
        if rows.is_header(self.offset + cursor) {
            if cursor == 0 {
                self.page_up(rows, height);
                return;
            }
            cursor -= 1;
        }
        self.cursor = cursor;
    }

    /// Advance one page; pages without a match row are skipped, and a move that
    /// would leave no row selected is undone.
    pub fn page_down<R: RowSource + ?Sized>(&mut self, rows: &R, height: usize) {
        if rows.row_count() == 0 || height == 0 {
            return;
        }
        let before = *self;
        loop {
            let prev = self.offset;
            self.page_down_once(rows, height);
            if self.selected(rows).is_some() || self.offset == prev {
                break;
            }
        }
        self.keep_selection(before, rows);
    }

    pub fn page_up<R: RowSource + ?Sized>(&mut self, rows: &R, height: usize) {
        if rows.row_count() == 0 || height == 0 {
            return;
        }
        let before = *self;
        loop {
            let prev = self.offset;
            self.page_up_once(rows, height);
            if self.selected(rows).is_some() || self.offset == prev {
                break;
            }
        }
        self.keep_selection(before, rows);
    }

    /// Re-clamp for a new page height.
    pub fn resize<R: RowSource + ?Sized>(&mut self, rows: &R, height: usize) {
        self.normalize(rows, height);
    }

    /// Bring the state back onto a match row. Runs before every render since the
    /// buffer may have grown (or the terminal shrunk) since the last transition.
    pub fn normalize<R: RowSource + ?Sized>(&mut self, rows: &R, height: usize) {
        if rows.row_count() == 0 || height == 0 {
            self.cursor = 0;
            return;
        }
        self.settle(rows, height, true);
        if self.selected(rows).is_none() {
            self.page_down(rows, height);
        }
    }

    fn page_down_once<R: RowSource + ?Sized>(&mut self, rows: &R, height: usize) {
        let count = rows.row_count();
        let max_offset = if count % height == 0 {
            count - height
        } else {
            count - count % height
        };
        let at_end = self.offset >= max_offset;
        self.offset = (self.offset + height).min(max_offset);
        self.cursor = if at_end { count - 1 - self.offset } else { 0 };
        self.settle(rows, height, true);
    }

    fn page_up_once<R: RowSource + ?Sized>(&mut self, rows: &R, height: usize) {
        let at_top = self.offset == 0;
        self.offset = self.offset.saturating_sub(height);
        self.cursor = if at_top { 0 } else { height - 1 };
        self.settle(rows, height, at_top);
    }

    /// Clamp into the visible page and step off a header, preferring `forward`.
    /// Leaves the cursor on the header when the page holds no match row.
    fn settle<R: RowSource + ?Sized>(&mut self, rows: &R, height: usize, forward: bool) {
        let count = rows.row_count();
        if self.offset >= count {
            self.offset = (count - 1) - (count - 1) % height;
        }
        let visible = (count - self.offset).min(height);
        self.cursor = self.cursor.min(visible - 1);

        let here = self.offset + self.cursor;
        if !rows.is_header(here) {
            return;
        }
        let end = self.offset + visible;
        let ahead = (here + 1..end).find(|&i| !rows.is_header(i));
        let behind = (self.offset..here).rev().find(|&i| !rows.is_header(i));
        let target = if forward {
            ahead.or(behind)
        } else {
            behind.or(ahead)
        };
        if let Some(index) = target {
            self.cursor = index - self.offset;
        }
    }

    fn keep_selection<R: RowSource + ?Sized>(&mut self, before: Navigator, rows: &R) {
        if self.selected(rows).is_none() && before.selected(rows).is_some() {
            *self = before;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// One header per file followed by that many matches.
    fn layout(files: &[usize]) -> Vec<Entry> {
        let mut rows = Vec::new();
        for (n, &matches) in files.iter().enumerate() {
            rows.push(Entry::FileHeader {
                path: PathBuf::from(format!("f{n}.c")),
            });
            for line in 0..matches {
                rows.push(Entry::MatchLine {
                    line_number: line + 1,
                    text: String::new(),
                });
            }
        }
        rows
    }

    fn start(rows: &[Entry], height: usize) -> Navigator {
        let mut nav = Navigator::default();
        nav.normalize(rows, height);
        nav
    }

    #[test]
    fn empty_buffer_is_inert() {
        let rows: Vec<Entry> = Vec::new();
        let mut nav = Navigator::default();
        nav.line_down(rows.as_slice(), 10);
        nav.page_down(rows.as_slice(), 10);
        nav.line_up(rows.as_slice(), 10);
        nav.page_up(rows.as_slice(), 10);
        assert_eq!(nav, Navigator::default());
        assert_eq!(nav.selected(rows.as_slice()), None);
    }

    #[test]
    fn initial_cursor_skips_first_header() {
        let rows = layout(&[2]);
        let nav = start(&rows, 10);
        assert_eq!(nav.selected(rows.as_slice()), Some(1));
    }

    #[test]
    fn line_down_jumps_over_headers() {
        let rows = layout(&[1, 1, 2]);
        let mut nav = start(&rows, 10);
        nav.line_down(rows.as_slice(), 10);
        assert_eq!(nav.selected(rows.as_slice()), Some(3));
        nav.line_down(rows.as_slice(), 10);
        assert_eq!(nav.selected(rows.as_slice()), Some(5));
        nav.line_down(rows.as_slice(), 10);
        assert_eq!(nav.selected(rows.as_slice()), Some(6));
        nav.line_down(rows.as_slice(), 10);
        assert_eq!(nav.selected(rows.as_slice()), Some(6), "stops at last entry");
    }

    #[test]
    fn line_up_jumps_over_headers_and_stops_at_top() {
        let rows = layout(&[1, 1]);
        let mut nav = start(&rows, 10);
        nav.line_down(rows.as_slice(), 10);
        assert_eq!(nav.selected(rows.as_slice()), Some(3));
        nav.line_up(rows.as_slice(), 10);
        assert_eq!(nav.selected(rows.as_slice()), Some(1));
        nav.line_up(rows.as_slice(), 10);
        assert_eq!(nav.selected(rows.as_slice()), Some(1));
    }

    #[test]
    fn line_down_past_page_end_turns_page() {
        let rows = layout(&[12]);
        let mut nav = start(&rows, 5);
        for _ in 0..4 {
            nav.line_down(rows.as_slice(), 5);
        }
        assert_eq!((nav.offset(), nav.cursor()), (5, 0));
        assert_eq!(nav.selected(rows.as_slice()), Some(5));
        nav.line_up(rows.as_slice(), 5);
        assert_eq!((nav.offset(), nav.cursor()), (0, 4));
    }

    #[test]
    fn header_on_last_row_moves_to_next_page() {
        // rows: H M M M H | M ...
        let rows = layout(&[3, 3]);
        let mut nav = start(&rows, 5);
        nav.line_down(rows.as_slice(), 5);
        nav.line_down(rows.as_slice(), 5);
        assert_eq!(nav.selected(rows.as_slice()), Some(3));
        nav.line_down(rows.as_slice(), 5);
        assert_eq!((nav.offset(), nav.cursor()), (5, 0));
        assert_eq!(nav.selected(rows.as_slice()), Some(5));
    }

    #[test]
    fn page_down_reaches_fixed_offset() {
        // 5 files x (header + 4 matches) = 25 rows, 20 matches
        let rows = layout(&[4, 4, 4, 4, 4]);
        assert_eq!(rows.len(), 25);
        let mut nav = start(&rows, 10);
        let mut offsets = Vec::new();
        for _ in 0..5 {
            nav.page_down(rows.as_slice(), 10);
            offsets.push(nav.offset());
        }
        assert_eq!(offsets, vec![10, 20, 20, 20, 20]);
        assert_eq!(nav.selected(rows.as_slice()), Some(24));
    }

    #[test]
    fn page_down_on_short_buffer_selects_last() {
        let rows = layout(&[3]);
        let mut nav = start(&rows, 10);
        nav.page_down(rows.as_slice(), 10);
        assert_eq!((nav.offset(), nav.cursor()), (0, 3));
    }

    #[test]
    fn page_up_from_first_page_goes_to_top() {
        let rows = layout(&[6]);
        let mut nav = start(&rows, 10);
        nav.line_down(rows.as_slice(), 10);
        nav.line_down(rows.as_slice(), 10);
        nav.page_up(rows.as_slice(), 10);
        assert_eq!(nav.selected(rows.as_slice()), Some(1));
    }

    #[test]
    fn page_up_nudges_back_off_header() {
        // row 9 is the header of the second file
        let rows = layout(&[8, 8]);
        assert!(rows[9].is_header());
        let mut nav = start(&rows, 10);
        nav.page_down(rows.as_slice(), 10);
        nav.page_up(rows.as_slice(), 10);
        assert_eq!((nav.offset(), nav.cursor()), (0, 8));
    }

    #[test]
    fn page_down_then_up_never_increases_offset() {
        let layouts: [&[usize]; 3] = [&[4, 4, 4, 4, 4], &[1, 1, 1, 1, 1, 1, 1], &[13, 2, 7]];
        for files in layouts {
            let rows = layout(files);
            for height in 1..=12 {
                let mut nav = start(&rows, height);
                for _ in 0..6 {
                    let original = nav.offset();
                    let mut probe = nav;
                    probe.page_down(rows.as_slice(), height);
                    probe.page_up(rows.as_slice(), height);
                    assert!(
                        probe.offset() <= original,
                        "files={files:?} height={height}"
                    );
                    nav.page_down(rows.as_slice(), height);
                }
            }
        }
    }

    #[test]
    fn cursor_never_rests_on_header() {
        let layouts: [&[usize]; 5] = [
            &[1, 1, 1, 1, 1, 1],
            &[3, 1, 4, 1, 5],
            &[9],
            &[2, 7, 1, 8],
            &[1],
        ];
        let mut seed: u64 = 0x5eed;
        for files in layouts {
            let rows = layout(files);
            for height in 1..=12 {
                let mut nav = start(&rows, height);
                for _ in 0..200 {
                    seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    match (seed >> 33) % 4 {
                        0 => nav.line_down(rows.as_slice(), height),
                        1 => nav.line_up(rows.as_slice(), height),
                        2 => nav.page_down(rows.as_slice(), height),
                        _ => nav.page_up(rows.as_slice(), height),
                    }
                    assert!(
                        nav.selected(rows.as_slice()).is_some(),
                        "files={files:?} height={height} nav={nav:?}"
                    );
                    assert!(nav.cursor() < height);
                }
            }
        }
    }

    #[test]
    fn growing_buffer_is_observed_live() {
        let mut rows = layout(&[2]);
        let mut nav = start(&rows, 4);
        nav.page_down(rows.as_slice(), 4);
        assert_eq!(nav.selected(rows.as_slice()), Some(2));
        rows.extend(layout(&[5]));
        nav.page_down(rows.as_slice(), 4);
        assert_eq!(nav.offset(), 4);
        assert!(nav.selected(rows.as_slice()).is_some());
    }

    #[test]
    fn resize_reclamps_cursor() {
        let rows = layout(&[20]);
        let mut nav = start(&rows, 10);
        for _ in 0..8 {
            nav.line_down(rows.as_slice(), 10);
        }
        assert_eq!(nav.cursor(), 9);
        nav.resize(rows.as_slice(), 4);
        assert_eq!(nav.cursor(), 3);
        assert!(nav.selected(rows.as_slice()).is_some());
    }
}
