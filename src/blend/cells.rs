//! The pad as a grid of cells.
//!
//! Drag blending reports which cell the puck is in, and a full interpolation
//! decodes one pattern per cell centre so the pad can show a heat map.

use crate::pipeline::pattern::Pattern;
use crate::shared::Point2D;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub col: usize,
    pub row: usize,
    pub index: usize,
}

#[derive(Clone, Debug)]
pub struct CellGrid {
    cols: usize,
    rows: usize,
    patterns: Vec<Pattern>, // row-major, empty until an interpolation finishes
}

impl CellGrid {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols: cols.max(1),
            rows: rows.max(1),
            patterns: Vec::new(),
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.cols * self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_cell(&self, p: Point2D) -> Cell {
        let p = p.clamped();
        let col = ((p.x * self.cols as f32).floor() as usize).min(self.cols - 1);
        let row = ((p.y * self.rows as f32).floor() as usize).min(self.rows - 1);
        Cell {
            col,
            row,
            index: row * self.cols + col,
        }
    }

    pub fn center_of(&self, col: usize, row: usize) -> Point2D {
        Point2D::new(
            (col as f32 + 0.5) / self.cols as f32,
            (row as f32 + 0.5) / self.rows as f32,
        )
    }

    // cell centres in index order
    pub fn centers(&self) -> Vec<Point2D> {
        (0..self.len())
            .map(|index| self.center_of(index % self.cols, index / self.cols))
            .collect()
    }

    pub fn set_patterns(&mut self, patterns: Vec<Pattern>) {
        if patterns.len() != self.len() {
            log::warn!(
                "ignoring {} cell patterns for a {}x{} pad",
                patterns.len(),
                self.cols,
                self.rows
            );
            return;
        }
        self.patterns = patterns;
    }

    pub fn pattern(&self, index: usize) -> Option<&Pattern> {
        self.patterns.get(index)
    }

    pub fn has_patterns(&self) -> bool {
        !self.patterns.is_empty()
    }

    pub fn densities(&self) -> Vec<f32> {
        self.patterns.iter().map(Pattern::density).collect()
    }
}
