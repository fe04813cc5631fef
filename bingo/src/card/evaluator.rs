//! Win evaluation for a card against a set of marked numbers.

use super::{CARD_SIZE, Card, Cell};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt};

/// A completed line on a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "camelCase")]
pub enum WinLine {
    Row(usize),
    Column(usize),
    /// Top-left to bottom-right
    Diagonal,
    /// Top-right to bottom-left
    AntiDiagonal,
}

impl WinLine {
    /// Every line in evaluation order: rows, columns, then both diagonals
    pub fn all() -> impl Iterator<Item = WinLine> {
        (0..CARD_SIZE)
            .map(WinLine::Row)
            .chain((0..CARD_SIZE).map(WinLine::Column))
            .chain([WinLine::Diagonal, WinLine::AntiDiagonal])
    }

    /// `(column, row)` coordinates of the cells on this line
    pub fn cells(self) -> [(usize, usize); CARD_SIZE] {
        std::array::from_fn(|i| match self {
            WinLine::Row(row) => (i, row),
            WinLine::Column(column) => (column, i),
            WinLine::Diagonal => (i, i),
            WinLine::AntiDiagonal => (i, CARD_SIZE - 1 - i),
        })
    }
}

impl fmt::Display for WinLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WinLine::Row(row) => write!(f, "row {row}"),
            WinLine::Column(column) => write!(f, "column {column}"),
            WinLine::Diagonal => write!(f, "diagonal"),
            WinLine::AntiDiagonal => write!(f, "anti-diagonal"),
        }
    }
}

/// First complete line on `card` given `marked`, if any.
///
/// The free cell always counts as marked. Callers are responsible for
/// making sure every marked number was actually called.
pub fn winning_line(card: &Card, marked: &HashSet<u8>) -> Option<WinLine> {
    WinLine::all().find(|line| {
        line.cells()
            .iter()
            .all(|&(column, row)| match card.cell(column, row) {
                Cell::Free => true,
                Cell::Number(n) => marked.contains(&n),
            })
    })
}

pub fn has_bingo(card: &Card, marked: &HashSet<u8>) -> bool {
    winning_line(card, marked).is_some()
}
