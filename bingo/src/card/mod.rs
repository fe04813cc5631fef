//! Bingo cards: deterministic generation from a seed and line evaluation.
//!
//! A card is a 5×5 grid stored column-major. Column `c` draws its five
//! values from `15c + 1 ..= 15c + 15`, and the centre cell is always free.
//!
//! ## Example
//!
//! ```
//! use bingo::card::{Cell, generate_card};
//!
//! let card = generate_card(42);
//! assert_eq!(card.cell(2, 2), Cell::Free);
//! assert_eq!(card, generate_card(42));
//! ```

pub mod evaluator;
pub mod generator;

pub use evaluator::{WinLine, has_bingo, winning_line};
pub use generator::{Mulberry32, generate_card};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, ops::RangeInclusive};

/// Client-chosen value selecting a card
pub type Seed = u32;

/// Cards are square
pub const CARD_SIZE: usize = 5;

/// Column holding the free cell
pub const FREE_COLUMN: usize = 2;

/// Row holding the free cell
pub const FREE_ROW: usize = 2;

/// Highest number that can be called
pub const MAX_NUMBER: u8 = 75;

/// Count of values available to each column
pub const COLUMN_SPAN: u8 = 15;

/// Wire representation of the free cell
pub const FREE_TOKEN: &str = "FREE";

/// Inclusive range of values allowed in `column`.
pub const fn column_range(column: usize) -> RangeInclusive<u8> {
    let min = column as u8 * COLUMN_SPAN + 1;
    min..=min + COLUMN_SPAN - 1
}

/// A single card cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Number(u8),
    Free,
}

impl Cell {
    /// The number in this cell, if it is not the free cell
    pub fn number(self) -> Option<u8> {
        match self {
            Cell::Number(n) => Some(n),
            Cell::Free => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Free => write!(f, "{FREE_TOKEN}"),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Number(n) => serializer.serialize_u8(*n),
            Cell::Free => serializer.serialize_str(FREE_TOKEN),
        }
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawCell {
            Number(u8),
            Text(String),
        }

        match RawCell::deserialize(deserializer)? {
            RawCell::Number(n) => Ok(Cell::Number(n)),
            RawCell::Text(text) if text == FREE_TOKEN => Ok(Cell::Free),
            RawCell::Text(text) => Err(serde::de::Error::custom(format!(
                "expected a number or \"{FREE_TOKEN}\", got \"{text}\""
            ))),
        }
    }
}

/// A number a player claims to have marked.
///
/// Claims arrive from clients and may name numbers outside the card
/// universe; those are kept so the claim can be rejected rather than
/// failing to parse. String digits are accepted as numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mark {
    Number(i64),
    Free,
}

impl Serialize for Mark {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Mark::Number(n) => serializer.serialize_i64(*n),
            Mark::Free => serializer.serialize_str(FREE_TOKEN),
        }
    }
}

impl<'de> Deserialize<'de> for Mark {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawMark {
            Number(i64),
            Text(String),
        }

        match RawMark::deserialize(deserializer)? {
            RawMark::Number(n) => Ok(Mark::Number(n)),
            RawMark::Text(text) if text == FREE_TOKEN => Ok(Mark::Free),
            RawMark::Text(text) => text
                .trim()
                .parse()
                .map(Mark::Number)
                .map_err(|_| serde::de::Error::custom(format!("invalid mark \"{text}\""))),
        }
    }
}

impl From<u8> for Mark {
    fn from(value: u8) -> Self {
        Mark::Number(i64::from(value))
    }
}

/// A generated bingo card, stored as five columns of five cells
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Card {
    columns: [[Cell; CARD_SIZE]; CARD_SIZE],
}

impl Card {
    /// Build a card from column-major cells
    pub fn from_columns(columns: [[Cell; CARD_SIZE]; CARD_SIZE]) -> Self {
        Self { columns }
    }

    /// Column-major cells
    pub fn columns(&self) -> &[[Cell; CARD_SIZE]; CARD_SIZE] {
        &self.columns
    }

    /// Cell at `column`, `row`
    ///
    /// # Panics
    ///
    /// Panics if either index is not below [`CARD_SIZE`].
    pub fn cell(&self, column: usize, row: usize) -> Cell {
        self.columns[column][row]
    }

    /// All numbers on the card, column by column
    pub fn numbers(&self) -> impl Iterator<Item = u8> + '_ {
        self.columns.iter().flatten().filter_map(|cell| cell.number())
    }

    /// Whether `number` appears on the card
    pub fn contains(&self, number: u8) -> bool {
        self.numbers().any(|n| n == number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_ranges_are_disjoint_and_cover_universe() {
        assert_eq!(column_range(0), 1..=15);
        assert_eq!(column_range(2), 31..=45);
        assert_eq!(column_range(4), 61..=75);

        let covered: Vec<u8> = (0..CARD_SIZE).flat_map(column_range).collect();
        assert_eq!(covered, (1..=MAX_NUMBER).collect::<Vec<_>>());
    }

    #[test]
    fn test_cell_wire_format() {
        assert_eq!(serde_json::to_string(&Cell::Number(7)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&Cell::Free).unwrap(), "\"FREE\"");
        assert_eq!(serde_json::from_str::<Cell>("\"FREE\"").unwrap(), Cell::Free);
        assert!(serde_json::from_str::<Cell>("\"free-ish\"").is_err());
    }

    #[test]
    fn test_mark_accepts_numbers_strings_and_free() {
        let marks: Vec<Mark> = serde_json::from_str(r#"[3, "17", "FREE", 300, -1]"#).unwrap();
        assert_eq!(
            marks,
            vec![
                Mark::Number(3),
                Mark::Number(17),
                Mark::Free,
                Mark::Number(300),
                Mark::Number(-1)
            ]
        );
        assert!(serde_json::from_str::<Mark>("\"seventeen\"").is_err());
    }

    #[test]
    fn test_card_serializes_column_major() {
        let card = generate_card(1);
        let json = serde_json::to_value(&card).unwrap();
        let columns = json.as_array().unwrap();
        assert_eq!(columns.len(), CARD_SIZE);
        assert_eq!(columns[FREE_COLUMN][FREE_ROW], "FREE");

        let back: Card = serde_json::from_value(json).unwrap();
        assert_eq!(back, card);
    }
}
