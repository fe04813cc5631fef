//! Deterministic card generation.

use super::{CARD_SIZE, COLUMN_SPAN, Card, Cell, FREE_COLUMN, FREE_ROW, Seed, column_range};

/// Mulberry32 bit-mixing generator.
///
/// Small, fast and fully reproducible from a 32-bit seed. Not suitable for
/// anything that needs unpredictability; cards only need to be stable.
#[derive(Debug, Clone)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: Seed) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Uniform value in `[0, 1)`
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / 4_294_967_296.0
    }
}

/// Generate the card selected by `seed`.
///
/// Each column draws from its own range with rejection sampling until five
/// distinct values are collected, keeping draw order. The centre cell is
/// then replaced by [`Cell::Free`]. The same seed always yields the same
/// card, so a reconnecting player recovers their card by seed alone.
pub fn generate_card(seed: Seed) -> Card {
    let mut rng = Mulberry32::new(seed);
    let mut columns = [[Cell::Free; CARD_SIZE]; CARD_SIZE];

    for (index, column) in columns.iter_mut().enumerate() {
        let min = *column_range(index).start();
        let mut drawn: Vec<u8> = Vec::with_capacity(CARD_SIZE);

        while drawn.len() < CARD_SIZE {
            let value = min + (rng.next_f64() * f64::from(COLUMN_SPAN)) as u8;
            if !drawn.contains(&value) {
                drawn.push(value);
            }
        }

        for (cell, value) in column.iter_mut().zip(drawn) {
            *cell = Cell::Number(value);
        }
    }

    columns[FREE_COLUMN][FREE_ROW] = Cell::Free;
    Card::from_columns(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_mulberry32_is_reproducible() {
        let mut a = Mulberry32::new(1234);
        let mut b = Mulberry32::new(1234);
        let first: Vec<u32> = (0..16).map(|_| a.next_u32()).collect();
        let second: Vec<u32> = (0..16).map(|_| b.next_u32()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_mulberry32_known_output() {
        let mut rng = Mulberry32::new(0);
        assert_eq!(rng.next_u32(), 1_144_304_738);
        assert_eq!(rng.next_u32(), 1_416_247);

        let mut rng = Mulberry32::new(0);
        assert_eq!(rng.next_f64(), 0.266_429_208_684_712_65);
    }

    #[test]
    fn test_mulberry32_range() {
        let mut rng = Mulberry32::new(99);
        for _ in 0..1000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_different_seeds_give_different_cards() {
        assert_ne!(generate_card(1), generate_card(2));
    }

    #[test]
    fn test_free_cell_is_only_centre() {
        let card = generate_card(7);
        for column in 0..CARD_SIZE {
            for row in 0..CARD_SIZE {
                let is_centre = column == FREE_COLUMN && row == FREE_ROW;
                assert_eq!(card.cell(column, row) == Cell::Free, is_centre);
            }
        }
        assert_eq!(card.numbers().count(), CARD_SIZE * CARD_SIZE - 1);
    }

    #[test]
    fn test_columns_unique_and_in_range() {
        for seed in [0, 1, 42, 65_535, u32::MAX] {
            let card = generate_card(seed);
            for (index, column) in card.columns().iter().enumerate() {
                let values: Vec<u8> = column.iter().filter_map(|c| c.number()).collect();
                let unique: HashSet<u8> = values.iter().copied().collect();
                assert_eq!(unique.len(), values.len(), "duplicate in column {index}");
                assert!(values.iter().all(|v| column_range(index).contains(v)));
            }
        }
    }
}
