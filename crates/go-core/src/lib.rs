//! Core types for Go game review.
//!
//! This crate provides the fundamental types shared by the engine session,
//! the game record and the analysis driver:
//! - [`Color`] for the two players
//! - [`Point`] and [`Move`] for board positions
//! - translation between engine vertices (`D4`) and SGF point codes (`dp`)

mod color;
mod point;

pub use color::Color;
pub use point::{
    convert_coordinate, parse_coordinate, CoordinateError, Move, Point, MAX_BOARD_SIZE,
};
