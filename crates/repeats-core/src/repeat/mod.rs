//! REPEATS edges between Jingles.

pub mod model;
