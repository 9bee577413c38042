//! Retirement projections and a keyword-driven question answerer built on
//! closed-form time-value-of-money formulas.

pub mod api;
pub mod core;
