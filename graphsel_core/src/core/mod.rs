pub mod cancel;
pub mod element;
pub mod error;
pub mod matrix;
pub mod mock_matrices;
pub mod runner;
pub mod select;
pub mod statistics;
