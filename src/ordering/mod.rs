pub mod constraint;
pub mod error;
pub mod solver;
