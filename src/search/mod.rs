pub mod context;
pub mod fusion;
pub mod index;
pub mod retrieve;
