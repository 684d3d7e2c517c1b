pub mod config;
pub mod connection;
pub mod constants;
pub mod driver;
pub mod errors;
pub mod latch;
pub mod parsers;
pub mod pool;
pub mod protocol;
pub mod recorder;
pub mod runner;
pub mod state;
pub mod summary;

#[cfg(test)]
mod test_support;
