pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod logging;

#[cfg(test)]
mod test_utils;
