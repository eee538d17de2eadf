pub mod checksum;
pub mod commands;
pub mod config;
pub mod desired;
pub mod execute;
pub mod locator;
pub mod reconcile;
pub mod report;
pub mod sources;
pub mod store;

#[cfg(test)]
mod tests;
#[cfg(test)]
mod testutil;
