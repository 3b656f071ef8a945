//! statrelay agent: samples host statistics into a shared store and ships
//! cumulative batches to the collector over HTTP.

pub mod config;
pub mod pipeline;
pub mod transport;
