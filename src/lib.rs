pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod scores;
pub mod store;
