/*!
Core modules for the snapshot-diff phishing monitor
*/

pub mod config;
pub mod cycle;
pub mod error;
pub mod list_source;
pub mod lookup;
pub mod message;
pub mod output_plugins;
pub mod scheduler;
pub mod state_manager;
pub mod tracker;
