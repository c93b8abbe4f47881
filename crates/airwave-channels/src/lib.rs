//! # Airwave Channels
//! Discord glue: REST client, gateway event source, and embed builders.

pub mod discord;
pub mod embeds;
pub mod gateway;
