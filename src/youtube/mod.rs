pub mod cache;
pub mod constants;
pub mod download;
pub mod error;
pub mod events;
pub mod manager;
pub mod models;
pub mod player;
pub mod playlist;
pub mod search;
pub mod streaming;
pub mod ytdlp;

#[cfg(test)]
mod tests;
