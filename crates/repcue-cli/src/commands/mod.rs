pub mod config;
pub mod log;
pub mod pattern;
pub mod play;
pub mod playlist;
