// src/handlers/mod.rs

pub mod admin;
pub mod host;
pub mod leaderboard;
pub mod profile;
pub mod quiz;
pub mod session;
