// src/models/mod.rs

pub mod answer;
pub mod leaderboard;
pub mod profile;
pub mod question;
pub mod quiz;
pub mod session;
