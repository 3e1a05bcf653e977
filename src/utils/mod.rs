// src/utils/mod.rs

pub mod html;
pub mod join_code;
pub mod jwt;
pub mod scoring;
pub mod validate;
