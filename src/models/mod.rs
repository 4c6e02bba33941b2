// src/models/mod.rs

pub mod blog;
pub mod image;
pub mod post;
pub mod user;
