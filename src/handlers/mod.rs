// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod blog;
pub mod image;
pub mod post;
pub mod site;
pub mod user;
