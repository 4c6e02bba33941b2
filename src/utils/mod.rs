pub mod hash;
pub mod jwt;
pub mod patch;
pub mod payload;
