pub mod engine;
pub mod export;
pub mod signals;
