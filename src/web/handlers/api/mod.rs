//! API 处理器

pub mod cache;
pub mod history;
pub mod services;
pub mod translation;

pub use cache::*;
pub use history::*;
pub use services::*;
pub use translation::*;
