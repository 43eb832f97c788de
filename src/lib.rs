pub mod auth;
pub mod backend;
pub mod catalog;
pub mod comments;
pub mod config;
pub mod error;
pub mod guard;
pub mod serde_util;
pub mod session;
pub mod validation;
pub mod wishlist;
