//! Core types for Itemdeck.
//!
//! This module provides type-safe wrappers for the domain concepts shared by
//! the stores and their front ends.

pub mod email;
pub mod id;
pub mod item;
pub mod price;
pub mod status;
pub mod token;
pub mod user;

pub use email::{Email, EmailError};
pub use id::*;
pub use item::{CATEGORIES, Item, ItemsPage, Rating, RawRecord, category_for};
pub use price::Price;
pub use status::FetchStatus;
pub use token::SessionToken;
pub use user::User;
