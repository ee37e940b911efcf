pub mod ai;
pub mod answers;
pub mod auth;
pub mod chats;
pub mod detection;
pub mod error;
pub mod events;
pub mod extract;
pub mod lang;
pub mod questions;
pub mod router;
pub mod session;
pub mod state;
pub mod storage;
pub mod uploads;
pub mod validation;
pub mod votes;
