pub mod api;
pub mod events;
pub mod history;
pub mod models;
