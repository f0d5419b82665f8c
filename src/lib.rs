pub mod config;
pub mod drive;
pub mod error;
pub mod events;
pub mod gallery;
pub mod logging;
pub mod platform;
pub mod proxy;
pub mod web;
pub mod tasks {
    pub mod wall;
}
