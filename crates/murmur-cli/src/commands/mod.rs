pub mod config;
pub mod devices;
pub mod live;
pub mod packs;
pub mod record;
