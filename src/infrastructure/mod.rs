pub mod http;
pub mod identity;
pub mod messaging;
pub mod persistence;
pub mod plugins;
