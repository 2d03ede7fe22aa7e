pub mod noop_plugin;

pub use noop_plugin::NoopPlugin;
