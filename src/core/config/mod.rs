pub mod data;
pub mod defaults;
pub mod io;

pub use data::{ApiProvider, Config};
pub use defaults::{Settings, SettingsOverrides};
pub use io::ConfigError;
