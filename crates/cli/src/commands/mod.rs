pub mod config;
pub mod install;
pub mod package;

pub use config::handle_config_command;
pub use package::handle_package_command;
