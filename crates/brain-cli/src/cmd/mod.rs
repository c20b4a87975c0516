pub mod install;
pub mod status;
pub mod targets;
pub mod uninstall;
