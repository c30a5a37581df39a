//! 命令定义和实现

pub mod config;
pub mod home;
pub mod r#move;
pub mod ports;
pub mod stop;

pub use config::ConfigCommand;
pub use home::HomeCommand;
pub use r#move::MoveCommand;
pub use ports::PortsCommand;
pub use stop::StopCommand;
