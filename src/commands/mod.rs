pub mod app_command;
pub mod database_command;
