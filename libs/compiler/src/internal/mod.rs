pub mod config;
pub mod errors;
pub mod path;
pub mod process;
pub mod settings;
pub mod solc;
