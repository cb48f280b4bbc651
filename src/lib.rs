pub mod assembler;
pub mod cli;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod parser;
pub mod settings;
pub mod share_link;

pub use assembler::ConfigAssembler;
pub use config::EngineConfig;
pub use descriptor::{Protocol, ProxyDescriptor};
pub use error::{ParseError, Result};
pub use parser::{Scheme, parse, parse_link_list, parse_link_list_lossy};
pub use settings::Settings;
pub use share_link::ShareLink;

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
