pub mod config;
pub mod env;
pub mod error;
pub mod header;
pub mod level;
pub mod record;
pub mod tokenizer;
pub mod assembler;
pub mod encoder;
pub mod sink;
pub mod logger;
pub mod output;

#[cfg(feature = "layer")]
pub mod layer;

#[cfg(feature = "layer")]
pub mod init;

pub use config::{Config, Format, KeyNames};
pub use error::ConfigError;
pub use header::Flags;
pub use logger::{Attach, Logger};
pub use output::{Output, OutputWriter};
pub use record::Caller;
pub use sink::SharedBuffer;
