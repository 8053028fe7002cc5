pub mod configuration;
pub mod error;
pub mod to_runtime_configuration;
pub mod version1;

pub use configuration::Configuration;
pub use version1::{parse_configuration, write_parsed_configuration, ParsedConfiguration, Version};

pub use to_runtime_configuration::make_runtime_configuration;
