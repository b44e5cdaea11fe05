//! API modules and their base URLs.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Default API host.
pub const DEFAULT_API_HOST: &str = "https://api.planningcenteronline.com";

/// Top-level area of the API. Each module has its own versioned base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Module {
    People,
    Services,
}

impl Module {
    pub fn as_str(self) -> &'static str {
        match self {
            Module::People => "people",
            Module::Services => "services",
        }
    }

    /// Base URL for this module on `host`, always ending in `/`.
    pub fn base_url(self, host: &str) -> String {
        format!("{}/{}/v2/", host.trim_end_matches('/'), self.as_str())
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "people" => Ok(Module::People),
            "services" => Ok(Module::Services),
            _ => Err(Error::UnknownModule(s.to_string())),
        }
    }
}
