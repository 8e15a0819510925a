// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Server configuration, read from a TOML file or from the environment

pub mod environment;

pub use environment::{AuthConfig, DatabaseConfig, SecurityConfig, ServerConfig};
