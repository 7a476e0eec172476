extern crate serde;
extern crate serde_json;

extern crate itertools;
#[macro_use]
extern crate lazy_static;
extern crate regex;
#[macro_use]
extern crate tracing;
extern crate tracing_subscriber;

pub mod abstract_factory;
pub mod file_format;
pub mod kinds;
pub mod logging;
pub mod view_config;
pub mod xray;
