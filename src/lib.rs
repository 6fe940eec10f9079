#[macro_use]
extern crate lazy_static;

pub mod config;
pub mod container;
pub mod document;
pub mod error;
pub mod format;
pub mod lang;
pub mod pointer;
pub mod resolver;
pub mod route;
pub mod scan;
pub mod spec;
pub mod tag;

pub const VERSION: &str = "0.4.0";
