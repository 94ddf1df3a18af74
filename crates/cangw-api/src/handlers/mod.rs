//! HTTP request handlers for the gateway API

pub mod command;
pub mod page;
pub mod parameters;
