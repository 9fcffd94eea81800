//! Core library: configuration, tag resolution, disposition, watch-and-upload pipeline.

pub mod config;
pub mod disposition;
pub mod pipeline;
pub mod service;
pub mod settle;
pub mod tags;
