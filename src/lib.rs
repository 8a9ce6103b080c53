// lib.rs - Library exports for integration tests

pub mod config;
pub mod bootstrap;
pub mod math;
pub mod engine;
pub mod models;
pub mod web;
