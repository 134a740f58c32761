// src/lib.rs

pub mod cli;
pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod import_client;
pub mod maintenance;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod telemetry;
