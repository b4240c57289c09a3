pub mod api_connection;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod meal_plan;
pub mod narrative;
pub mod profile;
pub mod report;
pub mod rules;
pub mod service;
pub mod validation;
