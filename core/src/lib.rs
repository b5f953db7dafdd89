pub mod analyzer;
pub mod db;
pub mod health;
pub mod mfp_import;
pub mod models;
pub mod nutrition;
pub mod service;
pub mod validation;
