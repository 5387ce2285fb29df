pub mod accounts;
pub mod authentication;
pub mod clock;
pub mod configuration;
pub mod domain;
pub mod email;
pub mod migrations;
pub mod routes;
pub mod startup;
pub mod store;
pub mod telemetry;
pub mod utils;
