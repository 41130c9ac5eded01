pub mod auth;
pub mod lookups;
pub mod servers;
