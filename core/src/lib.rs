pub mod db;
pub mod error;
pub mod gateway;
pub mod legacy;
pub mod manager;
pub mod models;
pub mod notify;
pub mod reconcile;
pub mod snapshot;
pub mod store;
