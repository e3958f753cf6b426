pub mod manager;
pub mod signals;
pub mod web;
