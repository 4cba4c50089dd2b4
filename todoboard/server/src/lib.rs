pub mod config;
pub mod entities;
pub mod todo;
pub mod web;
