//! Backend for a marketing website: landing page copy, a project portfolio,
//! team profiles, a contact inbox, and the images those records own.

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
