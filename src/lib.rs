//! Chai catalog web application.
//!
//! An actix-web server over a SQLite file: public pages for browsing the
//! catalog (home, listing, per-variety detail) and a management area under
//! `/admin` for editing varieties with their inline reviews, stores with
//! the varieties they stock, and one-per-variety quality certificates.

pub mod admin;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod models;
pub mod pages;
pub mod templates;
