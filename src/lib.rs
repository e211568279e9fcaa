// src/lib.rs
pub mod app;
pub mod controller;
pub mod detector;
pub mod keys;
pub mod tracking;
pub mod ui;
pub mod video;
