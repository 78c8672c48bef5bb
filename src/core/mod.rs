//! Core business logic module - Contains all domain operations for the registrar.
//!
//! `grades` and `gpa` are pure; every other module runs against the database
//! and takes the already-resolved role profile of the acting user.

pub mod access;
pub mod accounts;
pub mod attendance;
pub mod auth;
pub mod courses;
pub mod directory;
pub mod enrollment;
pub mod gpa;
pub mod grades;
pub mod progress;
pub mod records;
pub mod transcripts;
