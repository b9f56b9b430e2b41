//! JobScout: a job posting scraping and notification pipeline.
//!
//! Sources describe where postings live (ATS boards, careers pages,
//! aggregator feeds); the scheduler scrapes the due ones, the pipeline
//! commits each run atomically, and the notifier pushes matching new
//! postings to users exactly once.

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod schema;
pub mod scrapers;
pub mod services;
