//! Web server for browser-based sequence search.
//!
//! This module provides an interactive web interface using Axum.
//! Users can upload a FASTA file or paste a sequence to find its closest
//! relatives in the reference database.
//!
//! ## Starting the Server
//!
//! ```text
//! # Start on default port 8080
//! seq-kin serve --db viruses/
//!
//! # Custom port and auto-open browser
//! seq-kin serve --db viruses/ --port 3000 --open
//!
//! # Bind to all interfaces
//! seq-kin serve --db viruses/ --address 0.0.0.0
//! ```
//!
//! ## API Endpoints
//!
//! - `GET /` - Main page with sequence input form
//! - `POST /api/search` - Rank references against a query (multipart form)
//! - `GET /api/report` - Text report of the most recent search
//! - `GET /api/families` - List the reference families
//! - `POST /api/reload` - Reload the database directory and recluster

pub mod server;
