//! Commercial Real Estate Signals API Library
//!
//! Aggregates market signals for commercial real estate from public web
//! sources: property listings, census demographics, news headlines, key
//! interest rates, geocoding, and fields extracted from uploaded PDFs.
//!
//! # Modules
//!
//! - `cache_validator`: Checksummed response cache shared by the adapters.
//! - `census`: Census Bureau ACS adapter.
//! - `circuit_breaker`: Per-source circuit breakers.
//! - `config`: Configuration management.
//! - `document`: PDF field extraction.
//! - `entities`: Named-entity recognition used by `document`.
//! - `errors`: Error handling types.
//! - `geocode`: Mapbox geocoding proxy.
//! - `handlers`: HTTP request handlers and shared state.
//! - `html`: `scraper` helpers.
//! - `http_client`: Outbound HTTP with retries and breakers.
//! - `listing`: Property listing adapter.
//! - `models`: Records and query types.
//! - `news`: News search adapter.
//! - `rates`: Interest-rate adapter.
//! - `report`: Combined property report.
//! - `routes`: Router assembly.
//! - `store`: Local JSON array store.

pub mod cache_validator;
pub mod census;
pub mod circuit_breaker;
pub mod config;
pub mod document;
pub mod entities;
pub mod errors;
pub mod geocode;
pub mod handlers;
pub mod html;
pub mod http_client;
pub mod listing;
pub mod models;
pub mod news;
pub mod rates;
pub mod report;
pub mod routes;
pub mod store;
