// THEORY:
// This file is the main entry point for the `aedat_csv` library crate.
// It exposes the `reader` façade as the public API that downstream consumers
// (plotting scripts, statistics tooling, the `aedat_probe` runner) build on.
//
// The façade hands out fully materialized record collections. The individual
// ingestion passes, header rules and derived-statistics helpers live in
// `core_modules` and are re-exported through `reader` where callers need them.

pub mod core_modules;
pub mod reader;
