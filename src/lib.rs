//! Purpose: Client state engine for the Spy Cat roster, shared by the `spycats` CLI and tests.
//! Exports: `api` (gateways, breed cache, errors), `console` (controllers), `config`.
//! Role: Library crate; front ends drive `console` controllers and render their state.
//! Invariants: Controllers reach the network only through `api` traits.
//! Invariants: Library code never panics on remote input.
pub mod api;
pub mod config;
pub mod console;
mod core;
