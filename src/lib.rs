//! Site Tracker AI: query dispatch for the site tracker dashboard.
//!
//! Questions about a loaded site dataset are answered either by the local
//! heuristic [`analysis`] or by a remote chat provider ([`llm`]), chosen by
//! the [`dispatch`] layer. Remote failures always fall back to the local
//! answer.

pub mod analysis;
pub mod analytics;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod dispatch;
pub mod geo;
pub mod llm;
pub mod web;
