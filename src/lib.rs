//! # Lava Coverage
//!
//! Source instrumenter for test-session coverage of web JavaScript, Angular
//! TypeScript, and Unity C# applications.
//!
//! Each source file is scanned line by line against a prioritized table of
//! structural patterns (function entries, branch arms, loop headers,
//! statements). Matching lines receive one probe call that reports back to a
//! companion runtime, and every file yields an executable-line record mapping
//! probe ids to (file, line, construct kind).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌────────────┐   ┌────────────┐
//! │ Discover │──▶│ Line Matcher │──▶│ Rule Set   │──▶│ Instrument │──▶ manifest
//! │ walkdir  │   │ pattern table│   │ per mode   │   │ + reformat │
//! └──────────┘   └──────────────┘   └────────────┘   └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lava detect                       # list sources and templates
//! lava instrument --dry-run         # count probes without writing
//! lava instrument --manifest out.json
//! lava match --mode web "if (x) { y(); }"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`patterns`] | Pattern tables per mode |
//! | [`matcher`] | First-wins line matcher |
//! | [`rules`] | Injection rule sets |
//! | [`resolver`] | Relative import paths |
//! | [`store`] | Original-content store |
//! | [`formatter`] | External canonicalizer |
//! | [`discover`] | Source and template discovery |
//! | [`instrument`] | Per-file instrumentation |
//! | [`bootstrap`] | Runtime assets, templates, Angular bootstrap |
//! | [`guard`] | Already-instrumented guard file |
//! | [`run`] | Whole-run orchestration |
//! | [`export`] | JSON manifest |

pub mod bootstrap;
pub mod config;
pub mod discover;
pub mod export;
pub mod formatter;
pub mod guard;
pub mod instrument;
pub mod matcher;
pub mod models;
pub mod patterns;
pub mod progress;
pub mod resolver;
pub mod rules;
pub mod run;
pub mod store;
