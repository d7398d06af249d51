//! Per-card pipeline stages.
//!
//! Each submodule implements exactly one step so each is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ normalize ──▶ llm ──▶ parse ──▶ record
//! (bytes)    (RGB JPEG)   (VLM)   (JSON)
//!                      └── retry ──┘
//! ```
//!
//! 0. [`input`]     — the `(filename, bytes)` upload type and a local-file reader
//! 1. [`normalize`] — decode png/jpeg/heic and re-encode as quality-95 JPEG
//! 2. [`llm`]       — one VLM round trip; the only stage with network I/O
//! 3. [`parse`]     — strip code fences and decode the JSON object
//! 4. [`retry`]     — repeat `llm → parse` a bounded number of times, then
//!    fall back to the sentinel record

pub mod input;
pub mod llm;
pub mod normalize;
pub mod parse;
pub mod retry;
