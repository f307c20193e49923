// SPDX-License-Identifier: MPL-2.0

//! Capture pipelines
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Still frame  │ ──▶ │  Photo pipeline   │ ──▶ │  JPEG file   │
//! │ (YUYV/RGB/…) │     │  - → RGB, zoom    │     │              │
//! │              │     │  - JPEG encoding  │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! The preview never waits on a capture: encoding and disk I/O run on the
//! capture executor thread.

pub mod photo;
