//! Collector module for incremental, windowed activity collection
//!
//! This module contains the core collection logic, including:
//! - The window scheduler that computes the next window, delay and quota hold
//! - The paginated fetcher that drains pages within a per-invocation budget
//! - The HTTP page source for the upstream activity API
//! - The invocation cycle tying them together for one target

mod client;
mod fetcher;
mod invocation;
mod scheduler;

pub use client::{build_http_client, ReportsClient};
pub use fetcher::{fetch_all, Page, PageRequest, PageSource};
pub use invocation::{poll_once, Invocation};
pub use scheduler::{
    catch_up_width, initialize, next_quota_reset, quota_in_effect, transition, Transition,
    INITIAL_DELAY_SECS,
};
