//! Engine configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use crate::consts::{DEVICE_PIXEL_RATIO, DOUBLE_TAP_MS, DRAG_THRESHOLD_PX, PAGE_GAP_PX, SAVE_DEBOUNCE_MS};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Tunables for one annotation session.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Quiet period after the last mutation before a page is saved.
    pub save_debounce: Duration,
    /// Window in which a second tap on a text object starts editing.
    pub double_tap: Duration,
    /// Pointer travel, in CSS pixels, that turns a press into a drag.
    pub drag_threshold_px: f64,
    /// Bitmap pixels per CSS pixel.
    pub device_pixel_ratio: f64,
    /// Gap between the two pages of a spread, in CSS pixels.
    pub page_gap_px: f64,
    /// Base URL of the scores/annotations service.
    pub api_base_url: String,
    /// Per-request timeout for the annotations service.
    pub http_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            save_debounce: Duration::from_millis(SAVE_DEBOUNCE_MS),
            double_tap: Duration::from_millis(DOUBLE_TAP_MS),
            drag_threshold_px: DRAG_THRESHOLD_PX,
            device_pixel_ratio: DEVICE_PIXEL_RATIO,
            page_gap_px: PAGE_GAP_PX,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl EngineConfig {
    /// Build config from environment variables, falling back to defaults.
    ///
    /// Optional:
    /// - `ANNOTATOR_SAVE_DEBOUNCE_MS`: default 1000
    /// - `ANNOTATOR_DOUBLE_TAP_MS`: default 300
    /// - `ANNOTATOR_DRAG_THRESHOLD_PX`: default 4
    /// - `ANNOTATOR_DEVICE_PIXEL_RATIO`: default 2, never below 1
    /// - `ANNOTATOR_PAGE_GAP_PX`: default 12
    /// - `ANNOTATOR_API_BASE_URL`: default `http://localhost:8080`
    /// - `ANNOTATOR_HTTP_TIMEOUT_SECS`: default 30
    #[must_use]
    pub fn from_env() -> Self {
        let api_base_url = match std::env::var("ANNOTATOR_API_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => url.trim().trim_end_matches('/').to_string(),
            _ => DEFAULT_API_BASE_URL.to_string(),
        };

        Self {
            save_debounce: Duration::from_millis(positive_or("ANNOTATOR_SAVE_DEBOUNCE_MS", SAVE_DEBOUNCE_MS)),
            double_tap: Duration::from_millis(positive_or("ANNOTATOR_DOUBLE_TAP_MS", DOUBLE_TAP_MS)),
            drag_threshold_px: positive_f64_or("ANNOTATOR_DRAG_THRESHOLD_PX", DRAG_THRESHOLD_PX),
            device_pixel_ratio: positive_f64_or("ANNOTATOR_DEVICE_PIXEL_RATIO", DEVICE_PIXEL_RATIO).max(1.0),
            page_gap_px: positive_f64_or("ANNOTATOR_PAGE_GAP_PX", PAGE_GAP_PX),
            api_base_url,
            http_timeout: Duration::from_secs(positive_or("ANNOTATOR_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

fn positive_or(key: &str, default: u64) -> u64 {
    match env_parse(key, default) {
        0 => default,
        v => v,
    }
}

fn positive_f64_or(key: &str, default: f64) -> f64 {
    let v = env_parse(key, default);
    if v.is_finite() && v > 0.0 { v } else { default }
}
