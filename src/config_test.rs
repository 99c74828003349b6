#![allow(clippy::float_cmp)]

use super::*;

// =============================================================================
// env_parse
// =============================================================================

#[test]
fn env_parse_missing_returns_default() {
    let val: u64 = env_parse("__ANNOTATOR_TEST_MISSING__", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_valid() {
    unsafe { std::env::set_var("__ANNOTATOR_TEST_VALID__", " 99 ") };
    let val: u64 = env_parse("__ANNOTATOR_TEST_VALID__", 0);
    assert_eq!(val, 99);
    unsafe { std::env::remove_var("__ANNOTATOR_TEST_VALID__") };
}

#[test]
fn env_parse_present_invalid_returns_default() {
    unsafe { std::env::set_var("__ANNOTATOR_TEST_INVALID__", "soon") };
    let val: f64 = env_parse("__ANNOTATOR_TEST_INVALID__", 7.5);
    assert_eq!(val, 7.5);
    unsafe { std::env::remove_var("__ANNOTATOR_TEST_INVALID__") };
}

#[test]
fn positive_or_rejects_zero() {
    unsafe { std::env::set_var("__ANNOTATOR_TEST_ZERO__", "0") };
    assert_eq!(positive_or("__ANNOTATOR_TEST_ZERO__", 300), 300);
    unsafe { std::env::remove_var("__ANNOTATOR_TEST_ZERO__") };
}

#[test]
fn positive_f64_or_rejects_negative() {
    unsafe { std::env::set_var("__ANNOTATOR_TEST_NEG__", "-2.5") };
    assert_eq!(positive_f64_or("__ANNOTATOR_TEST_NEG__", 4.0), 4.0);
    unsafe { std::env::remove_var("__ANNOTATOR_TEST_NEG__") };
}

// =============================================================================
// EngineConfig
// =============================================================================

#[test]
fn defaults_match_constants() {
    let config = EngineConfig::default();
    assert_eq!(config.save_debounce, Duration::from_millis(SAVE_DEBOUNCE_MS));
    assert_eq!(config.double_tap, Duration::from_millis(DOUBLE_TAP_MS));
    assert_eq!(config.drag_threshold_px, DRAG_THRESHOLD_PX);
    assert_eq!(config.device_pixel_ratio, DEVICE_PIXEL_RATIO);
    assert_eq!(config.page_gap_px, PAGE_GAP_PX);
    assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
}

#[test]
fn from_env_reads_overrides() {
    unsafe {
        std::env::set_var("ANNOTATOR_SAVE_DEBOUNCE_MS", "250");
        std::env::set_var("ANNOTATOR_DEVICE_PIXEL_RATIO", "0.5");
        std::env::set_var("ANNOTATOR_API_BASE_URL", "https://scores.example.com/");
    }
    let config = EngineConfig::from_env();
    unsafe {
        std::env::remove_var("ANNOTATOR_SAVE_DEBOUNCE_MS");
        std::env::remove_var("ANNOTATOR_DEVICE_PIXEL_RATIO");
        std::env::remove_var("ANNOTATOR_API_BASE_URL");
    }

    assert_eq!(config.save_debounce, Duration::from_millis(250));
    // Densities below one are raised to one.
    assert_eq!(config.device_pixel_ratio, 1.0);
    assert_eq!(config.api_base_url, "https://scores.example.com");
}
