//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use datacubes_rs::types::GraphPoint;
use std::time::Duration;

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Assert two graph positions are approximately equal
pub fn assert_point_eq(a: GraphPoint, b: GraphPoint, epsilon: f64) {
    assert_float_eq(a.x, b.x, epsilon);
    assert_float_eq(a.y, b.y, epsilon);
}
