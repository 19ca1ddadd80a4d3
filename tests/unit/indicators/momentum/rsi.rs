//! Unit tests for RSI indicator

use klinefeed::indicators::momentum::{calculate_rsi, calculate_rsi_default};

#[test]
fn test_rsi_insufficient_data() {
    let closes: Vec<f64> = (0..14).map(|i| 100.0 + i as f64).collect();
    assert!(calculate_rsi(&closes, 14).is_none());
    assert!(calculate_rsi(&closes, 0).is_none());
}

#[test]
fn test_rsi_only_gains_is_100() {
    let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
    let rsi = calculate_rsi_default(&closes).unwrap();
    assert_eq!(rsi.value, 100.0);
    assert_eq!(rsi.period, Some(14));
}

#[test]
fn test_rsi_only_losses_is_0() {
    let closes: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
    let rsi = calculate_rsi(&closes, 14).unwrap();
    assert!(rsi.value.abs() < 1e-9);
}

#[test]
fn test_rsi_balanced_moves_is_50() {
    let closes = [100.0, 101.0, 100.0, 101.0, 100.0];
    let rsi = calculate_rsi(&closes, 4).unwrap();
    assert!((rsi.value - 50.0).abs() < 1e-9);
}

#[test]
fn test_rsi_uses_latest_window() {
    // Old losses fall outside the 3-change window.
    let closes = [120.0, 110.0, 100.0, 101.0, 103.0, 102.0];
    let rsi = calculate_rsi(&closes, 3).unwrap();
    // gains 1 + 2, losses 1 -> RS 3 -> RSI 75
    assert!((rsi.value - 75.0).abs() < 1e-9);
}
