//! Integration tests for sensor filters
//!
//! Drives filters through scripted sensors exactly as a rule would: one
//! `readout()` per evaluation, each readout sampling the sensor once.

mod common;

use skywatch_core::{
    share_filter, share_sensor, Filter, Multiplexer, Reading, SensorFilter, ValueTable,
};

use common::{continuous_series, discrete_series, ScriptedSensor};

fn readouts(filter: &mut dyn Filter, n: usize) -> Vec<f64> {
    (0..n).map(|_| filter.readout()).collect()
}

#[test]
fn test_averaging_filter_over_three_samples() {
    let sensor = ScriptedSensor::new("wind", continuous_series(1_000, 1_000, &[10.0, 20.0, 30.0]));
    let mut filter = SensorFilter::averaging("wind_avg", share_sensor(sensor), 3).unwrap();

    let values = readouts(&mut filter, 3);
    assert_eq!(values, vec![10.0, 15.0, 20.0]);
}

#[test]
fn test_averaging_window_slides() {
    let sensor = ScriptedSensor::new(
        "wind",
        continuous_series(0, 1_000, &[10.0, 20.0, 30.0, 40.0]),
    );
    let mut filter = SensorFilter::averaging("wind_avg", share_sensor(sensor), 3).unwrap();

    let values = readouts(&mut filter, 4);
    assert_eq!(values[3], 30.0);
    assert_eq!(filter.snapshot().buffered, 3);
}

#[test]
fn test_modal_filter_most_frequent_state() {
    let sensor = ScriptedSensor::new("sky", discrete_series(0, 1_000, &[1, 1, 2, 1, 3]));
    let table = ValueTable::new(&[1, 2, 3]).unwrap();
    let mut filter = SensorFilter::modal("sky_modal", share_sensor(sensor), 5, table, 0).unwrap();

    let values = readouts(&mut filter, 5);
    assert_eq!(values[4], 1.0);
}

#[test]
fn test_steady_state_disagreement_returns_default() {
    let table = ValueTable::new(&[1, 2]).unwrap();

    let disagreeing = ScriptedSensor::new("sky", discrete_series(0, 1_000, &[1, 1, 2]));
    let mut filter =
        SensorFilter::steady_state("steady", share_sensor(disagreeing), 3, table.clone(), 0)
            .unwrap();
    assert_eq!(readouts(&mut filter, 3)[2], 0.0);

    let agreeing = ScriptedSensor::new("sky", discrete_series(0, 1_000, &[1, 1, 1]));
    let mut filter =
        SensorFilter::steady_state("steady", share_sensor(agreeing), 3, table, 0).unwrap();
    assert_eq!(readouts(&mut filter, 3), vec![0.0, 0.0, 1.0]);
}

#[test]
fn test_stale_timestamps_leave_buffer_unchanged() {
    let script = vec![
        Reading::continuous(2_000, 10.0),
        Reading::continuous(2_000, 99.0),
        Reading::continuous(1_000, 99.0),
        Reading::continuous(3_000, 20.0),
    ];
    let sensor = ScriptedSensor::new("wind", script);
    let mut filter = SensorFilter::averaging("wind_avg", share_sensor(sensor), 10).unwrap();

    let values = readouts(&mut filter, 4);
    assert_eq!(values, vec![10.0, 10.0, 10.0, 15.0]);

    let snapshot = filter.snapshot();
    assert_eq!(snapshot.buffered, 2);
    assert_eq!(snapshot.rejected, 2);
}

#[test]
fn test_empty_filters_return_defaults() {
    let table = ValueTable::new(&[1, 2]).unwrap();
    let empty = || share_sensor(ScriptedSensor::new("none", Vec::new()));

    let mut average = SensorFilter::averaging("a", empty(), 3).unwrap();
    let mut weighted = SensorFilter::weighted_averaging("w", empty(), 3, &[0.5, 0.3, 0.2]).unwrap();
    let mut modal = SensorFilter::modal("m", empty(), 3, table.clone(), 7).unwrap();
    let mut steady = SensorFilter::steady_state("s", empty(), 3, table.clone(), 8).unwrap();
    let mut period = SensorFilter::timed_steady_state("p", empty(), 10_000, table, 9).unwrap();

    assert_eq!(average.readout(), 0.0);
    assert_eq!(weighted.readout(), 0.0);
    assert_eq!(modal.readout(), 7.0);
    assert_eq!(steady.readout(), 8.0);
    assert_eq!(period.readout(), 9.0);
    assert_eq!(average.snapshot().sensor_errors, 1);
}

#[test]
fn test_multiplexer_blends_two_anemometers() {
    let north = ScriptedSensor::new("north", continuous_series(0, 1_000, &[10.0, 12.0]));
    let south = ScriptedSensor::new("south", continuous_series(0, 1_000, &[20.0, 16.0]));

    let north = share_filter(SensorFilter::averaging("north", share_sensor(north), 1).unwrap());
    let south = share_filter(SensorFilter::averaging("south", share_sensor(south), 1).unwrap());

    let mut mux = Multiplexer::new("wind")
        .with_input(north, 0.5)
        .and_then(|m| m.with_input(south, 0.5))
        .unwrap();

    assert_eq!(mux.readout(), 15.0);
    assert_eq!(mux.readout(), 14.0);
}
