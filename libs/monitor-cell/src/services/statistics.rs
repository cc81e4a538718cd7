use crate::models::{Datapoint, Metric, StatisticKind};

/// Decimal places kept on the active statistic.
pub const STATISTIC_PRECISION: i32 = 5;

/// The statistic carried by the first datapoint, checked in
/// `StatisticKind::PRIORITY` order.
pub fn active_statistic(datapoints: &[Datapoint]) -> Option<StatisticKind> {
    let first = datapoints.first()?;
    StatisticKind::PRIORITY
        .into_iter()
        .find(|kind| kind.value(first).is_some())
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Rounds the active statistic on every datapoint and returns which one it was.
pub fn round_active_statistic(datapoints: &mut [Datapoint]) -> Option<StatisticKind> {
    let kind = active_statistic(datapoints)?;

    for datapoint in datapoints.iter_mut() {
        if let Some(value) = kind.value_mut(datapoint) {
            *value = round_to(*value, STATISTIC_PRECISION);
        }
    }

    Some(kind)
}

pub fn sort_metrics(metrics: &mut [Metric]) {
    metrics.sort_by(|a, b| a.first_dimension_value().cmp(b.first_dimension_value()));
}
