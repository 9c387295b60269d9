use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Farm settings as served by the backend. Holds the optimal (min, max)
/// band for each monitored metric. The backend guarantees min <= max.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Farm {
    pub id: i64,
    pub name: String,
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub ph_min: f64,
    pub ph_max: f64,
    pub do_min: f64,
    pub do_max: f64,
    pub turbidity_min: f64,
    pub turbidity_max: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub farm_id: i64,
}

/// One telemetry sample. Immutable once fetched; refreshes replace the
/// whole collection rather than patching readings in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetryReading {
    pub id: i64,
    pub version: i64,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub online: bool,
    pub uptime_sec: i64,
    pub temperature_c: f64,
    pub ph: f64,
    pub do_mg_per_l: f64,
    pub turbidity_sensor_v: f64,
    pub turbidity_index: f64,
    pub avg_color_hex: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    Temperature,
    Ph,
    DissolvedOxygen,
    Turbidity,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Temperature,
        Metric::Ph,
        Metric::DissolvedOxygen,
        Metric::Turbidity,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Metric::Temperature => "Temperature",
            Metric::Ph => "pH Level",
            Metric::DissolvedOxygen => "Dissolved Oxygen",
            Metric::Turbidity => "Turbidity",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Temperature => "°C",
            Metric::Ph => "",
            Metric::DissolvedOxygen => "mg/L",
            Metric::Turbidity => "V",
        }
    }

    /// Decimal places used everywhere this metric is displayed or exported.
    pub fn precision(self) -> usize {
        match self {
            Metric::Temperature => 1,
            Metric::Ph => 2,
            Metric::DissolvedOxygen => 2,
            Metric::Turbidity => 3,
        }
    }

    pub fn value(self, reading: &TelemetryReading) -> f64 {
        match self {
            Metric::Temperature => reading.temperature_c,
            Metric::Ph => reading.ph,
            Metric::DissolvedOxygen => reading.do_mg_per_l,
            Metric::Turbidity => reading.turbidity_sensor_v,
        }
    }

    pub fn range(self, farm: &Farm) -> (f64, f64) {
        match self {
            Metric::Temperature => (farm.temperature_min, farm.temperature_max),
            Metric::Ph => (farm.ph_min, farm.ph_max),
            Metric::DissolvedOxygen => (farm.do_min, farm.do_max),
            Metric::Turbidity => (farm.turbidity_min, farm.turbidity_max),
        }
    }

    pub fn format_value(self, value: f64) -> String {
        format!("{value:.prec$}", prec = self.precision())
    }
}

/// Closed interval on both sides: boundary values count as in range.
pub fn in_range(value: f64, min: f64, max: f64) -> bool {
    value >= min && value <= max
}

/// Selection filter: `None` means "all devices" and passes the collection
/// through unchanged; `Some(id)` keeps matching readings (zero or one).
pub fn filter_by_device<'a>(
    readings: &'a [TelemetryReading],
    selected: Option<&str>,
) -> Vec<&'a TelemetryReading> {
    match selected {
        None => readings.iter().collect(),
        Some(id) => readings.iter().filter(|r| r.device_id == id).collect(),
    }
}

/// In-flight flags for the background refresh workers. One refresh of each
/// kind runs at a time; the UI thread checks these before kicking off another.
#[derive(Default)]
pub struct PollStatus {
    pub farm_in_flight: bool,
    pub devices_in_flight: bool,
    pub latest_in_flight: bool,
    pub history_in_flight: bool,
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use chrono::TimeZone;

    pub fn farm(name: &str) -> Farm {
        Farm {
            id: 1,
            name: name.to_string(),
            temperature_min: 18.0,
            temperature_max: 24.0,
            ph_min: 6.5,
            ph_max: 8.5,
            do_min: 5.0,
            do_max: 12.0,
            turbidity_min: 0.0,
            turbidity_max: 3.0,
        }
    }

    pub fn reading(device_id: &str) -> TelemetryReading {
        TelemetryReading {
            id: 1,
            version: 1,
            device_id: device_id.to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            online: true,
            uptime_sec: 3600,
            temperature_c: 21.0,
            ph: 7.1,
            do_mg_per_l: 8.0,
            turbidity_sensor_v: 2.5,
            turbidity_index: 0.3,
            avg_color_hex: "#4a90d9".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::reading;
    use super::*;

    #[test]
    fn in_range_is_closed_on_both_boundaries() {
        assert!(in_range(18.0, 18.0, 24.0));
        assert!(in_range(24.0, 18.0, 24.0));
        assert!(in_range(21.0, 18.0, 24.0));
        assert!(!in_range(17.9, 18.0, 24.0));
        assert!(!in_range(24.1, 18.0, 24.0));
    }

    #[test]
    fn filter_with_no_selection_returns_everything_in_order() {
        let readings = vec![reading("tank-1"), reading("tank-2"), reading("tank-3")];
        let filtered = filter_by_device(&readings, None);
        assert_eq!(filtered.len(), 3);
        let ids: Vec<&str> = filtered.iter().map(|r| r.device_id.as_str()).collect();
        assert_eq!(ids, vec!["tank-1", "tank-2", "tank-3"]);
    }

    #[test]
    fn filter_with_selection_yields_single_match() {
        let readings = vec![reading("tank-1"), reading("tank-2"), reading("tank-3")];
        let filtered = filter_by_device(&readings, Some("tank-2"));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].device_id, "tank-2");
    }

    #[test]
    fn filter_with_unknown_selection_is_empty() {
        let readings = vec![reading("tank-1")];
        assert!(filter_by_device(&readings, Some("tank-9")).is_empty());
    }

    #[test]
    fn metric_accessors_match_reading_fields() {
        let r = reading("tank-1");
        assert_eq!(Metric::Temperature.value(&r), 21.0);
        assert_eq!(Metric::Ph.value(&r), 7.1);
        assert_eq!(Metric::DissolvedOxygen.value(&r), 8.0);
        assert_eq!(Metric::Turbidity.value(&r), 2.5);
    }

    #[test]
    fn metric_formatting_uses_fixed_precision() {
        assert_eq!(Metric::Temperature.format_value(21.0), "21.0");
        assert_eq!(Metric::Ph.format_value(7.1), "7.10");
        assert_eq!(Metric::DissolvedOxygen.format_value(8.0), "8.00");
        assert_eq!(Metric::Turbidity.format_value(2.5), "2.500");
    }
}
