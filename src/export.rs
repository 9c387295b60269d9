use crate::models::TelemetryReading;
use chrono::Local;
use std::path::Path;

pub const CSV_HEADER: [&str; 10] = [
    "Date",
    "Time",
    "Online",
    "Uptime",
    "Temperature",
    "pH",
    "DO",
    "Turbidity",
    "Turbidity(cam)",
    "Color(cam)",
];

/// One CSV row per reading. Column order and numeric precision are fixed:
/// temperature 1 dp, pH and DO 2 dp, turbidity voltage 3 dp, turbidity
/// index 2 dp. Date and time are the viewer's local time.
pub fn csv_row(reading: &TelemetryReading) -> [String; 10] {
    let local = reading.timestamp.with_timezone(&Local);
    [
        local.format("%d.%m.%Y").to_string(),
        local.format("%H:%M:%S").to_string(),
        if reading.online { "Online" } else { "Offline" }.to_string(),
        reading.uptime_sec.to_string(),
        format!("{:.1}", reading.temperature_c),
        format!("{:.2}", reading.ph),
        format!("{:.2}", reading.do_mg_per_l),
        format!("{:.3}", reading.turbidity_sensor_v),
        format!("{:.2}", reading.turbidity_index),
        reading.avg_color_hex.clone(),
    ]
}

pub fn telemetry_csv(readings: &[TelemetryReading]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for reading in readings {
        writer.write_record(csv_row(reading))?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    // The writer only ever receives UTF-8 strings.
    Ok(String::from_utf8(bytes).unwrap_or_default())
}

pub fn write_csv_file(
    path: &Path,
    readings: &[TelemetryReading],
) -> Result<(), std::io::Error> {
    let contents = telemetry_csv(readings)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(path, contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::reading;

    #[test]
    fn header_matches_fixed_column_order() {
        let csv = telemetry_csv(&[]).unwrap();
        assert_eq!(
            csv.lines().next().unwrap(),
            "Date,Time,Online,Uptime,Temperature,pH,DO,Turbidity,Turbidity(cam),Color(cam)"
        );
    }

    #[test]
    fn numeric_fields_use_fixed_precision() {
        let mut r = reading("tank-1");
        r.temperature_c = 21.0;
        r.ph = 7.1;
        r.do_mg_per_l = 8.0;
        r.turbidity_sensor_v = 2.5;
        r.turbidity_index = 0.3;

        let row = csv_row(&r);
        assert_eq!(row[4], "21.0");
        assert_eq!(row[5], "7.10");
        assert_eq!(row[6], "8.00");
        assert_eq!(row[7], "2.500");
        assert_eq!(row[8], "0.30");
    }

    #[test]
    fn online_flag_and_raw_fields_render_verbatim() {
        let mut r = reading("tank-1");
        r.online = false;
        r.uptime_sec = 86400;
        r.avg_color_hex = "#112233".to_string();

        let row = csv_row(&r);
        assert_eq!(row[2], "Offline");
        assert_eq!(row[3], "86400");
        assert_eq!(row[9], "#112233");
    }

    #[test]
    fn one_row_per_reading_after_the_header() {
        let rows = vec![reading("tank-1"), reading("tank-2"), reading("tank-3")];
        let csv = telemetry_csv(&rows).unwrap();
        assert_eq!(csv.lines().count(), 4);
    }
}
