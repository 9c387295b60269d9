use crate::api::ApiClient;
use crate::export;
use crate::models::{Metric, TelemetryReading};
use crate::ui::overview::{IN_RANGE_COLOR, OUT_OF_RANGE_COLOR};
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use eframe::egui;
use egui::{Color32, FontId};
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::warn;

const PERIOD_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Page-local state: the table fetches its own custom period for a single
/// device, independent of the shared polling collections.
pub struct TablePageState {
    pub start_input: String,
    pub end_input: String,
    pub rows: Arc<Mutex<Vec<TelemetryReading>>>,
    pub loading: Arc<Mutex<bool>>,
    pub parse_error: Option<String>,
    initialized: bool,
}

impl TablePageState {
    pub fn new() -> Self {
        Self {
            start_input: String::new(),
            end_input: String::new(),
            rows: Arc::new(Mutex::new(Vec::new())),
            loading: Arc::new(Mutex::new(false)),
            parse_error: None,
            initialized: false,
        }
    }

    /// Default period is the trailing 24 hours, filled in once.
    fn init_period(&mut self) {
        if self.initialized {
            return;
        }
        let end = Local::now();
        let start = end - Duration::hours(24);
        self.start_input = start.format(PERIOD_FORMAT).to_string();
        self.end_input = end.format(PERIOD_FORMAT).to_string();
        self.initialized = true;
    }
}

fn parse_period_input(input: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), PERIOD_FORMAT).ok()?;
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Validates both period inputs before a fetch. The end is optional, but a
/// non-empty end that fails to parse is an error, not an open-ended period.
fn parse_period_bounds(
    start_input: &str,
    end_input: &str,
) -> Result<(DateTime<Utc>, Option<DateTime<Utc>>), String> {
    let start = parse_period_input(start_input)
        .ok_or_else(|| "Invalid start date, expected YYYY-MM-DD HH:MM".to_string())?;
    let end = if end_input.trim().is_empty() {
        None
    } else {
        Some(
            parse_period_input(end_input)
                .ok_or_else(|| "Invalid end date, expected YYYY-MM-DD HH:MM".to_string())?,
        )
    };
    Ok((start, end))
}

fn parse_hex_color(hex: &str) -> Option<Color32> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color32::from_rgb(r, g, b))
}

fn fetch_period(
    client: ApiClient,
    device_id: String,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    rows: Arc<Mutex<Vec<TelemetryReading>>>,
    loading: Arc<Mutex<bool>>,
) {
    *loading.lock().unwrap() = true;

    thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();

        rt.block_on(async {
            match client.telemetry_by_period(&device_id, start, end).await {
                Ok(mut readings) => {
                    // Newest first.
                    readings.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                    *rows.lock().unwrap() = readings;
                }
                Err(e) => {
                    warn!(%device_id, error = %e, "period telemetry fetch failed");
                    rows.lock().unwrap().clear();
                }
            }
        });

        *loading.lock().unwrap() = false;
    });
}

pub fn draw_table_page(
    ui: &mut egui::Ui,
    state: &mut TablePageState,
    client: &ApiClient,
    selected_device: Option<&str>,
) {
    let Some(device_id) = selected_device else {
        ui.add_space(40.0);
        ui.vertical_centered(|ui| {
            ui.label(
                egui::RichText::new("Please select a device")
                    .size(14.0)
                    .color(Color32::from_rgb(120, 120, 120))
                    .monospace(),
            );
        });
        return;
    };

    state.init_period();

    ui.label(
        egui::RichText::new(device_id)
            .size(14.0)
            .color(Color32::from_rgb(240, 240, 240))
            .strong()
            .monospace(),
    );

    ui.add_space(10.0);

    // Period controls
    egui::Frame::new()
        .fill(Color32::from_rgb(28, 28, 28))
        .stroke(egui::Stroke::new(1.0, Color32::from_rgb(60, 60, 60)))
        .corner_radius(4.0)
        .inner_margin(15.0)
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(
                    egui::RichText::new("START:")
                        .size(11.0)
                        .color(Color32::from_rgb(160, 160, 160))
                        .monospace(),
                );
                ui.add(
                    egui::TextEdit::singleline(&mut state.start_input)
                        .font(FontId::monospace(12.0))
                        .desired_width(150.0)
                        .hint_text("YYYY-MM-DD HH:MM"),
                );

                ui.add_space(15.0);

                ui.label(
                    egui::RichText::new("END:")
                        .size(11.0)
                        .color(Color32::from_rgb(160, 160, 160))
                        .monospace(),
                );
                ui.add(
                    egui::TextEdit::singleline(&mut state.end_input)
                        .font(FontId::monospace(12.0))
                        .desired_width(150.0)
                        .hint_text("optional"),
                );

                ui.add_space(15.0);

                let loading = *state.loading.lock().unwrap();
                if ui
                    .add_enabled(!loading, egui::Button::new("Load period"))
                    .clicked()
                {
                    match parse_period_bounds(&state.start_input, &state.end_input) {
                        Ok((start, end)) => {
                            state.parse_error = None;
                            fetch_period(
                                client.clone(),
                                device_id.to_string(),
                                start,
                                end,
                                Arc::clone(&state.rows),
                                Arc::clone(&state.loading),
                            );
                        }
                        Err(msg) => {
                            state.parse_error = Some(msg);
                        }
                    }
                }

                let row_count = state.rows.lock().unwrap().len();
                if ui
                    .add_enabled(row_count > 0, egui::Button::new("Save CSV"))
                    .clicked()
                {
                    let suggested = format!(
                        "{} {} {}.csv",
                        device_id, state.start_input, state.end_input
                    );
                    if let Some(path) = rfd::FileDialog::new()
                        .set_file_name(suggested)
                        .add_filter("CSV", &["csv"])
                        .save_file()
                    {
                        let rows = state.rows.lock().unwrap();
                        if let Err(e) = export::write_csv_file(&path, &rows) {
                            warn!(error = %e, "CSV export failed");
                        }
                    }
                }

                if loading {
                    ui.spinner();
                }
            });

            if let Some(err) = &state.parse_error {
                ui.add_space(5.0);
                ui.label(
                    egui::RichText::new(err)
                        .size(10.0)
                        .color(OUT_OF_RANGE_COLOR)
                        .monospace(),
                );
            }
        });

    ui.add_space(15.0);

    let rows = state.rows.lock().unwrap().clone();

    if rows.is_empty() {
        ui.add_space(30.0);
        ui.vertical_centered(|ui| {
            ui.label(
                egui::RichText::new("No data available for selected period")
                    .size(12.0)
                    .color(Color32::from_rgb(120, 120, 120))
                    .monospace(),
            );
        });
        return;
    }

    egui::Frame::new()
        .fill(Color32::from_rgb(28, 28, 28))
        .stroke(egui::Stroke::new(1.0, Color32::from_rgb(60, 60, 60)))
        .corner_radius(4.0)
        .inner_margin(15.0)
        .show(ui, |ui| {
            ui.label(
                egui::RichText::new(format!("RECORDS ({})", rows.len()))
                    .size(13.0)
                    .color(Color32::from_rgb(240, 240, 240))
                    .monospace(),
            );

            ui.add_space(10.0);

            egui::ScrollArea::horizontal()
                .min_scrolled_width(0.0)
                .show(ui, |ui| {
                    use egui_extras::{Column, TableBuilder};

                    let header_label = |ui: &mut egui::Ui, text: &str| {
                        ui.label(
                            egui::RichText::new(text)
                                .size(11.0)
                                .color(Color32::from_rgb(52, 211, 153))
                                .monospace(),
                        );
                    };
                    let cell_label = |ui: &mut egui::Ui, text: String| {
                        ui.label(
                            egui::RichText::new(text)
                                .size(11.0)
                                .color(Color32::from_rgb(200, 200, 200))
                                .monospace(),
                        );
                    };

                    TableBuilder::new(ui)
                        .striped(true)
                        .resizable(true)
                        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
                        .column(Column::initial(160.0).resizable(true)) // Timestamp
                        .column(Column::initial(70.0)) // Online
                        .column(Column::initial(90.0)) // Uptime
                        .column(Column::initial(110.0)) // Temperature
                        .column(Column::initial(70.0)) // pH
                        .column(Column::initial(90.0)) // DO
                        .column(Column::initial(100.0)) // Turbidity
                        .column(Column::initial(110.0)) // Turbidity (cam)
                        .column(Column::remainder().at_least(130.0)) // Color (cam)
                        .header(30.0, |mut header| {
                            header.col(|ui| header_label(ui, "TIMESTAMP"));
                            header.col(|ui| header_label(ui, "ONLINE"));
                            header.col(|ui| header_label(ui, "UPTIME (S)"));
                            header.col(|ui| header_label(ui, "TEMP (°C)"));
                            header.col(|ui| header_label(ui, "PH"));
                            header.col(|ui| header_label(ui, "DO (MG/L)"));
                            header.col(|ui| header_label(ui, "TURB (V)"));
                            header.col(|ui| header_label(ui, "TURB (CAM)"));
                            header.col(|ui| header_label(ui, "COLOR (CAM)"));
                        })
                        .body(|body| {
                            body.rows(24.0, rows.len(), |mut row| {
                                let reading = &rows[row.index()];
                                row.col(|ui| {
                                    cell_label(
                                        ui,
                                        reading
                                            .timestamp
                                            .with_timezone(&Local)
                                            .format("%d.%m.%Y %H:%M:%S")
                                            .to_string(),
                                    );
                                });
                                row.col(|ui| {
                                    let (text, color) = if reading.online {
                                        ("Online", IN_RANGE_COLOR)
                                    } else {
                                        ("Offline", OUT_OF_RANGE_COLOR)
                                    };
                                    ui.label(
                                        egui::RichText::new(text)
                                            .size(11.0)
                                            .color(color)
                                            .monospace(),
                                    );
                                });
                                row.col(|ui| {
                                    cell_label(ui, reading.uptime_sec.to_string());
                                });
                                row.col(|ui| {
                                    cell_label(
                                        ui,
                                        Metric::Temperature
                                            .format_value(reading.temperature_c),
                                    );
                                });
                                row.col(|ui| {
                                    cell_label(ui, Metric::Ph.format_value(reading.ph));
                                });
                                row.col(|ui| {
                                    cell_label(
                                        ui,
                                        Metric::DissolvedOxygen
                                            .format_value(reading.do_mg_per_l),
                                    );
                                });
                                row.col(|ui| {
                                    cell_label(
                                        ui,
                                        Metric::Turbidity
                                            .format_value(reading.turbidity_sensor_v),
                                    );
                                });
                                row.col(|ui| {
                                    cell_label(ui, format!("{:.2}", reading.turbidity_index));
                                });
                                row.col(|ui| {
                                    if let Some(color) = parse_hex_color(&reading.avg_color_hex)
                                    {
                                        let (rect, _) = ui.allocate_exact_size(
                                            egui::vec2(14.0, 14.0),
                                            egui::Sense::hover(),
                                        );
                                        ui.painter().rect_filled(rect, 2.0, color);
                                        ui.add_space(5.0);
                                    }
                                    cell_label(ui, reading.avg_color_hex.clone());
                                });
                            });
                        });
                });
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_color_accepts_six_digit_hex() {
        assert_eq!(
            parse_hex_color("#4a90d9"),
            Some(Color32::from_rgb(0x4a, 0x90, 0xd9))
        );
        assert_eq!(parse_hex_color("#000000"), Some(Color32::from_rgb(0, 0, 0)));
    }

    #[test]
    fn parse_hex_color_rejects_malformed_input() {
        assert_eq!(parse_hex_color("4a90d9"), None);
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }

    #[test]
    fn parse_period_input_roundtrips_the_input_format() {
        let parsed = parse_period_input("2025-06-01 12:30");
        assert!(parsed.is_some());
        let local = parsed.unwrap().with_timezone(&Local);
        assert_eq!(local.format(PERIOD_FORMAT).to_string(), "2025-06-01 12:30");
    }

    #[test]
    fn parse_period_input_rejects_garbage() {
        assert!(parse_period_input("yesterday").is_none());
        assert!(parse_period_input("2025-13-01 12:30").is_none());
    }

    #[test]
    fn parse_period_bounds_allows_empty_end() {
        let (_, end) = parse_period_bounds("2025-06-01 12:30", "  ").unwrap();
        assert!(end.is_none());
    }

    #[test]
    fn parse_period_bounds_rejects_malformed_end() {
        let err = parse_period_bounds("2025-06-01 12:30", "2025-99-99 xx:yy").unwrap_err();
        assert!(err.contains("end date"));
    }

    #[test]
    fn parse_period_bounds_rejects_malformed_start() {
        let err = parse_period_bounds("not a date", "2025-06-01 12:30").unwrap_err();
        assert!(err.contains("start date"));
    }
}
