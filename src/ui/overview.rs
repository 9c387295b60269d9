use crate::models::{in_range, Farm, Metric, TelemetryReading};
use eframe::egui;
use egui::Color32;

pub const IN_RANGE_COLOR: Color32 = Color32::from_rgb(52, 211, 153);
pub const OUT_OF_RANGE_COLOR: Color32 = Color32::from_rgb(239, 68, 68);

/// Current-value card for one metric. Border and value color flag whether
/// the reading sits inside the farm's optimal band (closed interval).
pub fn draw_metric_card(ui: &mut egui::Ui, metric: Metric, value: f64, farm: &Farm) {
    let (range_min, range_max) = metric.range(farm);
    let ok = in_range(value, range_min, range_max);
    let accent = if ok { IN_RANGE_COLOR } else { OUT_OF_RANGE_COLOR };

    egui::Frame::new()
        .fill(Color32::from_rgb(28, 28, 28))
        .stroke(egui::Stroke::new(2.0, accent))
        .corner_radius(4.0)
        .inner_margin(15.0)
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(
                egui::RichText::new(metric.title().to_uppercase())
                    .size(11.0)
                    .color(Color32::from_rgb(160, 160, 160))
                    .monospace(),
            );

            ui.add_space(8.0);

            ui.horizontal(|ui| {
                ui.label(
                    egui::RichText::new(format!(
                        "{} {}",
                        metric.format_value(value),
                        metric.unit()
                    ))
                    .size(32.0)
                    .color(accent)
                    .strong()
                    .monospace(),
                );

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.vertical(|ui| {
                        ui.label(
                            egui::RichText::new("OPTIMAL RANGE")
                                .size(10.0)
                                .color(Color32::from_rgb(120, 120, 120))
                                .monospace(),
                        );
                        ui.label(
                            egui::RichText::new(format!(
                                "{} - {} {}",
                                metric.format_value(range_min),
                                metric.format_value(range_max),
                                metric.unit()
                            ))
                            .size(14.0)
                            .color(Color32::from_rgb(200, 200, 200))
                            .monospace(),
                        );
                    });
                });
            });
        });
}

/// One card group per reading in the filtered latest collection, in
/// collection order: device header plus the four metric cards.
pub fn draw_overview_page(ui: &mut egui::Ui, farm: &Farm, readings: &[&TelemetryReading]) {
    if readings.is_empty() {
        ui.add_space(40.0);
        ui.vertical_centered(|ui| {
            ui.label(
                egui::RichText::new("NO TELEMETRY")
                    .size(14.0)
                    .color(Color32::from_rgb(120, 120, 120))
                    .monospace(),
            );
            ui.add_space(10.0);
            ui.label(
                egui::RichText::new("No device has reported data yet")
                    .size(11.0)
                    .color(Color32::from_rgb(100, 100, 100))
                    .monospace(),
            );
        });
        return;
    }

    for reading in readings {
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new(&reading.device_id)
                    .size(14.0)
                    .color(Color32::from_rgb(240, 240, 240))
                    .strong()
                    .monospace(),
            );

            let (status_text, status_color) = if reading.online {
                ("ONLINE", IN_RANGE_COLOR)
            } else {
                ("OFFLINE", OUT_OF_RANGE_COLOR)
            };
            ui.label(
                egui::RichText::new(status_text)
                    .size(10.0)
                    .color(status_color)
                    .monospace(),
            );

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(
                    egui::RichText::new(format!(
                        "Last reading: {}",
                        reading
                            .timestamp
                            .with_timezone(&chrono::Local)
                            .format("%d.%m.%Y %H:%M:%S")
                    ))
                    .size(10.0)
                    .color(Color32::from_rgb(120, 120, 120))
                    .monospace(),
                );
            });
        });

        ui.add_space(8.0);

        for metric in Metric::ALL {
            draw_metric_card(ui, metric, metric.value(reading), farm);
            ui.add_space(8.0);
        }

        ui.add_space(12.0);
    }
}
