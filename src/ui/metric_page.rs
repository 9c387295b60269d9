use crate::models::{Farm, Metric, TelemetryReading};
use crate::ui::overview::draw_metric_card;
use eframe::egui;
use egui::Color32;
use egui_plot::{Legend, Line, Plot, PlotPoints, Polygon};

const BAND_FILL: Color32 = Color32::from_rgba_premultiplied(20, 80, 60, 90);
const LINE_COLOR: Color32 = Color32::from_rgb(100, 200, 255);

/// Per-metric page: for every reading in the filtered latest collection,
/// a time-series chart of that device's historical window with the optimal
/// range drawn as a shaded band, then the current-value card.
pub fn draw_metric_page(
    ui: &mut egui::Ui,
    metric: Metric,
    farm: &Farm,
    latest: &[&TelemetryReading],
    history: &[TelemetryReading],
) {
    if latest.is_empty() {
        ui.add_space(40.0);
        ui.vertical_centered(|ui| {
            ui.label(
                egui::RichText::new("NO TELEMETRY")
                    .size(14.0)
                    .color(Color32::from_rgb(120, 120, 120))
                    .monospace(),
            );
        });
        return;
    }

    for reading in latest {
        ui.label(
            egui::RichText::new(&reading.device_id)
                .size(14.0)
                .color(Color32::from_rgb(240, 240, 240))
                .strong()
                .monospace(),
        );

        ui.add_space(8.0);

        draw_history_chart(ui, metric, farm, &reading.device_id, history);

        ui.add_space(10.0);

        draw_metric_card(ui, metric, metric.value(reading), farm);

        ui.add_space(15.0);
    }
}

fn draw_history_chart(
    ui: &mut egui::Ui,
    metric: Metric,
    farm: &Farm,
    device_id: &str,
    history: &[TelemetryReading],
) {
    let mut series: Vec<&TelemetryReading> = history
        .iter()
        .filter(|r| r.device_id == device_id)
        .collect();
    series.sort_by_key(|r| r.timestamp);

    egui::Frame::new()
        .fill(Color32::from_rgb(28, 28, 28))
        .stroke(egui::Stroke::new(1.0, Color32::from_rgb(60, 60, 60)))
        .corner_radius(4.0)
        .inner_margin(15.0)
        .show(ui, |ui| {
            ui.set_width(ui.available_width());

            if series.is_empty() {
                ui.add_space(30.0);
                ui.vertical_centered(|ui| {
                    ui.label(
                        egui::RichText::new("No data for this device")
                            .size(12.0)
                            .color(Color32::from_rgb(120, 120, 120))
                            .monospace(),
                    );
                });
                ui.add_space(30.0);
                return;
            }

            // Hours since the start of the window on the x axis.
            let start_time = series[0].timestamp.timestamp() as f64;
            let points: Vec<[f64; 2]> = series
                .iter()
                .map(|r| {
                    [
                        (r.timestamp.timestamp() as f64 - start_time) / 3600.0,
                        metric.value(r),
                    ]
                })
                .collect();

            let x_max = points.last().map(|p| p[0]).unwrap_or(0.0);
            let (range_min, range_max) = metric.range(farm);

            let y_min = points
                .iter()
                .map(|p| p[1])
                .fold(range_min, f64::min);
            let y_max = points
                .iter()
                .map(|p| p[1])
                .fold(range_max, f64::max);
            let margin = ((y_max - y_min) * 0.1).max(0.1);

            let unit = metric.unit();
            Plot::new(format!("{}_{}", metric.title(), device_id))
                .height(250.0)
                .allow_zoom([true, false])
                .allow_scroll(false)
                .include_y(y_min - margin)
                .include_y(y_max + margin)
                .x_axis_label("Hours")
                .label_formatter(move |name, value| {
                    if !name.is_empty() {
                        format!("{}\n{:.2} {}", name, value.y, unit)
                    } else {
                        format!("{:.2} {}", value.y, unit)
                    }
                })
                .legend(Legend::default())
                .show(ui, |plot_ui| {
                    // Optimal range band behind the data line.
                    let band = vec![
                        [0.0, range_min],
                        [x_max.max(0.1), range_min],
                        [x_max.max(0.1), range_max],
                        [0.0, range_max],
                    ];
                    plot_ui.polygon(
                        Polygon::new("optimal_range", PlotPoints::from(band))
                            .fill_color(BAND_FILL)
                            .stroke(egui::Stroke::new(0.5, Color32::from_rgb(52, 211, 153)))
                            .name("Optimal range"),
                    );

                    plot_ui.line(
                        Line::new("metric", PlotPoints::from(points))
                            .color(LINE_COLOR)
                            .width(2.0)
                            .name(metric.title()),
                    );
                });

            ui.add_space(5.0);
            ui.label(
                egui::RichText::new(format!("Data points: {}", series.len()))
                    .size(10.0)
                    .color(Color32::from_rgb(120, 120, 120))
                    .monospace(),
            );
        });
}
