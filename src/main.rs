use eframe::egui;
use egui::Color32;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

mod api;
mod config;
mod export;
mod models;
mod poller;
mod ui;

use api::ApiClient;
use config::AppConfig;
use models::{filter_by_device, Device, Farm, Metric, PollStatus, TelemetryReading};

fn main() -> Result<(), eframe::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_title("Fish Farm Telemetry"),
        ..Default::default()
    };

    eframe::run_native(
        "Fish Farm Telemetry",
        options,
        Box::new(|_cc| Ok(Box::new(FarmDashboardApp::new()))),
    )
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Page {
    Overview,
    Temperature,
    PhLevel,
    DissolvedOxygen,
    Turbidity,
    Table,
    Settings,
}

impl Page {
    const ALL: [Page; 7] = [
        Page::Overview,
        Page::Temperature,
        Page::PhLevel,
        Page::DissolvedOxygen,
        Page::Turbidity,
        Page::Table,
        Page::Settings,
    ];

    fn label(self) -> &'static str {
        match self {
            Page::Overview => "OVERVIEW",
            Page::Temperature => "TEMPERATURE",
            Page::PhLevel => "PH LEVEL",
            Page::DissolvedOxygen => "DISSOLVED O2",
            Page::Turbidity => "TURBIDITY",
            Page::Table => "TABLE",
            Page::Settings => "SETTINGS",
        }
    }

    fn metric(self) -> Option<Metric> {
        match self {
            Page::Temperature => Some(Metric::Temperature),
            Page::PhLevel => Some(Metric::Ph),
            Page::DissolvedOxygen => Some(Metric::DissolvedOxygen),
            Page::Turbidity => Some(Metric::Turbidity),
            _ => None,
        }
    }
}

struct FarmDashboardApp {
    config: AppConfig,
    client: ApiClient,

    farm: Arc<Mutex<Option<Farm>>>,
    devices: Arc<Mutex<Vec<Device>>>,
    latest: Arc<Mutex<Vec<TelemetryReading>>>,
    history: Arc<Mutex<Vec<TelemetryReading>>>,
    poll_status: Arc<Mutex<PollStatus>>,

    page: Page,
    selected_device: Option<String>,
    // Snapshot of the device working set; a mismatch means the set changed
    // and both telemetry refreshes run immediately.
    known_device_ids: Vec<String>,
    last_latest_refresh: Option<Instant>,
    last_history_refresh: Option<Instant>,

    table_state: ui::TablePageState,
    settings_state: ui::SettingsState,
}

impl FarmDashboardApp {
    fn new() -> Self {
        let config = config::load_config();
        config::save_config(&config);
        let client = ApiClient::new(config.api_base_url.clone());

        let app = Self {
            client: client.clone(),
            farm: Arc::new(Mutex::new(None)),
            devices: Arc::new(Mutex::new(Vec::new())),
            latest: Arc::new(Mutex::new(Vec::new())),
            history: Arc::new(Mutex::new(Vec::new())),
            poll_status: Arc::new(Mutex::new(PollStatus::default())),
            page: Page::Overview,
            selected_device: None,
            known_device_ids: Vec::new(),
            last_latest_refresh: None,
            last_history_refresh: None,
            table_state: ui::TablePageState::new(),
            settings_state: ui::SettingsState::new(),
            config,
        };

        poller::refresh_farm(
            client.clone(),
            app.config.farm_id,
            Arc::clone(&app.farm),
            Arc::clone(&app.poll_status),
        );
        poller::refresh_devices(
            client,
            app.config.farm_id,
            Arc::clone(&app.devices),
            Arc::clone(&app.poll_status),
        );

        app
    }

    /// Refresh scheduling runs off the UI tick: compare elapsed time against
    /// the configured periods and skip while a refresh of the same kind is
    /// still in flight. Timers are owned by the app, so closing the window
    /// tears them down with it.
    fn schedule_refreshes(&mut self) {
        let devices = self.devices.lock().unwrap().clone();

        // A device-set change forces both refreshes immediately.
        let ids: Vec<String> = devices.iter().map(|d| d.id.clone()).collect();
        if ids != self.known_device_ids {
            self.known_device_ids = ids;
            self.last_latest_refresh = None;
            self.last_history_refresh = None;
        }

        let (latest_in_flight, history_in_flight) = {
            let status = self.poll_status.lock().unwrap();
            (status.latest_in_flight, status.history_in_flight)
        };

        let latest_due = match self.last_latest_refresh {
            Some(t) => t.elapsed().as_secs() >= self.config.latest_refresh_secs,
            None => true,
        };
        if latest_due && !latest_in_flight {
            poller::refresh_latest(
                self.client.clone(),
                devices.clone(),
                Arc::clone(&self.latest),
                Arc::clone(&self.poll_status),
            );
            self.last_latest_refresh = Some(Instant::now());
        }

        let history_due = match self.last_history_refresh {
            Some(t) => t.elapsed().as_secs() >= self.config.history_refresh_secs,
            None => true,
        };
        if history_due && !history_in_flight {
            poller::refresh_history(
                self.client.clone(),
                devices,
                self.config.history_window_hours,
                Arc::clone(&self.history),
                Arc::clone(&self.poll_status),
            );
            self.last_history_refresh = Some(Instant::now());
        }
    }

    fn draw_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar")
            .frame(egui::Frame::new().fill(Color32::from_rgb(18, 18, 18)))
            .show(ctx, |ui| {
                ui.add_space(12.0);
                ui.horizontal(|ui| {
                    ui.add_space(20.0);
                    ui.label(
                        egui::RichText::new("🐟 FISH FARM TELEMETRY")
                            .size(16.0)
                            .color(Color32::from_rgb(52, 211, 153))
                            .monospace(),
                    );

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.add_space(20.0);

                        let devices = self.devices.lock().unwrap().clone();

                        // Device selector: "All devices" or a single id.
                        let selected_text = self
                            .selected_device
                            .clone()
                            .unwrap_or_else(|| "All devices".to_string());
                        egui::ComboBox::from_id_salt("device_selector")
                            .selected_text(
                                egui::RichText::new(selected_text).size(11.0).monospace(),
                            )
                            .show_ui(ui, |ui| {
                                ui.selectable_value(
                                    &mut self.selected_device,
                                    None,
                                    "All devices",
                                );
                                for device in &devices {
                                    ui.selectable_value(
                                        &mut self.selected_device,
                                        Some(device.id.clone()),
                                        &device.id,
                                    );
                                }
                            });

                        ui.add_space(10.0);
                        ui.label(
                            egui::RichText::new(format!("DEVICES: {}", devices.len()))
                                .size(11.0)
                                .color(Color32::from_rgb(160, 160, 160))
                                .monospace(),
                        );

                        if let Some(last) = self.last_latest_refresh {
                            ui.add_space(10.0);
                            ui.label(
                                egui::RichText::new(format!(
                                    "Refreshed {}s ago",
                                    last.elapsed().as_secs()
                                ))
                                .size(10.0)
                                .color(Color32::from_rgb(120, 120, 120))
                                .monospace(),
                            );
                        }

                        let busy = {
                            let status = self.poll_status.lock().unwrap();
                            status.farm_in_flight
                                || status.devices_in_flight
                                || status.latest_in_flight
                                || status.history_in_flight
                        };
                        if busy {
                            ui.add_space(10.0);
                            ui.spinner();
                        }
                    });
                });

                ui.add_space(12.0);
                ui.separator();
                ui.add_space(8.0);

                ui.horizontal(|ui| {
                    ui.add_space(20.0);
                    for page in Page::ALL {
                        let selected = self.page == page;
                        let color = if selected {
                            Color32::from_rgb(52, 211, 153)
                        } else {
                            Color32::from_rgb(160, 160, 160)
                        };
                        if ui
                            .selectable_label(
                                selected,
                                egui::RichText::new(page.label())
                                    .size(11.0)
                                    .color(color)
                                    .monospace(),
                            )
                            .clicked()
                        {
                            self.page = page;
                        }
                        ui.add_space(5.0);
                    }
                });

                ui.add_space(8.0);
            });
    }

    fn draw_page(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let farm = self.farm.lock().unwrap().clone();
        let latest = self.latest.lock().unwrap().clone();
        let filtered = filter_by_device(&latest, self.selected_device.as_deref());

        match self.page {
            Page::Overview => match &farm {
                Some(farm) => ui::draw_overview_page(ui, farm, &filtered),
                None => draw_farm_loading(ui),
            },
            Page::Temperature | Page::PhLevel | Page::DissolvedOxygen | Page::Turbidity => {
                match &farm {
                    Some(farm) => {
                        let metric = self.page.metric().unwrap_or(Metric::Temperature);
                        let history = self.history.lock().unwrap().clone();
                        ui::draw_metric_page(ui, metric, farm, &filtered, &history);
                    }
                    None => draw_farm_loading(ui),
                }
            }
            Page::Table => {
                ui::draw_table_page(
                    ui,
                    &mut self.table_state,
                    &self.client,
                    self.selected_device.as_deref(),
                );
            }
            Page::Settings => {
                ui::draw_settings_page(
                    ctx,
                    ui,
                    &mut self.settings_state,
                    &self.client,
                    Arc::clone(&self.farm),
                    Arc::clone(&self.devices),
                    self.config.farm_id,
                );
            }
        }
    }
}

fn draw_farm_loading(ui: &mut egui::Ui) {
    ui.add_space(40.0);
    ui.vertical_centered(|ui| {
        ui.spinner();
        ui.add_space(10.0);
        ui.label(
            egui::RichText::new("Loading farm settings...")
                .size(12.0)
                .color(Color32::from_rgb(120, 120, 120))
                .monospace(),
        );
    });
}

impl eframe::App for FarmDashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(egui::Visuals {
            dark_mode: true,
            window_fill: Color32::from_rgb(18, 18, 18),
            panel_fill: Color32::from_rgb(18, 18, 18),
            override_text_color: Some(Color32::from_rgb(200, 200, 200)),
            ..Default::default()
        });

        self.schedule_refreshes();

        self.draw_top_bar(ctx);

        egui::CentralPanel::default()
            .frame(
                egui::Frame::new()
                    .fill(Color32::from_rgb(18, 18, 18))
                    .inner_margin(20.0),
            )
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.draw_page(ctx, ui);
                });
            });

        // Keep the refresh scheduling ticking even without input events.
        ctx.request_repaint_after(Duration::from_secs(1));
    }
}
