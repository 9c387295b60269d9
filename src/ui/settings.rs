use crate::api::ApiClient;
use crate::models::{Device, Farm};
use eframe::egui;
use egui::Color32;
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{info, warn};

/// Settings page state. `form` is a detached copy of the farm: failed saves
/// keep the user's edits, and a successful save writes the server's response
/// back into the shared farm store and resyncs the form from it.
pub struct SettingsState {
    pub form: Option<Farm>,
    pub saving: Arc<Mutex<bool>>,
    pub saved: Arc<Mutex<bool>>,
    pub new_device_id: String,
    pub adding: Arc<Mutex<bool>>,
    pub device_to_delete: Option<String>,
    pub deleting: Arc<Mutex<bool>>,
}

impl SettingsState {
    pub fn new() -> Self {
        Self {
            form: None,
            saving: Arc::new(Mutex::new(false)),
            saved: Arc::new(Mutex::new(false)),
            new_device_id: String::new(),
            adding: Arc::new(Mutex::new(false)),
            device_to_delete: None,
            deleting: Arc::new(Mutex::new(false)),
        }
    }
}

fn save_farm(
    client: ApiClient,
    form: Farm,
    farm_store: Arc<Mutex<Option<Farm>>>,
    saving: Arc<Mutex<bool>>,
    saved: Arc<Mutex<bool>>,
) {
    *saving.lock().unwrap() = true;

    thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();

        rt.block_on(async {
            match client.update_farm(form.id, &form).await {
                Ok(updated) => {
                    info!(farm_id = form.id, "farm settings saved");
                    *farm_store.lock().unwrap() = Some(updated);
                    *saved.lock().unwrap() = true;
                }
                Err(e) => warn!(farm_id = form.id, error = %e, "farm settings save failed"),
            }
        });

        *saving.lock().unwrap() = false;
    });
}

/// After a save completes, the form is replaced with the store's copy so
/// any normalization the server applied shows up in the fields. Failed
/// saves never set the flag, so unsaved edits survive them.
fn sync_form_after_save(
    saved: &Mutex<bool>,
    form: &mut Option<Farm>,
    farm_store: &Mutex<Option<Farm>>,
) {
    if std::mem::take(&mut *saved.lock().unwrap()) {
        *form = farm_store.lock().unwrap().clone();
    }
}

fn add_device(
    client: ApiClient,
    device: Device,
    devices_store: Arc<Mutex<Vec<Device>>>,
    adding: Arc<Mutex<bool>>,
) {
    *adding.lock().unwrap() = true;

    thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();

        rt.block_on(async {
            let farm_id = device.farm_id;
            match client.create_device(&device).await {
                Ok(created) => info!(device_id = %created.id, "device added"),
                Err(e) => warn!(device_id = %device.id, error = %e, "device create failed"),
            }
            // Refresh the working set from the backend either way so the
            // list reflects what the server actually has.
            match client.list_devices(farm_id).await {
                Ok(list) => *devices_store.lock().unwrap() = list,
                Err(e) => warn!(farm_id, error = %e, "device list refresh failed"),
            }
        });

        *adding.lock().unwrap() = false;
    });
}

fn remove_device(
    client: ApiClient,
    device_id: String,
    farm_id: i64,
    devices_store: Arc<Mutex<Vec<Device>>>,
    deleting: Arc<Mutex<bool>>,
) {
    *deleting.lock().unwrap() = true;

    thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();

        rt.block_on(async {
            match client.delete_device(&device_id).await {
                Ok(()) => info!(%device_id, "device deleted"),
                Err(e) => warn!(%device_id, error = %e, "device delete failed"),
            }
            match client.list_devices(farm_id).await {
                Ok(list) => *devices_store.lock().unwrap() = list,
                Err(e) => warn!(farm_id, error = %e, "device list refresh failed"),
            }
        });

        *deleting.lock().unwrap() = false;
    });
}

fn draw_range_row(ui: &mut egui::Ui, title: &str, min: &mut f64, max: &mut f64) {
    ui.horizontal(|ui| {
        ui.label(
            egui::RichText::new(title)
                .size(11.0)
                .color(Color32::from_rgb(160, 160, 160))
                .monospace(),
        );

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.add(egui::DragValue::new(max).speed(0.1).fixed_decimals(1));
            ui.label(
                egui::RichText::new("MAX")
                    .size(10.0)
                    .color(Color32::from_rgb(120, 120, 120))
                    .monospace(),
            );
            ui.add_space(15.0);
            ui.add(egui::DragValue::new(min).speed(0.1).fixed_decimals(1));
            ui.label(
                egui::RichText::new("MIN")
                    .size(10.0)
                    .color(Color32::from_rgb(120, 120, 120))
                    .monospace(),
            );
        });
    });
    ui.add_space(8.0);
}

pub fn draw_settings_page(
    ctx: &egui::Context,
    ui: &mut egui::Ui,
    state: &mut SettingsState,
    client: &ApiClient,
    farm_store: Arc<Mutex<Option<Farm>>>,
    devices_store: Arc<Mutex<Vec<Device>>>,
    farm_id: i64,
) {
    // The form detaches from the store on first open and keeps its own
    // edits until a save goes through.
    if state.form.is_none() {
        state.form = farm_store.lock().unwrap().clone();
    }
    sync_form_after_save(&state.saved, &mut state.form, &farm_store);

    // Optimal ranges card
    egui::Frame::new()
        .fill(Color32::from_rgb(28, 28, 28))
        .stroke(egui::Stroke::new(1.0, Color32::from_rgb(60, 60, 60)))
        .corner_radius(4.0)
        .inner_margin(15.0)
        .show(ui, |ui| {
            ui.label(
                egui::RichText::new("OPTIMAL RANGES")
                    .size(13.0)
                    .color(Color32::from_rgb(240, 240, 240))
                    .strong()
                    .monospace(),
            );

            ui.add_space(10.0);

            match &mut state.form {
                Some(form) => {
                    draw_range_row(
                        ui,
                        "TEMPERATURE (°C)",
                        &mut form.temperature_min,
                        &mut form.temperature_max,
                    );
                    draw_range_row(ui, "PH LEVEL", &mut form.ph_min, &mut form.ph_max);
                    draw_range_row(
                        ui,
                        "DISSOLVED OXYGEN (MG/L)",
                        &mut form.do_min,
                        &mut form.do_max,
                    );
                    draw_range_row(
                        ui,
                        "TURBIDITY (V)",
                        &mut form.turbidity_min,
                        &mut form.turbidity_max,
                    );

                    ui.add_space(10.0);

                    let saving = *state.saving.lock().unwrap();
                    let save_btn = egui::Button::new(
                        egui::RichText::new(if saving { "Saving..." } else { "Save changes" })
                            .size(12.0)
                            .color(Color32::WHITE)
                            .monospace(),
                    )
                    .fill(Color32::from_rgb(52, 211, 153))
                    .corner_radius(4.0);

                    if ui.add_enabled(!saving, save_btn).clicked() {
                        save_farm(
                            client.clone(),
                            form.clone(),
                            Arc::clone(&farm_store),
                            Arc::clone(&state.saving),
                            Arc::clone(&state.saved),
                        );
                    }
                }
                None => {
                    ui.label(
                        egui::RichText::new("Farm settings not loaded yet")
                            .size(11.0)
                            .color(Color32::from_rgb(120, 120, 120))
                            .monospace(),
                    );
                }
            }
        });

    ui.add_space(15.0);

    // Device management card
    egui::Frame::new()
        .fill(Color32::from_rgb(28, 28, 28))
        .stroke(egui::Stroke::new(1.0, Color32::from_rgb(60, 60, 60)))
        .corner_radius(4.0)
        .inner_margin(15.0)
        .show(ui, |ui| {
            ui.label(
                egui::RichText::new("DEVICE MANAGEMENT")
                    .size(13.0)
                    .color(Color32::from_rgb(240, 240, 240))
                    .strong()
                    .monospace(),
            );

            ui.add_space(10.0);

            let devices = devices_store.lock().unwrap().clone();
            if devices.is_empty() {
                ui.label(
                    egui::RichText::new("No devices found")
                        .size(11.0)
                        .color(Color32::from_rgb(120, 120, 120))
                        .monospace(),
                );
            }

            for device in &devices {
                ui.horizontal(|ui| {
                    ui.label(
                        egui::RichText::new(&device.id)
                            .size(11.0)
                            .color(Color32::from_rgb(200, 200, 200))
                            .monospace(),
                    );

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui
                            .button(
                                egui::RichText::new("✕")
                                    .color(Color32::from_rgb(255, 100, 100)),
                            )
                            .clicked()
                        {
                            state.device_to_delete = Some(device.id.clone());
                        }
                    });
                });
            }

            ui.add_space(10.0);
            ui.separator();
            ui.add_space(10.0);

            ui.horizontal(|ui| {
                ui.add(
                    egui::TextEdit::singleline(&mut state.new_device_id)
                        .desired_width(200.0)
                        .hint_text("Enter device ID"),
                );

                let adding = *state.adding.lock().unwrap();
                let can_add = !adding && !state.new_device_id.trim().is_empty();
                if ui
                    .add_enabled(
                        can_add,
                        egui::Button::new(if adding { "Adding..." } else { "Add device" }),
                    )
                    .clicked()
                {
                    add_device(
                        client.clone(),
                        Device {
                            id: state.new_device_id.trim().to_string(),
                            farm_id,
                        },
                        Arc::clone(&devices_store),
                        Arc::clone(&state.adding),
                    );
                    state.new_device_id.clear();
                }
            });
        });

    // Delete confirmation modal
    if let Some(device_id) = state.device_to_delete.clone() {
        let mut is_open = true;
        let mut confirmed = false;
        let mut cancelled = false;

        egui::Window::new("Confirm deletion")
            .id(egui::Id::new("device_delete_confirm"))
            .collapsible(false)
            .resizable(false)
            .open(&mut is_open)
            .show(ctx, |ui| {
                ui.label(format!(
                    "Delete device {device_id}? This cannot be undone."
                ));
                ui.add_space(10.0);

                ui.horizontal(|ui| {
                    let deleting = *state.deleting.lock().unwrap();
                    if ui.add_enabled(!deleting, egui::Button::new("Cancel")).clicked() {
                        cancelled = true;
                    }

                    let delete_btn = egui::Button::new(
                        egui::RichText::new(if deleting { "Deleting..." } else { "Delete" })
                            .color(Color32::WHITE),
                    )
                    .fill(Color32::from_rgb(239, 68, 68));

                    if ui.add_enabled(!deleting, delete_btn).clicked() {
                        confirmed = true;
                    }
                });
            });

        if confirmed {
            remove_device(
                client.clone(),
                device_id,
                farm_id,
                Arc::clone(&devices_store),
                Arc::clone(&state.deleting),
            );
            state.device_to_delete = None;
        } else if cancelled || !is_open {
            state.device_to_delete = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::farm;

    #[test]
    fn completed_save_replaces_form_with_store_copy() {
        let mut edited = farm("tilapia pond");
        edited.temperature_max = 30.0;
        let mut server_copy = farm("tilapia pond");
        server_copy.temperature_max = 29.9;

        let saved = Mutex::new(true);
        let store = Mutex::new(Some(server_copy.clone()));
        let mut form = Some(edited);

        sync_form_after_save(&saved, &mut form, &store);
        assert_eq!(form, Some(server_copy));
        assert!(!*saved.lock().unwrap());
    }

    #[test]
    fn failed_save_keeps_unsaved_edits() {
        let mut edited = farm("tilapia pond");
        edited.ph_min = 6.0;

        let saved = Mutex::new(false);
        let store = Mutex::new(Some(farm("tilapia pond")));
        let mut form = Some(edited.clone());

        sync_form_after_save(&saved, &mut form, &store);
        assert_eq!(form, Some(edited));
    }
}
