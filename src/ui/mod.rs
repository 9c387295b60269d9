pub mod metric_page;
pub mod overview;
pub mod settings;
pub mod table_page;

pub use metric_page::draw_metric_page;
pub use overview::draw_overview_page;
pub use settings::{draw_settings_page, SettingsState};
pub use table_page::{draw_table_page, TablePageState};
