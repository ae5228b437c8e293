// 使用者看得到的固定訊息

pub const SUCCESS_COLOR: &str = "#4CAF50";
pub const WARNING_COLOR: &str = "#ffa500";
pub const ERROR_COLOR: &str = "#ff4444";

pub const INVALID_FILE: &str = "Please upload KML files only";
pub const NO_SELECTION: &str = "Please select a KML first";
pub const LOAD_FAILED: &str = "Failed to load file";
pub const NETWORK_ERROR: &str = "Network error - please check your connection";
pub const UNKNOWN_ERROR: &str = "An unexpected error occurred";
pub const CHANGES_SAVED: &str = "Changes saved successfully";

pub fn kml_added(file_name: &str) -> String {
    format!("KML \"{}\" was added successfully", file_name)
}

pub fn project_loaded(project: &str) -> String {
    format!("Project \"{}\" was loaded successfully", project)
}

pub fn duplicate(file_name: &str) -> String {
    format!("The file \"{}\" already exists", file_name)
}

pub fn ignored_duplicates(names: &[String]) -> String {
    format!("<b>Ignored as duplicate:</b>\n{}", names.join("\n"))
}

pub fn added_files(names: &[String]) -> String {
    format!("<b>Added successfully:</b>\n{}", names.join("\n"))
}
