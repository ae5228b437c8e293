use kml_mapper::core::filename::extract_key;
use kml_mapper::core::list::{ClickModifier, ContextAction};
use kml_mapper::core::IncomingFile;
use kml_mapper::domain::model::{HexColor, LineStyle};
use kml_mapper::utils::sanitize::sanitize_project_name;
use kml_mapper::{Ingestor, LayerRegistry, ListController, LocalProjectStore, NotificationCenter, SceneMap};
use std::sync::Arc;

fn survey(lon: f64) -> String {
    format!(
        "<kml><Placemark><LineString><coordinates>{},48.1 {},48.2</coordinates></LineString></Placemark></kml>",
        lon,
        lon + 0.1
    )
}

fn viewer() -> (Ingestor<NotificationCenter>, ListController<SceneMap>) {
    // inline files never touch the store
    let store = LocalProjectStore::new("unused-projects", "unused-users");
    (
        Ingestor::new(Arc::new(store), NotificationCenter::new()),
        ListController::new(LayerRegistry::new(), SceneMap::new(), LineStyle::default()),
    )
}

#[test]
fn test_sanitize_survey_project_name() {
    assert_eq!(sanitize_project_name("Befahrung Müller+Co."), "Mueller_plus_Co");
}

#[test]
fn test_extract_key_of_route_segment() {
    assert_eq!(extract_key("Route_Segment_01_XYZ.kml"), "eg");
}

#[tokio::test]
async fn test_two_files_dropped_together() {
    let (mut ingestor, mut list) = viewer();

    let summary = ingestor.ingest(
        &list,
        vec![
            IncomingFile::inline("A_01_Survey.kml", survey(11.0)),
            IncomingFile::inline("A_02_Survey.kml", survey(11.5)),
        ],
    );
    ingestor.drain(&mut list).await;

    assert_eq!(summary.added_names, vec!["A_01_Survey.kml", "A_02_Survey.kml"]);
    assert!(summary.ignored_names.is_empty());
    assert_eq!(list.display_order(), &["A_01_Survey.kml", "A_02_Survey.kml"]);
}

#[tokio::test]
async fn test_same_file_dropped_twice() {
    let (mut ingestor, mut list) = viewer();

    ingestor.ingest(&list, vec![IncomingFile::inline("A_01_Survey.kml", survey(11.0))]);
    ingestor.drain(&mut list).await;
    let summary = ingestor.ingest(&list, vec![IncomingFile::inline("A_01_Survey.kml", survey(11.0))]);

    assert!(summary.added_names.is_empty());
    assert_eq!(summary.ignored_names, vec!["A_01_Survey.kml"]);
    assert_eq!(list.len(), 1);
}

#[tokio::test]
async fn test_shift_select_covers_range_in_display_order() {
    let (mut ingestor, mut list) = viewer();
    let names: Vec<String> = (0..5).map(|i| format!("Lauf_{}_x_Strecke.kml", i)).collect();
    let files = names
        .iter()
        .rev()
        .enumerate()
        .map(|(i, name)| IncomingFile::inline(name.clone(), survey(10.0 + i as f64)))
        .collect();
    ingestor.ingest(&list, files);
    ingestor.drain(&mut list).await;

    // click row 3, shift-click row 1
    let order = list.display_order().to_vec();
    list.click(&order[3], ClickModifier::None).unwrap();
    list.click(&order[1], ClickModifier::Range).unwrap();

    assert_eq!(list.selected_names(), order[1..=3].to_vec());
}

#[tokio::test]
async fn test_context_menu_actions() {
    let (mut ingestor, mut list) = viewer();
    ingestor.ingest(&list, vec![IncomingFile::inline("A_01_Survey.kml", survey(11.0))]);
    ingestor.drain(&mut list).await;

    let labels: Vec<&str> = list
        .context_menu("A_01_Survey.kml")
        .unwrap()
        .iter()
        .map(|item| item.label)
        .collect();
    assert_eq!(
        labels,
        vec!["Zoom to layer", "Change color", "Hide layer", "Delete layer"]
    );

    list.apply_context_action("A_01_Survey.kml", ContextAction::ZoomToBounds)
        .unwrap();
    assert!(list.map().viewport().is_some());

    let blue = HexColor::parse("#0000FF").unwrap();
    list.apply_context_action("A_01_Survey.kml", ContextAction::ChangeColor(blue))
        .unwrap();
    assert_eq!(list.row("A_01_Survey.kml").unwrap().color, "#0000ff");

    list.apply_context_action("A_01_Survey.kml", ContextAction::ToggleVisibility)
        .unwrap();
    assert_eq!(list.context_menu("A_01_Survey.kml").unwrap()[2].label, "Show layer");

    list.apply_context_action("A_01_Survey.kml", ContextAction::Delete)
        .unwrap();
    assert!(list.is_empty());
    assert_eq!(list.map().attached_count(), 0);
}
