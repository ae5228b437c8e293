use crate::utils::error::{Result, ViewerError};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Minimal element tree; KML documents are small enough to hold in memory.
#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ViewerError::parse(format!("bad attribute on <{}>: {}", name, e)))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| ViewerError::parse(format!("bad attribute value on <{}>: {}", name, e)))?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            ..Self::default()
        })
    }

    fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.as_str())
            .filter(|t| !t.is_empty())
    }

    fn collect_named<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            } else {
                child.collect_named(name, out);
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(text);
    }
}

fn read_tree(text: &str) -> Result<Element> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    // stack[0] 是文件本身
    let mut stack: Vec<Element> = vec![Element::default()];

    loop {
        let position = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(Element::from_start(e)?),
            Ok(Event::Empty(ref e)) => {
                let element = Element::from_start(e)?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(element);
                }
            }
            Ok(Event::End(_)) => {
                if stack.len() < 2 {
                    return Err(ViewerError::parse(format!(
                        "unexpected closing tag at byte {}",
                        position
                    )));
                }
                if let Some(element) = stack.pop() {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(element);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                let unescaped = t
                    .unescape()
                    .map_err(|e| ViewerError::parse(format!("at byte {}: {}", position, e)))?;
                if let Some(current) = stack.last_mut() {
                    current.push_text(unescaped.trim());
                }
            }
            Ok(Event::CData(c)) => {
                let raw = c.into_inner();
                if let Some(current) = stack.last_mut() {
                    current.push_text(String::from_utf8_lossy(&raw).trim());
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ViewerError::parse(format!(
                    "at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    if stack.len() != 1 {
        let open = stack.last().map(|e| e.name.clone()).unwrap_or_default();
        return Err(ViewerError::parse(format!("unclosed element <{}>", open)));
    }

    let mut document = stack.pop().unwrap_or_default();
    match document.children.len() {
        0 => Err(ViewerError::parse("document has no root element")),
        1 => Ok(document.children.remove(0)),
        n => Err(ViewerError::parse(format!("document has {} root elements", n))),
    }
}

fn parse_position(tuple: &[&str]) -> Option<Vec<f64>> {
    let numbers: Vec<f64> = tuple
        .iter()
        .map(|part| part.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    if numbers.len() < 2 || numbers.iter().any(|n| !n.is_finite()) {
        return None;
    }
    Some(numbers.into_iter().take(3).collect())
}

/// `lon,lat[,alt]` tuples separated by whitespace.
fn parse_coordinates(text: &str) -> Vec<Vec<f64>> {
    text.split_whitespace()
        .filter_map(|tuple| {
            let parts: Vec<&str> = tuple.split(',').filter(|p| !p.is_empty()).collect();
            parse_position(&parts)
        })
        .collect()
}

fn coordinates_of(element: &Element) -> Vec<Vec<f64>> {
    element
        .child_text("coordinates")
        .map(parse_coordinates)
        .unwrap_or_default()
}

fn ring_of(boundary: &Element) -> Option<Vec<Vec<f64>>> {
    let ring = coordinates_of(boundary.child("LinearRing")?);
    if ring.is_empty() {
        None
    } else {
        Some(ring)
    }
}

fn collect_geometries(element: &Element, out: &mut Vec<Geometry>) {
    for child in &element.children {
        match child.name.as_str() {
            "Point" => {
                if let Some(position) = coordinates_of(child).into_iter().next() {
                    out.push(Geometry::new(Value::Point(position)));
                }
            }
            "LineString" => {
                let line = coordinates_of(child);
                if !line.is_empty() {
                    out.push(Geometry::new(Value::LineString(line)));
                }
            }
            "LinearRing" => {
                let ring = coordinates_of(child);
                if !ring.is_empty() {
                    out.push(Geometry::new(Value::Polygon(vec![ring])));
                }
            }
            "Polygon" => {
                let Some(outer) = child.child("outerBoundaryIs").and_then(ring_of) else {
                    continue;
                };
                let mut rings = vec![outer];
                rings.extend(child.children_named("innerBoundaryIs").filter_map(ring_of));
                out.push(Geometry::new(Value::Polygon(rings)));
            }
            "MultiGeometry" => collect_geometries(child, out),
            "Track" => {
                // gx:coord 用空白分隔 "lon lat alt"
                let line: Vec<Vec<f64>> = child
                    .children_named("coord")
                    .filter_map(|c| {
                        let parts: Vec<&str> = c.text.split_whitespace().collect();
                        parse_position(&parts)
                    })
                    .collect();
                if !line.is_empty() {
                    out.push(Geometry::new(Value::LineString(line)));
                }
            }
            _ => {}
        }
    }
}

fn properties_of(placemark: &Element) -> JsonObject {
    let mut properties = JsonObject::new();
    for key in ["name", "description", "styleUrl"] {
        if let Some(text) = placemark.child_text(key) {
            properties.insert(key.to_string(), serde_json::Value::String(text.to_string()));
        }
    }

    if let Some(extended) = placemark.child("ExtendedData") {
        for data in extended.children_named("Data") {
            if let (Some(name), Some(value)) = (data.attribute("name"), data.child("value")) {
                properties.insert(name.to_string(), serde_json::Value::String(value.text.clone()));
            }
        }
        for schema in extended.children_named("SchemaData") {
            for simple in schema.children_named("SimpleData") {
                if let Some(name) = simple.attribute("name") {
                    properties.insert(
                        name.to_string(),
                        serde_json::Value::String(simple.text.clone()),
                    );
                }
            }
        }
    }
    properties
}

fn placemark_to_feature(placemark: &Element) -> Option<Feature> {
    let mut geometries = Vec::new();
    collect_geometries(placemark, &mut geometries);

    let geometry = match geometries.len() {
        0 => return None,
        1 => geometries.pop()?,
        _ => Geometry::new(Value::GeometryCollection(geometries)),
    };

    Some(Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties_of(placemark)),
        foreign_members: None,
    })
}

/// Parses a KML document into a GeoJSON feature collection.
///
/// Fails with [`ViewerError::Parse`] when the text is not well-formed XML or
/// the root element is not `<kml>`. Placemarks without usable geometry are
/// skipped.
pub fn parse_document(text: &str) -> Result<FeatureCollection> {
    let root = read_tree(text)?;
    if root.name != "kml" {
        return Err(ViewerError::parse(format!(
            "expected <kml> root element, found <{}>",
            root.name
        )));
    }

    let mut placemarks = Vec::new();
    root.collect_named("Placemark", &mut placemarks);

    let features: Vec<Feature> = placemarks
        .into_iter()
        .filter_map(placemark_to_feature)
        .collect();

    tracing::debug!("Parsed KML document with {} features", features.len());

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUTE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <name>Befahrung</name>
    <Folder>
      <Placemark>
        <name>Abschnitt 01</name>
        <description><![CDATA[<b>Strecke</b> Nord]]></description>
        <LineString>
          <coordinates>
            10.0,51.0,0 10.1,51.1,0
            10.2,51.15,0
          </coordinates>
        </LineString>
      </Placemark>
      <Placemark>
        <name>Start</name>
        <Point><coordinates>10.0,51.0</coordinates></Point>
      </Placemark>
    </Folder>
  </Document>
</kml>"#;

    #[test]
    fn test_parse_line_and_point() {
        let collection = parse_document(ROUTE).unwrap();
        assert_eq!(collection.features.len(), 2);

        let line = &collection.features[0];
        let props = line.properties.as_ref().unwrap();
        assert_eq!(props["name"], "Abschnitt 01");
        assert_eq!(props["description"], "<b>Strecke</b> Nord");
        match &line.geometry.as_ref().unwrap().value {
            Value::LineString(coords) => {
                assert_eq!(coords.len(), 3);
                assert_eq!(coords[2], vec![10.2, 51.15, 0.0]);
            }
            other => panic!("expected line, got {:?}", other),
        }

        match &collection.features[1].geometry.as_ref().unwrap().value {
            Value::Point(p) => assert_eq!(p, &vec![10.0, 51.0]),
            other => panic!("expected point, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_polygon_with_hole() {
        let kml = r#"<kml><Placemark><Polygon>
            <outerBoundaryIs><LinearRing><coordinates>0,0 4,0 4,4 0,4 0,0</coordinates></LinearRing></outerBoundaryIs>
            <innerBoundaryIs><LinearRing><coordinates>1,1 2,1 2,2 1,1</coordinates></LinearRing></innerBoundaryIs>
        </Polygon></Placemark></kml>"#;
        let collection = parse_document(kml).unwrap();
        match &collection.features[0].geometry.as_ref().unwrap().value {
            Value::Polygon(rings) => {
                assert_eq!(rings.len(), 2);
                assert_eq!(rings[0].len(), 5);
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_multi_geometry_becomes_collection() {
        let kml = r#"<kml><Placemark><MultiGeometry>
            <Point><coordinates>1,1</coordinates></Point>
            <LineString><coordinates>1,1 2,2</coordinates></LineString>
        </MultiGeometry></Placemark></kml>"#;
        let collection = parse_document(kml).unwrap();
        match &collection.features[0].geometry.as_ref().unwrap().value {
            Value::GeometryCollection(parts) => assert_eq!(parts.len(), 2),
            other => panic!("expected collection, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_gx_track() {
        let kml = r#"<kml xmlns:gx="http://www.google.com/kml/ext/2.2"><Placemark>
            <gx:Track>
              <when>2024-05-17T10:00:00Z</when>
              <gx:coord>10.0 51.0 120</gx:coord>
              <gx:coord>10.5 51.5 121</gx:coord>
            </gx:Track>
        </Placemark></kml>"#;
        let collection = parse_document(kml).unwrap();
        match &collection.features[0].geometry.as_ref().unwrap().value {
            Value::LineString(coords) => assert_eq!(coords[1], vec![10.5, 51.5, 121.0]),
            other => panic!("expected line, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_extended_data() {
        let kml = r##"<kml><Placemark>
            <ExtendedData>
              <Data name="fahrer"><value>M &amp; K</value></Data>
              <SchemaData schemaUrl="#s"><SimpleData name="km">12.5</SimpleData></SchemaData>
            </ExtendedData>
            <LineString><coordinates>1,1 2,2</coordinates></LineString>
        </Placemark></kml>"##;
        let collection = parse_document(kml).unwrap();
        let props = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(props["fahrer"], "M & K");
        assert_eq!(props["km"], "12.5");
        assert!(!props.contains_key("name"));
    }

    #[test]
    fn test_placemark_without_geometry_is_skipped() {
        let kml = r#"<kml><Placemark><name>leer</name></Placemark>
            <Placemark><LineString><coordinates>x,y 1,1 2,2</coordinates></LineString></Placemark></kml>"#;
        let collection = parse_document(kml).unwrap();
        assert_eq!(collection.features.len(), 1);
        match &collection.features[0].geometry.as_ref().unwrap().value {
            Value::LineString(coords) => assert_eq!(coords.len(), 2),
            other => panic!("expected line, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_documents_are_rejected() {
        assert!(parse_document("").is_err());
        assert!(parse_document("not xml at all").is_err());
        assert!(parse_document("<kml><Placemark></kml>").is_err());
        assert!(parse_document("<kml><Document>").is_err());
        assert!(parse_document("<gpx></gpx>").is_err());
    }

    #[test]
    fn test_parse_error_kind() {
        let err = parse_document("<kml><Document>").unwrap_err();
        assert!(matches!(err, ViewerError::Parse { .. }));
    }
}
