//! KML to GeoJSON conversion
//!
//! Parses the document into a small element tree, then walks every
//! `Placemark` and maps its Point, LineString or Polygon geometry onto GeoJSON.
//! Element lookups are qualified by the namespace of the root element, so a
//! `Placemark` from a foreign namespace is not picked up.
//!
//! Polygons only carry their exterior ring (`outerBoundaryIs`). Interior rings
//! (`innerBoundaryIs`, holes) are dropped.

use quick_xml::NsReader;
use quick_xml::events::Event;
use quick_xml::name::ResolveResult;

use crate::error::ConvertError;
use crate::preview::geojson::{Feature, FeatureCollection, Geometry, Position};

/// Convert a KML document to a serialized GeoJSON `FeatureCollection`.
pub fn kml_to_geojson(kml: &str) -> Result<String, ConvertError> {
    let collection = convert(kml)?;
    Ok(serde_json::to_string(&collection)?)
}

/// Convert a KML document to a GeoJSON `FeatureCollection`.
pub fn convert(kml: &str) -> Result<FeatureCollection, ConvertError> {
    let root = parse_document(kml)?;
    let ns = root.namespace.as_deref();

    let mut placemarks = Vec::new();
    for child in &root.children {
        child.collect(ns, "Placemark", &mut placemarks);
    }

    let mut features = Vec::new();
    for placemark in placemarks {
        let name = placemark.child(ns, "name").map(Element::value);
        if let Some(geometry) = placemark_geometry(placemark, ns)? {
            features.push(Feature::new(name, geometry));
        }
    }

    Ok(FeatureCollection::new(features))
}

/// First of Point, LineString, Polygon that has non-empty coordinates.
fn placemark_geometry(
    placemark: &Element,
    ns: Option<&[u8]>,
) -> Result<Option<Geometry>, ConvertError> {
    let point = placemark
        .child(ns, "Point")
        .and_then(|point| point.child(ns, "coordinates"))
        .map(Element::value);
    if let Some(text) = non_empty(point) {
        return Ok(Some(Geometry::Point(parse_position(&text)?)));
    }

    let line = placemark
        .child(ns, "LineString")
        .and_then(|line| line.child(ns, "coordinates"))
        .map(Element::value);
    if let Some(text) = non_empty(line) {
        return Ok(Some(Geometry::LineString(parse_positions(&text)?)));
    }

    let outer_ring = placemark.child(ns, "Polygon").and_then(|polygon| {
        let mut boundaries = Vec::new();
        polygon.collect_within(ns, "outerBoundaryIs", &mut boundaries);
        boundaries.into_iter().find_map(|boundary| {
            let mut coordinates = Vec::new();
            boundary.collect_within(ns, "coordinates", &mut coordinates);
            coordinates.first().map(|c| c.value())
        })
    });
    if let Some(text) = non_empty(outer_ring) {
        return Ok(Some(Geometry::Polygon(vec![parse_positions(&text)?])));
    }

    Ok(None)
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Parse `lon,lat[,alt]`; altitude is dropped.
fn parse_position(tuple: &str) -> Result<Position, ConvertError> {
    let mut parts = tuple.split(',').map(str::trim).filter(|p| !p.is_empty());
    let mut next = || {
        parts
            .next()
            .and_then(|p| p.parse::<f64>().ok())
            .filter(|v| v.is_finite())
    };

    match (next(), next()) {
        (Some(lon), Some(lat)) => Ok([lon, lat]),
        _ => Err(ConvertError::InvalidCoordinate(tuple.to_string())),
    }
}

/// Parse a whitespace-separated list of coordinate tuples.
fn parse_positions(text: &str) -> Result<Vec<Position>, ConvertError> {
    text.split_whitespace().map(parse_position).collect()
}

#[derive(Debug, Default)]
struct Element {
    namespace: Option<Vec<u8>>,
    local_name: Vec<u8>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn new(namespace: ResolveResult<'_>, local_name: &[u8]) -> Self {
        let namespace = match namespace {
            ResolveResult::Bound(ns) => Some(ns.0.to_vec()),
            _ => None,
        };
        Self {
            namespace,
            local_name: local_name.to_vec(),
            ..Default::default()
        }
    }

    fn is(&self, ns: Option<&[u8]>, name: &str) -> bool {
        self.namespace.as_deref() == ns && self.local_name == name.as_bytes()
    }

    fn child(&self, ns: Option<&[u8]>, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is(ns, name))
    }

    /// Matching elements among this element and its descendants, document order.
    fn collect<'a>(&'a self, ns: Option<&[u8]>, name: &str, out: &mut Vec<&'a Element>) {
        if self.is(ns, name) {
            out.push(self);
        }
        self.collect_within(ns, name, out);
    }

    /// Matching descendants, excluding this element.
    fn collect_within<'a>(&'a self, ns: Option<&[u8]>, name: &str, out: &mut Vec<&'a Element>) {
        for child in &self.children {
            child.collect(ns, name, out);
        }
    }

    /// Concatenated text of this element and all descendants.
    fn value(&self) -> String {
        let mut value = self.text.clone();
        for child in &self.children {
            value.push_str(&child.value());
        }
        value
    }

    fn display_name(&self) -> String {
        String::from_utf8_lossy(&self.local_name).into_owned()
    }
}

fn parse_document(kml: &str) -> Result<Element, ConvertError> {
    let mut reader = NsReader::from_str(kml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_resolved_event()? {
            (ns, Event::Start(e)) => {
                stack.push(Element::new(ns, e.local_name().as_ref()));
            }
            (ns, Event::Empty(e)) => {
                let element = Element::new(ns, e.local_name().as_ref());
                attach(&mut stack, &mut root, element);
            }
            (_, Event::End(_)) => {
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element);
                }
            }
            (_, Event::Text(t)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&t.unescape()?);
                }
            }
            (_, Event::CData(c)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            (_, Event::Eof) => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ConvertError::UnclosedElement(open.display_name()));
    }
    root.ok_or(ConvertError::MissingRoot)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn kml(placemarks: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    {placemarks}
  </Document>
</kml>"#
        )
    }

    fn to_value(kml: &str) -> Value {
        serde_json::from_str(&kml_to_geojson(kml).unwrap()).unwrap()
    }

    #[test]
    fn test_point() {
        let doc = kml("<Placemark><name>Here</name><Point><coordinates>1,2</coordinates></Point></Placemark>");
        let value = to_value(&doc);

        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(
            value["features"][0],
            json!({
                "type": "Feature",
                "properties": { "name": "Here" },
                "geometry": { "type": "Point", "coordinates": [1.0, 2.0] }
            })
        );
    }

    #[test]
    fn test_point_altitude_dropped() {
        let doc = kml(
            "<Placemark><Point><coordinates>\n  -122.08,37.42,50.5\n</coordinates></Point></Placemark>",
        );
        let value = to_value(&doc);
        assert_eq!(
            value["features"][0]["geometry"]["coordinates"],
            json!([-122.08, 37.42])
        );
        assert_eq!(value["features"][0]["properties"]["name"], Value::Null);
    }

    #[test]
    fn test_line_string() {
        let doc = kml(
            "<Placemark><name>Road</name><LineString><coordinates>
                1,2,0 3,4,0
                5.5,6.5
            </coordinates></LineString></Placemark>",
        );
        let collection = convert(&doc).unwrap();
        assert_eq!(
            collection.features[0].geometry,
            Geometry::LineString(vec![[1.0, 2.0], [3.0, 4.0], [5.5, 6.5]])
        );
    }

    #[test]
    fn test_polygon_emits_only_exterior_ring() {
        let doc = kml(
            "<Placemark><name>Field</name><Polygon>
                <outerBoundaryIs><LinearRing><coordinates>0,0 10,0 10,10 0,10 0,0</coordinates></LinearRing></outerBoundaryIs>
                <innerBoundaryIs><LinearRing><coordinates>2,2 4,2 4,4 2,2</coordinates></LinearRing></innerBoundaryIs>
            </Polygon></Placemark>",
        );
        let collection = convert(&doc).unwrap();

        // holes are intentionally not carried over
        let Geometry::Polygon(rings) = &collection.features[0].geometry else {
            panic!("expected a polygon");
        };
        assert_eq!(rings.len(), 1);
        assert_eq!(
            rings[0],
            vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]]
        );
        assert!(!rings[0].contains(&[2.0, 2.0]));
    }

    #[test]
    fn test_placemark_without_geometry_skipped() {
        let doc = kml(
            "<Placemark><name>Nothing</name></Placemark>
             <Placemark><name>Multi</name><MultiGeometry/></Placemark>
             <Placemark><name>Kept</name><Point><coordinates>3,4</coordinates></Point></Placemark>",
        );
        let collection = convert(&doc).unwrap();
        assert_eq!(collection.features.len(), 1);
        assert_eq!(collection.features[0].properties.name.as_deref(), Some("Kept"));
    }

    #[test]
    fn test_geometry_priority_and_empty_coordinates() {
        let doc = kml(
            "<Placemark><Point><coordinates>  </coordinates></Point>
                <LineString><coordinates>1,1 2,2</coordinates></LineString></Placemark>
             <Placemark><Point><coordinates>9,9</coordinates></Point>
                <LineString><coordinates>1,1 2,2</coordinates></LineString></Placemark>",
        );
        let collection = convert(&doc).unwrap();
        assert_eq!(
            collection.features[0].geometry,
            Geometry::LineString(vec![[1.0, 1.0], [2.0, 2.0]])
        );
        assert_eq!(collection.features[1].geometry, Geometry::Point([9.0, 9.0]));
    }

    #[test]
    fn test_document_order_across_folders() {
        let doc = kml(
            "<Folder><Placemark><name>first</name><Point><coordinates>1,1</coordinates></Point></Placemark></Folder>
             <Placemark><name>second</name><Point><coordinates>2,2</coordinates></Point></Placemark>",
        );
        let names: Vec<_> = convert(&doc)
            .unwrap()
            .features
            .into_iter()
            .map(|f| f.properties.name.unwrap())
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_foreign_namespace_ignored() {
        let doc = kml(
            r#"<x:Placemark xmlns:x="urn:other"><x:Point><x:coordinates>1,2</x:coordinates></x:Point></x:Placemark>"#,
        );
        assert!(convert(&doc).unwrap().features.is_empty());
    }

    #[test]
    fn test_prefixed_kml_namespace() {
        let doc = r#"<k:kml xmlns:k="http://www.opengis.net/kml/2.2"><k:Placemark><k:name>P</k:name><k:Point><k:coordinates>5,6</k:coordinates></k:Point></k:Placemark></k:kml>"#;
        let collection = convert(doc).unwrap();
        assert_eq!(collection.features[0].geometry, Geometry::Point([5.0, 6.0]));
    }

    #[test]
    fn test_document_without_namespace() {
        let doc = "<kml><Placemark><Point><coordinates>7,8</coordinates></Point></Placemark></kml>";
        let collection = convert(doc).unwrap();
        assert_eq!(collection.features[0].geometry, Geometry::Point([7.0, 8.0]));
    }

    #[test]
    fn test_name_entities_unescaped() {
        let doc = kml("<Placemark><name>Fish &amp; Chips</name><Point><coordinates>1,2</coordinates></Point></Placemark>");
        let collection = convert(&doc).unwrap();
        assert_eq!(collection.features[0].properties.name.as_deref(), Some("Fish & Chips"));
    }

    #[test]
    fn test_invalid_coordinate_rejected() {
        let doc = kml("<Placemark><Point><coordinates>abc,2</coordinates></Point></Placemark>");
        assert!(matches!(convert(&doc), Err(ConvertError::InvalidCoordinate(_))));

        let single = kml("<Placemark><Point><coordinates>1</coordinates></Point></Placemark>");
        assert!(matches!(convert(&single), Err(ConvertError::InvalidCoordinate(_))));
    }

    #[test]
    fn test_malformed_xml_rejected() {
        assert!(matches!(
            convert("<kml><Placemark></kml>"),
            Err(ConvertError::Xml(_))
        ));
        assert!(matches!(convert("<kml><Placemark>"), Err(_)));
        assert!(matches!(convert(""), Err(ConvertError::MissingRoot)));
    }
}
