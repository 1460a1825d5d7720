//! Turns a solve response into a fresh [`GeometryDocument`].
//!
//! Decoding is lenient: an item that cannot be decoded is skipped with a
//! diagnostic and never aborts the rest of the response.

use serde_json::Value;

use crate::document::GeometryDocument;
use crate::encoded_mesh;
use crate::geometry::Geometry;
use crate::protocol::{BranchItem, SolveResponse};

#[derive(Debug, Default, Clone, Copy)]
pub struct ResultDecoder;

impl ResultDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode one branch item; `None` means "no object".
    pub fn decode_item(&self, item: &BranchItem) -> Option<Geometry> {
        let parsed: Value = match serde_json::from_str(&item.data) {
            Ok(v) => v,
            Err(e) => {
                log::debug!("skipping `{}` item: data is not JSON ({e})", item.kind);
                return None;
            }
        };

        if item.is_string() {
            let Value::String(text) = parsed else {
                log::debug!("skipping string item: payload is not a JSON string");
                return None;
            };
            return match encoded_mesh::decode_base64(&text) {
                Ok(mesh) => checked(mesh),
                Err(e) => {
                    log::debug!("string item is not an encoded mesh: {e}");
                    None
                }
            };
        }

        if !parsed.is_object() {
            log::debug!("skipping `{}` item: payload is not an object", item.kind);
            return None;
        }
        let geometry = match serde_json::from_value::<Geometry>(parsed) {
            Ok(g) => g,
            Err(e) => {
                log::warn!("could not decode `{}` item: {e}", item.kind);
                return None;
            }
        };
        checked(geometry)
    }

    /// Release the document in `slot` (best effort), then decode `response`
    /// into a new one and install it. Returns the released document.
    pub fn rebuild(
        &self,
        slot: &mut Option<GeometryDocument>,
        response: &SolveResponse,
    ) -> Option<GeometryDocument> {
        let mut previous = slot.take();
        if let Some(old) = previous.as_mut() {
            match old.release() {
                Ok(n) => log::debug!("released previous document ({n} objects)"),
                Err(e) => log::debug!("ignoring release failure: {e}"),
            }
        }
        *slot = Some(self.decode_response(response));
        previous
    }

    /// Build a document holding every decodable item of `response`, in order.
    pub fn decode_response(&self, response: &SolveResponse) -> GeometryDocument {
        let mut doc = GeometryDocument::new();
        let mut skipped = 0usize;
        for item in response.items() {
            match self.decode_item(item) {
                Some(geometry) => {
                    doc.add(geometry);
                }
                None => skipped += 1,
            }
        }
        log::info!("decoded {} objects ({skipped} skipped)", doc.len());
        doc
    }
}

fn checked(geometry: Geometry) -> Option<Geometry> {
    match geometry.validate() {
        Ok(()) => Some(geometry),
        Err(reason) => {
            log::warn!("dropping invalid {}: {reason}", geometry.kind_name());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Face;
    use crate::protocol::STRING_ITEM_TAG;
    use nalgebra::Point3;
    use serde_json::json;

    fn response(body: Value) -> SolveResponse {
        serde_json::from_value(body).unwrap()
    }

    fn point_item(x: f64) -> Value {
        json!({
            "type": "Rhino.Geometry.Point",
            "data": json!({"kind": "point", "location": [x, 0.0, 0.0]}).to_string()
        })
    }

    fn mesh_string_item() -> Value {
        let mesh = Geometry::Mesh {
            vertices: vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
            faces: vec![Face::Tri([0, 1, 2])],
        };
        let text = encoded_mesh::encode_base64(&mesh).unwrap();
        json!({ "type": STRING_ITEM_TAG, "data": Value::String(text).to_string() })
    }

    #[test]
    fn invalid_base64_string_yields_empty_document() {
        let resp = response(json!({
            "values": [{ "InnerTree": { "0": [{ "type": "System.String", "data": "\"not-base64\"" }] } }]
        }));
        let doc = ResultDecoder::new().decode_response(&resp);
        assert!(doc.is_empty());
    }

    #[test]
    fn single_generic_object_is_decoded() {
        let resp = response(json!({ "values": [{ "InnerTree": { "{0}": [point_item(4.0)] } }] }));
        let doc = ResultDecoder::new().decode_response(&resp);
        assert_eq!(doc.len(), 1);
        assert_eq!(
            doc.objects()[0].geometry,
            Geometry::Point { location: Point3::new(4.0, 0.0, 0.0) }
        );
    }

    #[test]
    fn keeps_response_order_and_skips_failures() {
        let resp = response(json!({
            "values": [
                { "InnerTree": {
                    "{0}": [point_item(1.0), { "type": "Rhino.Geometry.Point", "data": "{oops" }],
                    "{1}": [mesh_string_item(), point_item(2.0)]
                } },
                { "InnerTree": { "{0}": [
                    { "type": "System.Double", "data": "3.5" },
                    { "type": "Rhino.Geometry.Brep", "data": "{\"kind\":\"brep\"}" },
                    point_item(3.0)
                ] } }
            ]
        }));
        let doc = ResultDecoder::new().decode_response(&resp);
        let kinds: Vec<_> = doc.objects().iter().map(|o| o.geometry.kind_name()).collect();
        assert_eq!(kinds, ["point", "mesh", "point", "point"]);
        let xs: Vec<_> = doc
            .objects()
            .iter()
            .filter_map(|o| match &o.geometry {
                Geometry::Point { location } => Some(location.x),
                _ => None,
            })
            .collect();
        assert_eq!(xs, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn encoded_mesh_with_nan_bounds_is_no_object() {
        let item: BranchItem = serde_json::from_value(mesh_string_item()).unwrap();
        let text: String = serde_json::from_str(&item.data).unwrap();
        let mut bytes = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, text).unwrap();
        bytes[16..20].copy_from_slice(&f32::NAN.to_le_bytes());
        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes);
        let item = BranchItem::new(STRING_ITEM_TAG, Value::String(encoded).to_string());
        assert!(ResultDecoder::new().decode_item(&item).is_none());
    }

    #[test]
    fn non_json_data_is_no_object() {
        let item = BranchItem::new("Rhino.Geometry.Mesh", "definitely not json");
        assert!(ResultDecoder::new().decode_item(&item).is_none());
    }

    #[test]
    fn string_tag_with_non_string_payload_is_no_object() {
        let item = BranchItem::new(STRING_ITEM_TAG, "{\"kind\":\"point\",\"location\":[0,0,0]}");
        assert!(ResultDecoder::new().decode_item(&item).is_none());
    }

    #[test]
    fn decoding_is_repeatable() {
        let item: BranchItem = serde_json::from_value(mesh_string_item()).unwrap();
        let decoder = ResultDecoder::new();
        let first = decoder.decode_item(&item).unwrap();
        let second = decoder.decode_item(&item).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn second_rebuild_replaces_and_releases_first_document() {
        let decoder = ResultDecoder::new();
        let mut slot = None;
        let released = decoder.rebuild(
            &mut slot,
            &response(json!({ "values": [{ "InnerTree": { "0": [point_item(1.0), point_item(2.0)] } }] })),
        );
        assert!(released.is_none());
        assert_eq!(slot.as_ref().map(GeometryDocument::len), Some(2));

        let released = decoder
            .rebuild(
                &mut slot,
                &response(json!({ "values": [{ "InnerTree": { "0": [point_item(9.0)] } }] })),
            )
            .unwrap();
        assert!(released.is_released());
        assert!(released.is_empty());

        let current = slot.unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(
            current.objects()[0].geometry,
            Geometry::Point { location: Point3::new(9.0, 0.0, 0.0) }
        );
    }

    #[test]
    fn already_released_previous_is_not_fatal() {
        let mut old = GeometryDocument::new();
        old.release().unwrap();
        let mut slot = Some(old);
        ResultDecoder::new().rebuild(&mut slot, &SolveResponse::default());
        assert!(slot.unwrap().is_empty());
    }
}
