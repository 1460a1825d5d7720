use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DocumentError;
use crate::geometry::{Bounds, Geometry};

/// Leading bytes of every archive written by [`GeometryDocument::to_bytes`].
pub const ARCHIVE_HEADER: &[u8; 24] = b"3D Geometry File Format ";
pub const ARCHIVE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryObject {
    pub id: Uuid,
    pub geometry: Geometry,
}

/// Owned collection of decoded objects; rebuilt from scratch per solve.
#[derive(Debug, Default)]
pub struct GeometryDocument {
    objects: Vec<GeometryObject>,
    released: bool,
}

#[derive(Serialize, Deserialize)]
struct ArchiveBody {
    objects: Vec<GeometryObject>,
}

impl GeometryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `geometry` under a fresh object id.
    pub fn add(&mut self, geometry: Geometry) -> Uuid {
        let id = Uuid::new_v4();
        self.objects.push(GeometryObject { id, geometry });
        id
    }

    pub fn objects(&self) -> &[GeometryObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn find(&self, id: Uuid) -> Option<&GeometryObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn bounds(&self) -> Bounds {
        self.objects
            .iter()
            .fold(Bounds::empty(), |acc, o| acc.union(&o.geometry.bounds()))
    }

    /// Drops every object. Releasing twice is an error the caller may ignore.
    pub fn release(&mut self) -> Result<usize, DocumentError> {
        if self.released {
            return Err(DocumentError::AlreadyReleased);
        }
        self.released = true;
        let dropped = self.objects.len();
        self.objects = Vec::new();
        Ok(dropped)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        let body = serde_json::to_vec(&ArchiveBody { objects: self.objects.clone() })
            .map_err(|e| DocumentError::Body(e.to_string()))?;
        let mut out = Vec::with_capacity(ARCHIVE_HEADER.len() + 4 + body.len());
        out.extend_from_slice(ARCHIVE_HEADER);
        out.extend_from_slice(&ARCHIVE_VERSION.to_le_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocumentError> {
        let rest = bytes
            .strip_prefix(ARCHIVE_HEADER.as_slice())
            .ok_or(DocumentError::NotAnArchive)?;
        if rest.len() < 4 {
            return Err(DocumentError::NotAnArchive);
        }
        let (version, body) = rest.split_at(4);
        let version = u32::from_le_bytes([version[0], version[1], version[2], version[3]]);
        if version > ARCHIVE_VERSION {
            return Err(DocumentError::FutureVersion { found: version, supported: ARCHIVE_VERSION });
        }
        let body: ArchiveBody =
            serde_json::from_slice(body).map_err(|e| DocumentError::Body(e.to_string()))?;
        for object in &body.objects {
            object
                .geometry
                .validate()
                .map_err(|reason| DocumentError::InvalidObject { id: object.id, reason })?;
        }
        Ok(Self { objects: body.objects, released: false })
    }
}

/// `LEAF.gh` -> `LEAF.3dm`
pub fn archive_file_name(definition: &str) -> String {
    let stem = definition.strip_suffix(".gh").unwrap_or(definition);
    format!("{stem}.3dm")
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn sample() -> GeometryDocument {
        let mut doc = GeometryDocument::new();
        doc.add(Geometry::Point { location: Point3::new(1.0, 2.0, 3.0) });
        doc.add(Geometry::Line { from: Point3::origin(), to: Point3::new(0.0, 0.0, 5.0) });
        doc
    }

    #[test]
    fn archive_round_trip_keeps_ids_and_order() {
        let doc = sample();
        let bytes = doc.to_bytes().unwrap();
        assert!(bytes.starts_with(ARCHIVE_HEADER));
        let back = GeometryDocument::from_bytes(&bytes).unwrap();
        assert_eq!(back.objects(), doc.objects());
    }

    #[test]
    fn rejects_foreign_and_future_archives() {
        assert!(matches!(
            GeometryDocument::from_bytes(b"solid cube"),
            Err(DocumentError::NotAnArchive)
        ));
        let mut bytes = sample().to_bytes().unwrap();
        bytes[24..28].copy_from_slice(&7u32.to_le_bytes());
        assert!(matches!(
            GeometryDocument::from_bytes(&bytes),
            Err(DocumentError::FutureVersion { found: 7, .. })
        ));
    }

    #[test]
    fn rejects_archives_with_dangling_faces() {
        let mut doc = GeometryDocument::new();
        let id = doc.add(Geometry::Mesh {
            vertices: vec![Point3::origin(); 3],
            faces: vec![crate::geometry::Face::Tri([0, 1, 7])],
        });
        let bytes = doc.to_bytes().unwrap();
        assert!(matches!(
            GeometryDocument::from_bytes(&bytes),
            Err(DocumentError::InvalidObject { id: bad, .. }) if bad == id
        ));
    }

    #[test]
    fn release_is_reported_once() {
        let mut doc = sample();
        assert_eq!(doc.release().unwrap(), 2);
        assert!(doc.is_empty());
        assert!(matches!(doc.release(), Err(DocumentError::AlreadyReleased)));
    }

    #[test]
    fn never_populated_document_releases_cleanly() {
        assert_eq!(GeometryDocument::new().release().unwrap(), 0);
    }

    #[test]
    fn bounds_cover_all_objects() {
        let b = sample().bounds();
        assert_eq!(b.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(b.max, Point3::new(1.0, 2.0, 5.0));
    }

    #[test]
    fn file_name_drops_definition_extension() {
        assert_eq!(archive_file_name("LEAF.gh"), "LEAF.3dm");
        assert_eq!(archive_file_name("plain"), "plain.3dm");
    }
}
