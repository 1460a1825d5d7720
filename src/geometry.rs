use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A decoded geometry object.
///
/// Structured payloads arrive as internally tagged JSON, e.g.
/// `{"kind":"line","from":[0,0,0],"to":[1,0,0]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum Geometry {
    Point { location: Point3<f64> },
    Line { from: Point3<f64>, to: Point3<f64> },
    Polyline { points: Vec<Point3<f64>> },
    Mesh { vertices: Vec<Point3<f64>>, faces: Vec<Face> },
    PointCloud { points: Vec<Point3<f64>> },
}

/// Mesh face: a triangle, or a quad split along its first diagonal when drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Face {
    Tri([u32; 3]),
    Quad([u32; 4]),
}

impl Face {
    fn indices(&self) -> &[u32] {
        match self {
            Face::Tri(i) => i,
            Face::Quad(i) => i,
        }
    }
}

impl Geometry {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Geometry::Point { .. } => "point",
            Geometry::Line { .. } => "line",
            Geometry::Polyline { .. } => "polyline",
            Geometry::Mesh { .. } => "mesh",
            Geometry::PointCloud { .. } => "point_cloud",
        }
    }

    /// Structural checks serde cannot express.
    pub fn validate(&self) -> Result<(), String> {
        let finite = |p: &Point3<f64>| p.coords.iter().all(|c| c.is_finite());
        match self {
            Geometry::Point { location } if !finite(location) => Err("non-finite point".into()),
            Geometry::Line { from, to } if !finite(from) || !finite(to) => {
                Err("non-finite line end".into())
            }
            Geometry::Polyline { points } if points.len() < 2 => {
                Err(format!("polyline needs 2 points, got {}", points.len()))
            }
            Geometry::Polyline { points } | Geometry::PointCloud { points }
                if !points.iter().all(finite) =>
            {
                Err("non-finite vertex".into())
            }
            Geometry::Mesh { vertices, faces } => {
                if !vertices.iter().all(finite) {
                    return Err("non-finite vertex".into());
                }
                let n = vertices.len() as u32;
                match faces
                    .iter()
                    .flat_map(|f| f.indices().iter().copied())
                    .find(|&i| i >= n)
                {
                    Some(bad) => Err(format!("face index {bad} out of range for {n} vertices")),
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }

    fn points(&self) -> Box<dyn Iterator<Item = &Point3<f64>> + '_> {
        match self {
            Geometry::Point { location } => Box::new(std::iter::once(location)),
            Geometry::Line { from, to } => Box::new([from, to].into_iter()),
            Geometry::Polyline { points } | Geometry::PointCloud { points } => {
                Box::new(points.iter())
            }
            Geometry::Mesh { vertices, .. } => Box::new(vertices.iter()),
        }
    }

    pub fn bounds(&self) -> Bounds {
        let mut b = Bounds::empty();
        for p in self.points() {
            b.expand(p);
        }
        b
    }

    /// Append display triangles as `[a, b, c]` corner triples.
    pub fn append_triangles(&self, out: &mut Vec<[Point3<f32>; 3]>) {
        let Geometry::Mesh { vertices, faces } = self else {
            return;
        };
        let v = |i: u32| vertices[i as usize].cast::<f32>();
        for face in faces {
            match *face {
                Face::Tri([a, b, c]) => out.push([v(a), v(b), v(c)]),
                Face::Quad([a, b, c, d]) => {
                    out.push([v(a), v(b), v(c)]);
                    out.push([v(a), v(c), v(d)]);
                }
            }
        }
    }

    /// Append display line segments. Points get a small axis cross of size `marker`.
    pub fn append_segments(&self, marker: f32, out: &mut Vec<[Point3<f32>; 2]>) {
        let cross = |p: &Point3<f64>, out: &mut Vec<[Point3<f32>; 2]>| {
            let p = p.cast::<f32>();
            for axis in [Vector3::x(), Vector3::y(), Vector3::z()] {
                out.push([p - axis * marker, p + axis * marker]);
            }
        };
        match self {
            Geometry::Point { location } => cross(location, out),
            Geometry::PointCloud { points } => points.iter().for_each(|p| cross(p, out)),
            Geometry::Line { from, to } => out.push([from.cast(), to.cast()]),
            Geometry::Polyline { points } => {
                out.extend(points.windows(2).map(|w| [w[0].cast(), w[1].cast()]))
            }
            Geometry::Mesh { .. } => {}
        }
    }
}

/// Axis-aligned bounding box. Empty until something is added.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Bounds {
    pub fn empty() -> Self {
        Self {
            min: Point3::from([f64::INFINITY; 3]),
            max: Point3::from([f64::NEG_INFINITY; 3]),
        }
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    pub fn expand(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        Bounds { min: self.min.inf(&other.min), max: self.max.sup(&other.max) }
    }

    pub fn size(&self) -> Vector3<f64> {
        if self.is_empty() { Vector3::zeros() } else { self.max - self.min }
    }

    pub fn center(&self) -> Point3<f64> {
        if self.is_empty() { Point3::origin() } else { nalgebra::center(&self.min, &self.max) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_tagged_mesh_with_quads() {
        let g: Geometry = serde_json::from_value(json!({
            "kind": "mesh",
            "vertices": [[0, 0, 0], [1, 0, 0], [1, 1, 0], [0, 1, 0]],
            "faces": [[0, 1, 2, 3]]
        }))
        .unwrap();
        assert!(g.validate().is_ok());
        let mut tris = Vec::new();
        g.append_triangles(&mut tris);
        assert_eq!(tris.len(), 2);
        assert_eq!(tris[1][2], Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn rejects_out_of_range_faces() {
        let g = Geometry::Mesh {
            vertices: vec![Point3::origin(); 3],
            faces: vec![Face::Tri([0, 1, 3])],
        };
        assert!(g.validate().unwrap_err().contains("out of range"));
    }

    #[test]
    fn unknown_kind_fails_to_parse() {
        let res = serde_json::from_value::<Geometry>(json!({"kind": "brep", "faces": []}));
        assert!(res.is_err());
    }

    #[test]
    fn short_polyline_is_invalid() {
        let g = Geometry::Polyline { points: vec![Point3::origin()] };
        assert!(g.validate().is_err());
    }

    #[test]
    fn bounds_union_and_center() {
        let a = Geometry::Line { from: Point3::new(-1.0, 0.0, 0.0), to: Point3::new(1.0, 2.0, 0.0) };
        let b = Geometry::Point { location: Point3::new(0.0, 0.0, 4.0) };
        let bounds = a.bounds().union(&b.bounds());
        assert_eq!(bounds.size(), Vector3::new(2.0, 2.0, 4.0));
        assert_eq!(bounds.center(), Point3::new(0.0, 1.0, 2.0));
        assert!(Bounds::empty().is_empty());
        assert_eq!(Bounds::empty().union(&bounds), bounds);
    }

    #[test]
    fn polyline_segments_follow_points() {
        let g = Geometry::Polyline {
            points: vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0)],
        };
        let mut segs = Vec::new();
        g.append_segments(0.1, &mut segs);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[1][0], Point3::new(1.0, 0.0, 0.0));
    }
}
