/// Geometry primitives for scene rendering
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use nalgebra::{Point3, Vector3};

use crate::error::OptionParseError;

/// A world-space position in meters
pub type Vertex = Point3<f64>;

/// A triangle face in its stored winding order (counter-clockwise seen from outside)
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Unit face normal from the winding order, `None` for a zero-area triangle
    pub fn normal(&self) -> Option<Vector3<f64>> {
        let [v0, v1, v2] = self.vertices;
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        edge1.cross(&edge2).try_normalize(f64::EPSILON)
    }
}

/// Build the 12 outward-wound triangles of an axis-aligned box
pub fn cuboid(min: Vertex, max: Vertex) -> Vec<Triangle> {
    let (x0, y0, z0) = (min.x, min.y, min.z);
    let (x1, y1, z1) = (max.x, max.y, max.z);
    let p = Point3::<f64>::new;

    // Each face lists its corners counter-clockwise as seen from outside.
    let faces = [
        [p(x0, y0, z1), p(x1, y0, z1), p(x1, y1, z1), p(x0, y1, z1)], // +Z
        [p(x0, y0, z0), p(x0, y1, z0), p(x1, y1, z0), p(x1, y0, z0)], // -Z
        [p(x0, y0, z0), p(x1, y0, z0), p(x1, y0, z1), p(x0, y0, z1)], // -Y
        [p(x0, y1, z0), p(x0, y1, z1), p(x1, y1, z1), p(x1, y1, z0)], // +Y
        [p(x1, y0, z0), p(x1, y1, z0), p(x1, y1, z1), p(x1, y0, z1)], // +X
        [p(x0, y0, z0), p(x0, y0, z1), p(x0, y1, z1), p(x0, y1, z0)], // -X
    ];

    faces
        .iter()
        .flat_map(|[a, b, c, d]| [Triangle::new(*a, *b, *c), Triangle::new(*a, *c, *d)])
        .collect()
}

/// Axis-aligned bounding box in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vertex,
    pub max: Vertex,
}

impl Aabb {
    /// Bounds of a point set, `None` when the set is empty
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vertex>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = *points.next()?;

        Some(points.fold(Self { min: first, max: first }, |bounds, p| Self {
            min: bounds.min.inf(p),
            max: bounds.max.sup(p),
        }))
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    pub fn center(&self) -> Vertex {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn half_extents(&self) -> Vector3<f64> {
        (self.max - self.min) * 0.5
    }

    pub fn corners(&self) -> [Vertex; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3::new(a.x, a.y, a.z),
            Point3::new(b.x, a.y, a.z),
            Point3::new(a.x, b.y, a.z),
            Point3::new(b.x, b.y, a.z),
            Point3::new(a.x, a.y, b.z),
            Point3::new(b.x, a.y, b.z),
            Point3::new(a.x, b.y, b.z),
            Point3::new(b.x, b.y, b.z),
        ]
    }

    /// Closed-interval overlap test on the XY footprint
    pub fn intersects_xy(&self, rect: &Rect2) -> bool {
        self.min.x <= rect.max_x
            && self.max.x >= rect.min_x
            && self.min.y <= rect.max_y
            && self.max.y >= rect.min_y
    }
}

/// An XY rectangle in world meters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect2 {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl FromStr for Rect2 {
    type Err = OptionParseError;

    /// Parses `minX,minY,maxX,maxY`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OptionParseError::BoundingBox(s.to_string());

        let values = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;

        let [min_x, min_y, max_x, max_y] = values[..] else {
            return Err(invalid());
        };

        if values.iter().any(|v| !v.is_finite()) || min_x > max_x || min_y > max_y {
            return Err(invalid());
        }

        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }
}

/// Engineering trade an element belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Discipline {
    Arc,
    Str,
    Fp,
    Sp,
    Elec,
    Acmv,
    Reb,
    Cw,
    Lpg,
    /// A tag outside the fixed set, stored upper-cased
    Other(String),
}

impl Discipline {
    pub fn as_str(&self) -> &str {
        match self {
            Discipline::Arc => "ARC",
            Discipline::Str => "STR",
            Discipline::Fp => "FP",
            Discipline::Sp => "SP",
            Discipline::Elec => "ELEC",
            Discipline::Acmv => "ACMV",
            Discipline::Reb => "REB",
            Discipline::Cw => "CW",
            Discipline::Lpg => "LPG",
            Discipline::Other(tag) => tag,
        }
    }
}

impl FromStr for Discipline {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_uppercase();
        Ok(match tag.as_str() {
            "ARC" => Discipline::Arc,
            "STR" => Discipline::Str,
            "FP" => Discipline::Fp,
            "SP" => Discipline::Sp,
            "ELEC" => Discipline::Elec,
            "ACMV" => Discipline::Acmv,
            "REB" => Discipline::Reb,
            "CW" => Discipline::Cw,
            "LPG" => Discipline::Lpg,
            _ => Discipline::Other(tag),
        })
    }
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded, renderable object
#[derive(Debug, Clone)]
pub struct Element {
    pub id: String,
    pub discipline: Discipline,
    pub class: String,
    triangles: Vec<Triangle>,
    bounds: Aabb,
}

impl Element {
    /// Returns `None` when there are no triangles to bound.
    pub fn new(
        id: impl Into<String>,
        discipline: Discipline,
        class: impl Into<String>,
        triangles: Vec<Triangle>,
    ) -> Option<Self> {
        let bounds = Aabb::from_points(triangles.iter().flat_map(|t| t.vertices.iter()))?;

        Some(Self {
            id: id.into(),
            discipline,
            class: class.into(),
            triangles,
            bounds,
        })
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuboid_winding_faces_outward() {
        let min = Point3::new(-0.5, -0.5, -0.5);
        let max = Point3::new(0.5, 0.5, 0.5);
        let triangles = cuboid(min, max);
        assert_eq!(triangles.len(), 12);

        for triangle in &triangles {
            let centroid = triangle.vertices.iter().fold(Vector3::zeros(), |acc, v| acc + v.coords) / 3.0;
            let normal = triangle.normal().unwrap();
            assert!(normal.dot(&centroid) > 0.0, "inward face: {:?}", triangle);
        }
    }

    #[test]
    fn test_degenerate_triangle_has_no_normal() {
        let p = Point3::new(1.0, 2.0, 3.0);
        let triangle = Triangle::new(p, p, Point3::new(2.0, 2.0, 3.0));
        assert!(triangle.normal().is_none());
    }

    #[test]
    fn test_aabb_from_points() {
        let points = [Point3::new(1.0, -2.0, 0.0), Point3::new(-1.0, 4.0, 2.0)];
        let bounds = Aabb::from_points(points.iter()).unwrap();
        assert_eq!(bounds.min, Point3::new(-1.0, -2.0, 0.0));
        assert_eq!(bounds.max, Point3::new(1.0, 4.0, 2.0));
        assert_eq!(bounds.center(), Point3::new(0.0, 1.0, 1.0));
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_intersects_xy_is_inclusive() {
        let bounds = Aabb {
            min: Point3::new(0.0, 0.0, 0.0),
            max: Point3::new(1.0, 1.0, 1.0),
        };
        let touching: Rect2 = "1,1,2,2".parse().unwrap();
        let apart: Rect2 = "1.5,0,2,1".parse().unwrap();
        assert!(bounds.intersects_xy(&touching));
        assert!(!bounds.intersects_xy(&apart));
    }

    #[test]
    fn test_rect_parsing() {
        let rect: Rect2 = " -1.5, 0 ,3,4.25".parse().unwrap();
        assert_eq!(rect.min_x, -1.5);
        assert_eq!(rect.max_y, 4.25);

        for bad in ["", "1,2,3", "1,2,3,4,5", "a,b,c,d", "3,0,1,1", "0,0,inf,1"] {
            assert!(bad.parse::<Rect2>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_discipline_parsing() {
        assert_eq!("arc".parse::<Discipline>().unwrap(), Discipline::Arc);
        assert_eq!(" Acmv ".parse::<Discipline>().unwrap(), Discipline::Acmv);
        assert_eq!(
            "plb".parse::<Discipline>().unwrap(),
            Discipline::Other("PLB".to_string())
        );
        assert_eq!(Discipline::Other("PLB".into()).to_string(), "PLB");
    }

    #[test]
    fn test_element_requires_triangles() {
        assert!(Element::new("e1", Discipline::Arc, "wall", Vec::new()).is_none());

        let element = Element::new(
            "e2",
            Discipline::Str,
            "column",
            cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 2.0, 3.0)),
        )
        .unwrap();
        assert_eq!(element.bounds().max, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(element.triangles().len(), 12);
    }
}
