//! Tagged ground triangles and the top-down raycast foliage lands on.

use ember_core::{BoundingBox, Ray, Vec3};

/// What a triangle belongs to. Foliage only grows on [`GroundTag::Ground`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GroundTag {
    /// Terrain surface
    #[default]
    Ground,
    /// Anything else: rocks, roads, buildings
    Other,
}

/// A triangle with a tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// Vertices, counter-clockwise seen from the front face
    pub vertices: [Vec3; 3],
    /// What the triangle belongs to
    pub tag: GroundTag,
}

impl Triangle {
    /// Creates a triangle.
    #[must_use]
    pub const fn new(a: Vec3, b: Vec3, c: Vec3, tag: GroundTag) -> Self {
        Self {
            vertices: [a, b, c],
            tag,
        }
    }

    /// Unit front-face normal.
    #[must_use]
    pub fn normal(&self) -> Vec3 {
        let [a, b, c] = self.vertices;
        (b - a).cross(c - a).normalize_or_zero()
    }

    /// Ray parameter of the intersection with `ray`, if any (both faces).
    #[must_use]
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        const EPSILON: f32 = 1e-8;

        let [a, b, c] = self.vertices;
        let edge1 = b - a;
        let edge2 = c - a;

        let p = ray.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;

        let s = ray.origin - a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = ray.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(q) * inv_det;
        (t > EPSILON).then_some(t)
    }
}

/// Nearest intersection found by [`GroundMesh::find_top_ground_position`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundHit {
    /// World position of the hit
    pub position: Vec3,
    /// Unit normal of the triangle hit
    pub normal: Vec3,
    /// Tag of the triangle hit
    pub tag: GroundTag,
    /// Ray parameter of the hit
    pub distance: f32,
}

/// Triangle soup a terrain node's foliage is projected onto.
#[derive(Debug, Clone, Default)]
pub struct GroundMesh {
    triangles: Vec<Triangle>,
    bounds: Option<BoundingBox>,
}

impl GroundMesh {
    /// Creates an empty mesh.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Regular grid over the XZ extent of `area`, `resolution` quads per
    /// side, heights from `height(x, z)`. All triangles are tagged ground
    /// and face up.
    #[must_use]
    pub fn heightfield(area: &BoundingBox, resolution: usize, height: impl Fn(f32, f32) -> f32) -> Self {
        let resolution = resolution.max(1);
        let step_x = (area.max.x - area.min.x) / resolution as f32;
        let step_z = (area.max.z - area.min.z) / resolution as f32;
        let vertex = |i: usize, j: usize| {
            let x = area.min.x + i as f32 * step_x;
            let z = area.min.z + j as f32 * step_z;
            Vec3::new(x, height(x, z), z)
        };

        let mut mesh = Self::new();
        for j in 0..resolution {
            for i in 0..resolution {
                let v00 = vertex(i, j);
                let v10 = vertex(i + 1, j);
                let v01 = vertex(i, j + 1);
                let v11 = vertex(i + 1, j + 1);
                mesh.push(Triangle::new(v00, v01, v10, GroundTag::Ground));
                mesh.push(Triangle::new(v10, v01, v11, GroundTag::Ground));
            }
        }
        mesh
    }

    /// Flat ground at height `y`.
    #[must_use]
    pub fn flat(area: &BoundingBox, resolution: usize, y: f32) -> Self {
        Self::heightfield(area, resolution, |_, _| y)
    }

    /// Ground rising by `slope` per unit of X from `base` at `area.min.x`.
    #[must_use]
    pub fn ramp(area: &BoundingBox, resolution: usize, base: f32, slope: f32) -> Self {
        let start = area.min.x;
        Self::heightfield(area, resolution, move |x, _| base + slope * (x - start))
    }

    /// Adds a triangle.
    pub fn push(&mut self, triangle: Triangle) {
        let bounds = self
            .bounds
            .get_or_insert(BoundingBox::new(triangle.vertices[0], triangle.vertices[0]));
        for vertex in triangle.vertices {
            bounds.include(vertex);
        }
        self.triangles.push(triangle);
    }

    /// All triangles.
    #[must_use]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Bounds of all triangles, `None` for an empty mesh.
    #[must_use]
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }

    /// Nearest triangle along `ray`, whatever its tag or slope.
    #[must_use]
    pub fn find_top_ground_position(&self, ray: &Ray) -> Option<GroundHit> {
        self.triangles
            .iter()
            .filter_map(|triangle| triangle.intersect(ray).map(|t| (t, triangle)))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(t, triangle)| GroundHit {
                position: ray.at(t),
                normal: triangle.normal(),
                tag: triangle.tag,
                distance: t,
            })
    }
}
