//! Built-in shapes
//!
//! Generated shapes use the interleaved `position, normal, uv` layout and are
//! indexed, centered on the origin. Segment counts below the minimum a shape
//! needs are raised to that minimum.

#![allow(clippy::cast_precision_loss)]

use std::collections::HashSet;
use std::f32::consts::{PI, TAU};

use crate::foundation::math::Vec3;

use super::geometry::{Geometry, Primitive, VertexAttribute};

/// Floats per generated vertex
const STRIDE: usize = 8;

fn layout() -> Vec<VertexAttribute> {
    vec![VertexAttribute::position(), VertexAttribute::normal(), VertexAttribute::uv()]
}

fn push_vertex(vertices: &mut Vec<f32>, position: Vec3, normal: Vec3, u: f32, v: f32) {
    vertices.extend_from_slice(&[position.x, position.y, position.z, normal.x, normal.y, normal.z, u, v]);
}

fn vertex_index(vertices: &[f32]) -> u32 {
    u32::try_from(vertices.len() / STRIDE).unwrap_or(u32::MAX)
}

/// Two triangles per cell of a `columns x rows` grid whose vertices start
/// at `first` and run row by row
fn push_grid_indices(indices: &mut Vec<u32>, first: u32, columns: u32, rows: u32) {
    let row = columns + 1;
    for iy in 0..rows {
        for ix in 0..columns {
            let a = first + ix + row * iy;
            let b = first + ix + row * (iy + 1);
            let c = first + ix + 1 + row * (iy + 1);
            let d = first + ix + 1 + row * iy;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
}

/// One face of a box. `u`, `v` and `w` are axis indices; the face lies at
/// `w = depth / 2` and faces along the sign of `depth`.
struct Face {
    u: usize,
    v: usize,
    w: usize,
    u_dir: f32,
    v_dir: f32,
    width: f32,
    height: f32,
    depth: f32,
    columns: u32,
    rows: u32,
}

impl Face {
    fn build(&self, vertices: &mut Vec<f32>, indices: &mut Vec<u32>) {
        let first = vertex_index(vertices);
        let segment_w = self.width / self.columns as f32;
        let segment_h = self.height / self.rows as f32;

        let mut normal = Vec3::zeros();
        normal[self.w] = if self.depth > 0.0 { 1.0 } else { -1.0 };

        for iy in 0..=self.rows {
            let y = iy as f32 * segment_h - self.height / 2.0;
            for ix in 0..=self.columns {
                let x = ix as f32 * segment_w - self.width / 2.0;
                let mut position = Vec3::zeros();
                position[self.u] = x * self.u_dir;
                position[self.v] = y * self.v_dir;
                position[self.w] = self.depth / 2.0;
                let u = ix as f32 / self.columns as f32;
                let v = 1.0 - iy as f32 / self.rows as f32;
                push_vertex(vertices, position, normal, u, v);
            }
        }
        push_grid_indices(indices, first, self.columns, self.rows);
    }
}

impl Geometry {
    /// Flat rectangle in the XY plane facing +Z
    pub fn plane(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Self {
        let columns = width_segments.max(1);
        let rows = height_segments.max(1);
        let mut vertices = Vec::with_capacity(((columns + 1) * (rows + 1)) as usize * STRIDE);
        let mut indices = Vec::with_capacity((columns * rows) as usize * 6);

        for iy in 0..=rows {
            let y = iy as f32 * height / rows as f32 - height / 2.0;
            for ix in 0..=columns {
                let x = ix as f32 * width / columns as f32 - width / 2.0;
                let u = ix as f32 / columns as f32;
                let v = 1.0 - iy as f32 / rows as f32;
                push_vertex(&mut vertices, Vec3::new(x, -y, 0.0), Vec3::z(), u, v);
            }
        }
        push_grid_indices(&mut indices, 0, columns, rows);
        Self::with_indices(vertices, indices, layout())
    }

    /// Box with one segment per side
    pub fn cube(width: f32, height: f32, depth: f32) -> Self {
        Self::segmented_box(width, height, depth, [1, 1, 1])
    }

    /// Box with `[width, height, depth]` segments; each face has its own
    /// vertices so normals stay flat
    pub fn segmented_box(width: f32, height: f32, depth: f32, segments: [u32; 3]) -> Self {
        let [sx, sy, sz] = segments.map(|s| s.max(1));
        let faces = [
            Face { u: 2, v: 1, w: 0, u_dir: -1.0, v_dir: -1.0, width: depth, height, depth: width, columns: sz, rows: sy },
            Face { u: 2, v: 1, w: 0, u_dir: 1.0, v_dir: -1.0, width: depth, height, depth: -width, columns: sz, rows: sy },
            Face { u: 0, v: 2, w: 1, u_dir: 1.0, v_dir: 1.0, width, height: depth, depth: height, columns: sx, rows: sz },
            Face { u: 0, v: 2, w: 1, u_dir: 1.0, v_dir: -1.0, width, height: depth, depth: -height, columns: sx, rows: sz },
            Face { u: 0, v: 1, w: 2, u_dir: 1.0, v_dir: -1.0, width, height, depth, columns: sx, rows: sy },
            Face { u: 0, v: 1, w: 2, u_dir: -1.0, v_dir: -1.0, width, height, depth: -depth, columns: sx, rows: sy },
        ];

        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        for face in &faces {
            face.build(&mut vertices, &mut indices);
        }
        Self::with_indices(vertices, indices, layout())
    }

    /// UV sphere; at least 3 segments around and 2 from pole to pole
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let columns = width_segments.max(3);
        let rows = height_segments.max(2);
        let mut vertices = Vec::with_capacity(((columns + 1) * (rows + 1)) as usize * STRIDE);
        let mut indices = Vec::with_capacity((columns * rows) as usize * 6);

        for iy in 0..=rows {
            let v = iy as f32 / rows as f32;
            let theta = v * PI;
            for ix in 0..=columns {
                let u = ix as f32 / columns as f32;
                let phi = u * TAU;
                let direction = Vec3::new(-phi.cos() * theta.sin(), theta.cos(), phi.sin() * theta.sin());
                push_vertex(&mut vertices, direction * radius, direction, u, 1.0 - v);
            }
        }
        push_grid_indices(&mut indices, 0, columns, rows);
        Self::with_indices(vertices, indices, layout())
    }

    /// Cylinder or truncated cone along Y. A radius of zero leaves that
    /// end without a cap.
    pub fn cylinder(
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
        radial_segments: u32,
        height_segments: u32,
        open_ended: bool,
    ) -> Self {
        let columns = radial_segments.max(3);
        let rows = height_segments.max(1);
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        let slope = (radius_bottom - radius_top) / height;
        for iy in 0..=rows {
            let v = iy as f32 / rows as f32;
            let radius = radius_top + (radius_bottom - radius_top) * v;
            for ix in 0..=columns {
                let u = ix as f32 / columns as f32;
                let (sin, cos) = (u * TAU).sin_cos();
                let position = Vec3::new(radius * sin, height / 2.0 - v * height, radius * cos);
                let normal = Vec3::new(sin, slope, cos).normalize();
                push_vertex(&mut vertices, position, normal, u, 1.0 - v);
            }
        }
        push_grid_indices(&mut indices, 0, columns, rows);

        if !open_ended {
            for (top, radius) in [(true, radius_top), (false, radius_bottom)] {
                if radius > 0.0 {
                    push_cap(&mut vertices, &mut indices, top, radius, height, columns);
                }
            }
        }
        Self::with_indices(vertices, indices, layout())
    }

    /// Line geometry with every unique triangle edge, sharing this
    /// geometry's vertices. `None` unless the source is indexed triangles.
    pub fn wireframe(&self) -> Option<Self> {
        if self.primitive != Primitive::Triangles || self.indices().is_empty() {
            log::error!("Wireframe geometry needs indexed triangles");
            return None;
        }

        let mut seen = HashSet::new();
        let mut lines = Vec::new();
        for triangle in self.indices().chunks_exact(3) {
            for (a, b) in [(triangle[0], triangle[1]), (triangle[1], triangle[2]), (triangle[2], triangle[0])] {
                if seen.insert((a.min(b), a.max(b))) {
                    lines.extend_from_slice(&[a, b]);
                }
            }
        }
        Some(
            Self::with_indices(self.vertices().to_vec(), lines, self.attributes().to_vec())
                .with_primitive(Primitive::Lines),
        )
    }
}

fn push_cap(vertices: &mut Vec<f32>, indices: &mut Vec<u32>, top: bool, radius: f32, height: f32, columns: u32) {
    let sign = if top { 1.0 } else { -1.0 };
    let y = height / 2.0 * sign;
    let normal = Vec3::new(0.0, sign, 0.0);

    let centers = vertex_index(vertices);
    for _ in 0..columns {
        push_vertex(vertices, Vec3::new(0.0, y, 0.0), normal, 0.5, 0.5);
    }
    let ring = vertex_index(vertices);
    for ix in 0..=columns {
        let (sin, cos) = (ix as f32 / columns as f32 * TAU).sin_cos();
        push_vertex(vertices, Vec3::new(radius * sin, y, radius * cos), normal, cos * 0.5 + 0.5, sin * 0.5 * sign + 0.5);
    }
    for ix in 0..columns {
        let (center, edge) = (centers + ix, ring + ix);
        if top {
            indices.extend_from_slice(&[edge, edge + 1, center]);
        } else {
            indices.extend_from_slice(&[edge + 1, edge, center]);
        }
    }
}
