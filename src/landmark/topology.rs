//! Connection topology per landmark category
//!
//! Edges are index pairs into the landmark set reported for that category.
//! Pose uses the 33-point body model, hands the 21-point hand model. The face
//! mesh has two parts: the fixed feature contours (oval, lips, eyes, eyebrows)
//! of the 468-point mesh, and a tesselation built per frame by [`triangulate`]
//! over whichever mesh points are drawable.

use std::collections::{BTreeSet, HashSet};

use super::types::LandmarkCategory;

pub type Connection = (usize, usize);

pub const POSE_LANDMARK_COUNT: usize = 33;
pub const HAND_LANDMARK_COUNT: usize = 21;
pub const FACE_MESH_LANDMARK_COUNT: usize = 468;

pub const POSE_CONNECTIONS: &[Connection] = &[
    (0, 1), (1, 2), (2, 3), (3, 7), (0, 4), (4, 5), (5, 6), (6, 8), (9, 10),
    (11, 12), (11, 13), (13, 15), (15, 17), (15, 19), (15, 21), (17, 19),
    (12, 14), (14, 16), (16, 18), (16, 20), (16, 22), (18, 20),
    (11, 23), (12, 24), (23, 24), (23, 25), (24, 26), (25, 27), (26, 28),
    (27, 29), (28, 30), (29, 31), (30, 32), (27, 31), (28, 32),
];

pub const HAND_CONNECTIONS: &[Connection] = &[
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 9), (9, 13), (13, 17), (0, 17),
    (5, 6), (6, 7), (7, 8),
    (9, 10), (10, 11), (11, 12),
    (13, 14), (14, 15), (15, 16),
    (17, 18), (18, 19), (19, 20),
];

const FACE_OVAL: &[Connection] = &[
    (10, 338), (338, 297), (297, 332), (332, 284), (284, 251), (251, 389),
    (389, 356), (356, 454), (454, 323), (323, 361), (361, 288), (288, 397),
    (397, 365), (365, 379), (379, 378), (378, 400), (400, 377), (377, 152),
    (152, 148), (148, 176), (176, 149), (149, 150), (150, 136), (136, 172),
    (172, 58), (58, 132), (132, 93), (93, 234), (234, 127), (127, 162),
    (162, 21), (21, 54), (54, 103), (103, 67), (67, 109), (109, 10),
];

const FACE_LIPS: &[Connection] = &[
    (61, 146), (146, 91), (91, 181), (181, 84), (84, 17), (17, 314),
    (314, 405), (405, 321), (321, 375), (375, 291), (61, 185), (185, 40),
    (40, 39), (39, 37), (37, 0), (0, 267), (267, 269), (269, 270),
    (270, 409), (409, 291), (78, 95), (95, 88), (88, 178), (178, 87),
    (87, 14), (14, 317), (317, 402), (402, 318), (318, 324), (324, 308),
    (78, 191), (191, 80), (80, 81), (81, 82), (82, 13), (13, 312),
    (312, 311), (311, 310), (310, 415), (415, 308),
];

const FACE_LEFT_EYE: &[Connection] = &[
    (263, 249), (249, 390), (390, 373), (373, 374), (374, 380), (380, 381),
    (381, 382), (382, 362), (263, 466), (466, 388), (388, 387), (387, 386),
    (386, 385), (385, 384), (384, 398), (398, 362),
];

const FACE_LEFT_EYEBROW: &[Connection] = &[
    (276, 283), (283, 282), (282, 295), (295, 285), (300, 293), (293, 334),
    (334, 296), (296, 336),
];

const FACE_RIGHT_EYE: &[Connection] = &[
    (33, 7), (7, 163), (163, 144), (144, 145), (145, 153), (153, 154),
    (154, 155), (155, 133), (33, 246), (246, 161), (161, 160), (160, 159),
    (159, 158), (158, 157), (157, 173), (173, 133),
];

const FACE_RIGHT_EYEBROW: &[Connection] = &[
    (46, 53), (53, 52), (52, 65), (65, 55), (70, 63), (63, 105), (105, 66),
    (66, 107),
];

/// Face mesh contour groups
pub const FACE_MESH_CONTOURS: &[&[Connection]] = &[
    FACE_OVAL,
    FACE_LIPS,
    FACE_LEFT_EYE,
    FACE_LEFT_EYEBROW,
    FACE_RIGHT_EYE,
    FACE_RIGHT_EYEBROW,
];

/// Iterate the edges drawn for a category
pub fn connections(category: LandmarkCategory) -> Box<dyn Iterator<Item = Connection>> {
    match category {
        LandmarkCategory::Pose => Box::new(POSE_CONNECTIONS.iter().copied()),
        LandmarkCategory::LeftHand | LandmarkCategory::RightHand => {
            Box::new(HAND_CONNECTIONS.iter().copied())
        }
        LandmarkCategory::FaceMesh => {
            Box::new(FACE_MESH_CONTOURS.iter().flat_map(|group| group.iter().copied()))
        }
    }
}

/// Delaunay triangulation (Bowyer-Watson) of the given pixel points.
///
/// `points` is indexed like the landmark set; `None` entries and repeated
/// coordinates are left out. Returns the unique edges of the triangulation as
/// index pairs `(a, b)` with `a < b`, in ascending order. Fewer than three
/// distinct points, or points that are all collinear, yield no edges.
pub fn triangulate(points: &[Option<(i32, i32)>]) -> Vec<Connection> {
    let mut seen = HashSet::new();
    let mut vertices: Vec<(usize, f64, f64)> = Vec::new();
    for (index, point) in points.iter().enumerate() {
        if let Some((x, y)) = point {
            if seen.insert((*x, *y)) {
                vertices.push((index, *x as f64, *y as f64));
            }
        }
    }
    if vertices.len() < 3 {
        return Vec::new();
    }

    let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
    let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
    for (_, x, y) in &vertices {
        min_x = min_x.min(*x);
        min_y = min_y.min(*y);
        max_x = max_x.max(*x);
        max_y = max_y.max(*y);
    }
    let span = (max_x - min_x).max(max_y - min_y).max(1.0);
    let (mid_x, mid_y) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);

    let mut coords: Vec<(f64, f64)> = vertices.iter().map(|(_, x, y)| (*x, *y)).collect();
    let outer = coords.len();
    coords.push((mid_x - 20.0 * span, mid_y - span));
    coords.push((mid_x, mid_y + 20.0 * span));
    coords.push((mid_x + 20.0 * span, mid_y - span));

    let mut triangles = vec![Triangle::new([outer, outer + 1, outer + 2], &coords)];
    for p in 0..outer {
        let (px, py) = coords[p];
        let (bad, kept): (Vec<Triangle>, Vec<Triangle>) =
            triangles.into_iter().partition(|t| t.circumscribes(px, py));
        triangles = kept;

        // edges of the cavity that no other removed triangle shares
        let mut boundary: Vec<(usize, usize)> = Vec::new();
        for t in &bad {
            for edge in t.edges() {
                let shared = bad
                    .iter()
                    .filter(|other| other.edges().iter().any(|e| same_edge(*e, edge)))
                    .count()
                    > 1;
                if !shared {
                    boundary.push(edge);
                }
            }
        }
        for (a, b) in boundary {
            triangles.push(Triangle::new([a, b, p], &coords));
        }
    }

    let mut edges = BTreeSet::new();
    for t in triangles.iter().filter(|t| t.r2.is_finite() && t.v.iter().all(|v| *v < outer)) {
        for (a, b) in t.edges() {
            let (ia, ib) = (vertices[a].0, vertices[b].0);
            edges.insert((ia.min(ib), ia.max(ib)));
        }
    }
    edges.into_iter().collect()
}

struct Triangle {
    v: [usize; 3],
    cx: f64,
    cy: f64,
    r2: f64,
}

impl Triangle {
    fn new(v: [usize; 3], coords: &[(f64, f64)]) -> Self {
        let (ax, ay) = coords[v[0]];
        let (bx, by) = coords[v[1]];
        let (cx, cy) = coords[v[2]];
        let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
        if d.abs() < f64::EPSILON {
            // degenerate: any later point evicts it
            return Self { v, cx: 0.0, cy: 0.0, r2: f64::INFINITY };
        }
        let (a2, b2, c2) = (ax * ax + ay * ay, bx * bx + by * by, cx * cx + cy * cy);
        let ux = (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d;
        let uy = (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d;
        let r2 = (ax - ux).powi(2) + (ay - uy).powi(2);
        Self { v, cx: ux, cy: uy, r2 }
    }

    fn circumscribes(&self, x: f64, y: f64) -> bool {
        (x - self.cx).powi(2) + (y - self.cy).powi(2) < self.r2
    }

    fn edges(&self) -> [(usize, usize); 3] {
        [(self.v[0], self.v[1]), (self.v[1], self.v[2]), (self.v[2], self.v[0])]
    }
}

fn same_edge(a: (usize, usize), b: (usize, usize)) -> bool {
    a == b || (a.0 == b.1 && a.1 == b.0)
}

/// Number of landmarks a complete set of this category holds
pub fn landmark_count(category: LandmarkCategory) -> usize {
    match category {
        LandmarkCategory::Pose => POSE_LANDMARK_COUNT,
        LandmarkCategory::LeftHand | LandmarkCategory::RightHand => HAND_LANDMARK_COUNT,
        LandmarkCategory::FaceMesh => FACE_MESH_LANDMARK_COUNT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_counts() {
        assert_eq!(POSE_CONNECTIONS.len(), 35);
        assert_eq!(HAND_CONNECTIONS.len(), 21);
        assert_eq!(connections(LandmarkCategory::FaceMesh).count(), 36 + 40 + 16 + 8 + 16 + 8);
    }

    #[test]
    fn test_indices_within_model() {
        for category in LandmarkCategory::ALL {
            let count = landmark_count(category);
            for (a, b) in connections(category) {
                assert!(a < count && b < count, "{} edge ({}, {}) out of range", category, a, b);
            }
        }
    }

    #[test]
    fn test_triangulate_interior_point() {
        let points = [Some((0, 0)), Some((10, 0)), Some((5, 10)), Some((5, 4))];
        let edges = triangulate(&points);
        assert_eq!(edges.len(), 6);
        for outer in 0..3 {
            assert!(edges.contains(&(outer, 3)));
        }
    }

    #[test]
    fn test_triangulate_keeps_landmark_indices() {
        let points = [None, Some((0, 0)), None, Some((8, 0)), Some((4, 6)), Some((8, 0))];
        assert_eq!(triangulate(&points), vec![(1, 3), (1, 4), (3, 4)]);
    }

    #[test]
    fn test_triangulate_degenerate_input() {
        assert!(triangulate(&[Some((1, 1)), Some((5, 5))]).is_empty());
        assert!(triangulate(&[Some((0, 0)), Some((2, 2)), Some((4, 4))]).is_empty());
    }

    #[test]
    fn test_triangulate_square_has_one_diagonal() {
        let points = [Some((0, 0)), Some((10, 0)), Some((10, 10)), Some((0, 10)), Some((5, 5))];
        let edges = triangulate(&points);
        // four sides and four spokes to the centre
        assert_eq!(edges.len(), 8);
        assert!(edges.iter().all(|(a, b)| *b == 4 || (a + 2) % 4 != *b));
    }
}
