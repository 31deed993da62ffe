//! Point arena and polygon operations.
//!
//! This module implements the Arena pattern with index-based references:
//! a [`PointStore`] owns every vertex created during generation and hands out
//! [`PointId`] handles. Polygons store ids, never coordinates, so two patches
//! that share a corner observe each other's edits (junction merging, wall
//! smoothing and street smoothing all mutate shared vertices in place).
//!
//! Identity, not value, is the comparison key throughout: two vertices with
//! equal coordinates are different entities unless they are the same id.

use crate::geometry::{cross, intersect_lines, Point};

/// Identity handle for a vertex in a [`PointStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId(usize);

/// Arena of shared, mutable vertices.
#[derive(Debug, Clone, Default)]
pub struct PointStore {
    points: Vec<Point>,
}

impl PointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new vertex and return its identity.
    #[inline]
    pub fn alloc(&mut self, p: Point) -> PointId {
        let id = PointId(self.points.len());
        self.points.push(p);
        id
    }

    /// Current coordinates of a vertex.
    #[inline]
    pub fn pos(&self, id: PointId) -> Point {
        self.points[id.0]
    }

    /// Overwrite the coordinates of a vertex. Every polygon referencing the
    /// id observes the change.
    #[inline]
    pub fn set(&mut self, id: PointId, p: Point) {
        self.points[id.0] = p;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

const DELTA: f64 = 0.000001;

/// An ordered sequence of shared vertices. The last edge wraps to the first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Polygon {
    vertices: Vec<PointId>,
}

impl From<Vec<PointId>> for Polygon {
    fn from(vertices: Vec<PointId>) -> Self {
        Self { vertices }
    }
}

impl Polygon {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> PointId {
        self.vertices[i]
    }

    #[inline]
    pub fn first(&self) -> Option<PointId> {
        self.vertices.first().copied()
    }

    #[inline]
    pub fn last(&self) -> Option<PointId> {
        self.vertices.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = PointId> + '_ {
        self.vertices.iter().copied()
    }

    /// Iterate over directed edges, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (PointId, PointId)> + '_ {
        let len = self.vertices.len();
        (0..len).map(move |i| (self.vertices[i], self.vertices[(i + 1) % len]))
    }

    pub fn push(&mut self, id: PointId) {
        self.vertices.push(id);
    }

    pub fn unshift(&mut self, id: PointId) {
        self.vertices.insert(0, id);
    }

    pub fn insert(&mut self, index: usize, id: PointId) {
        self.vertices.insert(index, id);
    }

    /// Remove `count` vertices starting at `index`.
    pub fn splice(&mut self, index: usize, count: usize) {
        self.vertices.drain(index..index + count);
    }

    /// Remove the first occurrence of a vertex, by identity.
    pub fn remove(&mut self, id: PointId) -> bool {
        if let Some(i) = self.index_of(id) {
            self.vertices.remove(i);
            true
        } else {
            false
        }
    }

    /// Replace the vertex at `index` with another id.
    pub fn set_vertex(&mut self, index: usize, id: PointId) {
        self.vertices[index] = id;
    }

    #[inline]
    pub fn index_of(&self, id: PointId) -> Option<usize> {
        self.vertices.iter().position(|&v| v == id)
    }

    #[inline]
    pub fn last_index_of(&self, id: PointId) -> Option<usize> {
        self.vertices.iter().rposition(|&v| v == id)
    }

    #[inline]
    pub fn contains(&self, id: PointId) -> bool {
        self.vertices.contains(&id)
    }

    /// Index of the directed edge `a -> b`, if present.
    pub fn find_edge(&self, a: PointId, b: PointId) -> Option<usize> {
        let index = self.index_of(a)?;
        if self.vertices[(index + 1) % self.vertices.len()] == b {
            Some(index)
        } else {
            None
        }
    }

    /// Successor of a vertex in boundary order.
    pub fn next(&self, a: PointId) -> PointId {
        let i = self.index_of(a).unwrap_or(0);
        self.vertices[(i + 1) % self.vertices.len()]
    }

    /// Predecessor of a vertex in boundary order.
    pub fn prev(&self, a: PointId) -> PointId {
        let i = self.index_of(a).unwrap_or(0);
        self.vertices[(i + self.vertices.len() - 1) % self.vertices.len()]
    }

    /// Edge vector starting at the given vertex.
    pub fn vector(&self, store: &PointStore, v: PointId) -> Point {
        store.pos(self.next(v)) - store.pos(v)
    }

    /// Edge vector starting at the given index.
    pub fn vector_i(&self, store: &PointStore, i: usize) -> Point {
        let j = if i == self.vertices.len() - 1 { 0 } else { i + 1 };
        store.pos(self.vertices[j]) - store.pos(self.vertices[i])
    }

    /// True if the polygons share at least one edge (in either direction).
    pub fn borders(&self, another: &Polygon) -> bool {
        let len1 = self.vertices.len();
        let len2 = another.vertices.len();
        for i in 0..len1 {
            if let Some(j) = another.index_of(self.vertices[i]) {
                let next = self.vertices[(i + 1) % len1];
                if next == another.vertices[(j + 1) % len2]
                    || next == another.vertices[(j + len2 - 1) % len2]
                {
                    return true;
                }
            }
        }
        false
    }

    // === Measures ===

    /// Signed area (shoelace formula).
    pub fn square(&self, store: &PointStore) -> f64 {
        if self.vertices.is_empty() {
            return 0.0;
        }
        let mut v1 = store.pos(self.vertices[self.vertices.len() - 1]);
        let mut s = 0.0;
        for &id in &self.vertices {
            let v2 = store.pos(id);
            s += v1.x * v2.y - v2.x * v1.y;
            v1 = v2;
        }
        s * 0.5
    }

    pub fn perimeter(&self, store: &PointStore) -> f64 {
        self.edges()
            .map(|(a, b)| store.pos(a).distance(&store.pos(b)))
            .sum()
    }

    /// Isoperimetric quotient: 1.0 for a circle, ~0.79 for a square,
    /// ~0.60 for a triangle.
    pub fn compactness(&self, store: &PointStore) -> f64 {
        let p = self.perimeter(store);
        4.0 * std::f64::consts::PI * self.square(store) / (p * p)
    }

    /// Vertex average: a faster approximation of the centroid.
    pub fn center(&self, store: &PointStore) -> Point {
        let mut c = Point::ZERO;
        for &id in &self.vertices {
            c = c + store.pos(id);
        }
        c / self.vertices.len() as f64
    }

    /// True centroid via the polygon-centroid integral.
    pub fn centroid(&self, store: &PointStore) -> Point {
        let mut x = 0.0;
        let mut y = 0.0;
        let mut a = 0.0;
        for (i0, i1) in self.edges() {
            let v0 = store.pos(i0);
            let v1 = store.pos(i1);
            let f = cross(v0.x, v0.y, v1.x, v1.y);
            a += f;
            x += (v0.x + v1.x) * f;
            y += (v0.y + v1.y) * f;
        }
        let s6 = 1.0 / (3.0 * a);
        Point::new(s6 * x, s6 * y)
    }

    /// Minimal distance from any vertex to `p`. This is a vertex distance,
    /// not the distance to the polygon outline.
    pub fn distance(&self, store: &PointStore, p: Point) -> f64 {
        self.vertices
            .iter()
            .map(|&v| store.pos(v).distance(&p))
            .fold(f64::INFINITY, f64::min)
    }

    /// Vertex minimizing the given score. The first minimum wins ties.
    pub fn min_vertex<F: Fn(Point) -> f64>(&self, store: &PointStore, f: F) -> Option<PointId> {
        let mut best: Option<PointId> = None;
        let mut best_val = f64::INFINITY;
        for &v in &self.vertices {
            let val = f(store.pos(v));
            if best.is_none() || val < best_val {
                best = Some(v);
                best_val = val;
            }
        }
        best
    }

    /// Vertex maximizing the given score. The first maximum wins ties.
    pub fn max_vertex<F: Fn(PointId, Point) -> f64>(
        &self,
        store: &PointStore,
        f: F,
    ) -> Option<PointId> {
        let mut best: Option<PointId> = None;
        let mut best_val = f64::NEG_INFINITY;
        for &v in &self.vertices {
            let val = f(v, store.pos(v));
            if best.is_none() || val > best_val {
                best = Some(v);
                best_val = val;
            }
        }
        best
    }

    /// Inverse-distance weights of every vertex relative to `p`,
    /// normalized to sum to one.
    pub fn interpolate(&self, store: &PointStore, p: Point) -> Vec<f64> {
        let dd: Vec<f64> = self
            .vertices
            .iter()
            .map(|&v| 1.0 / store.pos(v).distance(&p))
            .collect();
        let sum: f64 = dd.iter().sum();
        dd.into_iter().map(|d| d / sum).collect()
    }

    // === Convexity and smoothing ===

    pub fn is_convex_vertex(&self, store: &PointStore, v1: PointId) -> bool {
        let v0 = store.pos(self.prev(v1));
        let v2 = store.pos(self.next(v1));
        let v1 = store.pos(v1);
        cross(v1.x - v0.x, v1.y - v0.y, v2.x - v1.x, v2.y - v1.y) > 0.0
    }

    pub fn is_convex(&self, store: &PointStore) -> bool {
        self.vertices
            .iter()
            .all(|&v| self.is_convex_vertex(store, v))
    }

    /// Weighted average of a vertex with its neighbours:
    /// `(prev + v*f + next) / (2 + f)`.
    pub fn smooth_vertex(&self, store: &PointStore, v: PointId, f: f64) -> Point {
        let prev = store.pos(self.prev(v));
        let next = store.pos(self.next(v));
        let v = store.pos(v);
        (prev + v * f + next) / (2.0 + f)
    }

    /// Smoothed coordinates for every vertex, without touching the polygon.
    pub fn smooth_vertex_eq_values(&self, store: &PointStore, f: f64) -> Vec<Point> {
        let len = self.vertices.len();
        let mut v1 = store.pos(self.vertices[len - 1]);
        let mut v2 = store.pos(self.vertices[0]);
        let mut result = Vec::with_capacity(len);
        for i in 0..len {
            let v0 = v1;
            v1 = v2;
            v2 = store.pos(self.vertices[(i + 1) % len]);
            result.push((v0 + v1 * f + v2) / (2.0 + f));
        }
        result
    }

    // === In-place transforms ===

    /// Translate every vertex by `delta`.
    pub fn offset(&self, store: &mut PointStore, delta: Point) {
        for &v in &self.vertices {
            let p = store.pos(v);
            store.set(v, p + delta);
        }
    }

    /// Rotate every vertex around the origin.
    pub fn rotate(&self, store: &mut PointStore, a: f64) {
        let cos_a = a.cos();
        let sin_a = a.sin();
        for &v in &self.vertices {
            let p = store.pos(v);
            store.set(v, Point::new(p.x * cos_a - p.y * sin_a, p.y * cos_a + p.x * sin_a));
        }
    }

    // === Splitting and offsetting ===

    /// Split along the chord between two existing vertices.
    /// Both halves share the chord vertices with the original.
    pub fn split(&self, p1: PointId, p2: PointId) -> Vec<Polygon> {
        let i1 = self.index_of(p1).unwrap_or(0);
        let i2 = self.index_of(p2).unwrap_or(0);
        self.split_i(i1, i2)
    }

    pub fn split_i(&self, i1: usize, i2: usize) -> Vec<Polygon> {
        let (i1, i2) = if i1 > i2 { (i2, i1) } else { (i1, i2) };

        let half1: Vec<PointId> = self.vertices[i1..=i2].to_vec();
        let mut half2: Vec<PointId> = self.vertices[i2..].to_vec();
        half2.extend_from_slice(&self.vertices[..=i1]);

        vec![Polygon::from(half1), Polygon::from(half2)]
    }

    /// Cut the polygon along the infinite line through `p1` and `p2`.
    ///
    /// Succeeds only when the line crosses exactly two boundary edges; the
    /// result then holds two polygons, the first one consistently on the
    /// left of the cut direction. Any other intersection count returns the
    /// polygon unchanged, signalling a miss.
    pub fn cut(&self, store: &mut PointStore, p1: Point, p2: Point, gap: f64) -> Vec<Polygon> {
        let x1 = p1.x;
        let y1 = p1.y;
        let dx1 = p2.x - x1;
        let dy1 = p2.y - y1;

        let len = self.vertices.len();
        let mut edge1 = 0;
        let mut ratio1 = 0.0;
        let mut edge2 = 0;
        let mut ratio2 = 0.0;
        let mut count = 0;

        for i in 0..len {
            let v0 = store.pos(self.vertices[i]);
            let v1 = store.pos(self.vertices[(i + 1) % len]);

            let x2 = v0.x;
            let y2 = v0.y;
            let dx2 = v1.x - x2;
            let dy2 = v1.y - y2;

            if let Some((t1, t2)) = intersect_lines(x1, y1, dx1, dy1, x2, y2, dx2, dy2) {
                if (0.0..=1.0).contains(&t2) {
                    match count {
                        0 => {
                            edge1 = i;
                            ratio1 = t1;
                        }
                        1 => {
                            edge2 = i;
                            ratio2 = t1;
                        }
                        _ => {}
                    }
                    count += 1;
                }
            }
        }

        if count != 2 {
            return vec![self.clone()];
        }

        let point1 = store.alloc(Point::new(x1 + dx1 * ratio1, y1 + dy1 * ratio1));
        let point2 = store.alloc(Point::new(x1 + dx1 * ratio2, y1 + dy1 * ratio2));

        let mut half1 = Polygon::from(self.vertices[edge1 + 1..=edge2].to_vec());
        half1.unshift(point1);
        half1.push(point2);

        let mut v2: Vec<PointId> = self.vertices[edge2 + 1..].to_vec();
        v2.extend_from_slice(&self.vertices[..=edge1]);
        let mut half2 = Polygon::from(v2);
        half2.unshift(point2);
        half2.push(point1);

        let (half1, half2) = if gap > 0.0 {
            (
                half1.peel_index(store, half1.len() - 1, gap / 2.0),
                half2.peel_index(store, half2.len() - 1, gap / 2.0),
            )
        } else {
            (half1, half2)
        };

        let v = self.vector_i(store, edge1);
        if cross(dx1, dy1, v.x, v.y) > 0.0 {
            vec![half1, half2]
        } else {
            vec![half2, half1]
        }
    }

    /// Inset the edge starting at index `i1`, keeping the rest of the shape.
    pub fn peel_index(&self, store: &mut PointStore, i1: usize, d: f64) -> Polygon {
        let i2 = (i1 + 1) % self.vertices.len();
        let v1 = store.pos(self.vertices[i1]);
        let v2 = store.pos(self.vertices[i2]);

        let v = v2 - v1;
        let n = v.rotate90().norm(d);

        let mut halves = self.cut(store, v1 + n, v2 + n, 0.0);
        halves.swap_remove(0)
    }

    /// Shrink by insetting each edge by the matching distance and
    /// re-intersecting the offset edges. Distances are indexed by the
    /// original edge order; a zero distance leaves the edge in place.
    pub fn shrink(&self, store: &mut PointStore, d: &[f64]) -> Polygon {
        let mut q = self.clone();
        for (i, (i0, i1)) in self.edges().enumerate() {
            let dd = d[i];
            if dd > 0.0 {
                let v1 = store.pos(i0);
                let v2 = store.pos(i1);
                let v = v2 - v1;
                let n = v.rotate90().norm(dd);
                let mut halves = q.cut(store, v1 + n, v2 + n, 0.0);
                q = halves.swap_remove(0);
            }
        }
        q
    }

    /// Shrink all edges by the same distance.
    pub fn shrink_eq(&self, store: &mut PointStore, d: f64) -> Polygon {
        self.shrink(store, &vec![d; self.vertices.len()])
    }

    /// General per-edge offset supporting concave polygons: builds the offset
    /// outline, resolves self-intersections by inserting crossing points, and
    /// keeps the sub-loop with the largest area.
    pub fn buffer(&self, store: &mut PointStore, d: &[f64]) -> Polygon {
        let mut q = Polygon::new();
        for (i, (i0, i1)) in self.edges().enumerate() {
            let dd = d[i];
            if dd == 0.0 {
                q.push(i0);
                q.push(i1);
            } else {
                let v0 = store.pos(i0);
                let v1 = store.pos(i1);
                let n = (v1 - v0).rotate90().norm(dd);
                q.push(store.alloc(v0 + n));
                q.push(store.alloc(v1 + n));
            }
        }

        // Insert crossing points until no edge pair intersects. Bounded: a
        // malformed outline must not hang the generator.
        let mut was_cut;
        let mut last_edge = 0;
        let mut iterations = 1000;
        loop {
            was_cut = false;
            iterations -= 1;
            if iterations <= 0 {
                break;
            }
            let n = q.len();
            for edge_i in last_edge..n.saturating_sub(2) {
                last_edge = edge_i;
                let p11 = store.pos(q.get(edge_i));
                let p12 = store.pos(q.get(edge_i + 1));
                let x1 = p11.x;
                let y1 = p11.y;
                let dx1 = p12.x - x1;
                let dy1 = p12.y - y1;

                let j_end = if edge_i > 0 { n } else { n - 1 };
                for j in edge_i + 2..j_end {
                    let p21 = store.pos(q.get(j));
                    let p22 = if j < n - 1 {
                        store.pos(q.get(j + 1))
                    } else {
                        store.pos(q.get(0))
                    };
                    let x2 = p21.x;
                    let y2 = p21.y;
                    let dx2 = p22.x - x2;
                    let dy2 = p22.y - y2;

                    if let Some((t1, t2)) = intersect_lines(x1, y1, dx1, dy1, x2, y2, dx2, dy2) {
                        if t1 > DELTA && t1 < 1.0 - DELTA && t2 > DELTA && t2 < 1.0 - DELTA {
                            let pn = store.alloc(Point::new(x1 + dx1 * t1, y1 + dy1 * t1));
                            q.insert(j + 1, pn);
                            q.insert(edge_i + 1, pn);
                            was_cut = true;
                            break;
                        }
                    }
                }
                if was_cut {
                    break;
                }
            }
            if !was_cut {
                break;
            }
        }

        // Walk the sub-loops and keep the one with the largest area.
        let mut regular: Vec<usize> = (0..q.len()).collect();
        let mut best = Polygon::new();
        let mut best_sq = f64::NEG_INFINITY;

        let mut safety_outer = q.len() * 2 + 1;
        while !regular.is_empty() && safety_outer > 0 {
            safety_outer -= 1;
            let mut indices = Vec::new();
            let start = regular[0];
            let mut curr = start;
            let mut safety_inner = q.len() * 2 + 1;
            loop {
                indices.push(curr);
                if let Some(pos) = regular.iter().position(|&r| r == curr) {
                    regular.remove(pos);
                }

                let next = (curr + 1) % q.len();
                let v = q.get(next);
                let mut next1 = q.index_of(v);
                if next1 == Some(next) {
                    next1 = q.last_index_of(v);
                }
                curr = next1.unwrap_or(next);

                safety_inner -= 1;
                if curr == start || regular.is_empty() || safety_inner == 0 {
                    break;
                }
            }

            let part = Polygon::from(indices.iter().map(|&i| q.get(i)).collect::<Vec<_>>());
            let s = part.square(store);
            if s > best_sq {
                best_sq = s;
                best = part;
            }
        }

        best
    }

    // === Factories ===

    /// Axis-aligned rectangle centered at the origin.
    pub fn rect(store: &mut PointStore, width: f64, height: f64) -> Polygon {
        let hw = width / 2.0;
        let hh = height / 2.0;
        Polygon::from(vec![
            store.alloc(Point::new(-hw, -hh)),
            store.alloc(Point::new(hw, -hh)),
            store.alloc(Point::new(hw, hh)),
            store.alloc(Point::new(-hw, hh)),
        ])
    }

    /// Regular polygon approximation of a circle (16 segments).
    pub fn circle(store: &mut PointStore, radius: f64) -> Polygon {
        Self::regular(store, 16, radius)
    }

    /// Regular n-gon centered at the origin.
    pub fn regular(store: &mut PointStore, n: usize, radius: f64) -> Polygon {
        let mut vertices = Vec::with_capacity(n);
        for i in 0..n {
            let a = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
            vertices.push(store.alloc(Point::new(radius * a.cos(), radius * a.sin())));
        }
        Polygon::from(vertices)
    }

    /// Resolve every vertex to its current coordinates.
    pub fn resolve(&self, store: &PointStore) -> Vec<Point> {
        self.vertices.iter().map(|&v| store.pos(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_10(store: &mut PointStore) -> Polygon {
        Polygon::from(vec![
            store.alloc(Point::new(0.0, 0.0)),
            store.alloc(Point::new(10.0, 0.0)),
            store.alloc(Point::new(10.0, 10.0)),
            store.alloc(Point::new(0.0, 10.0)),
        ])
    }

    #[test]
    fn test_measures() {
        let mut store = PointStore::new();
        let sq = square_10(&mut store);

        assert!((sq.square(&store).abs() - 100.0).abs() < 1e-10);
        assert!((sq.perimeter(&store) - 40.0).abs() < 1e-10);

        let c = sq.center(&store);
        assert!((c.x - 5.0).abs() < 1e-10);
        assert!((c.y - 5.0).abs() < 1e-10);

        let c = sq.centroid(&store);
        assert!((c.x - 5.0).abs() < 1e-10);
        assert!((c.y - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_circle_compactness() {
        let mut store = PointStore::new();
        for r in [0.5, 1.0, 7.0, 120.0] {
            let c = Polygon::circle(&mut store, r);
            assert!(
                c.compactness(&store).abs() > 0.9,
                "16-gon of radius {} should be nearly round",
                r
            );
        }
    }

    #[test]
    fn test_identity_semantics() {
        let mut store = PointStore::new();
        let a = store.alloc(Point::new(0.0, 0.0));
        let b = store.alloc(Point::new(1.0, 0.0));
        let c = store.alloc(Point::new(1.0, 1.0));
        let poly = Polygon::from(vec![a, b, c]);

        assert_eq!(poly.index_of(b), Some(1));

        // Same coordinates, different identity
        let a2 = store.alloc(Point::new(0.0, 0.0));
        assert_eq!(poly.index_of(a2), None);

        // Directed edges
        assert_eq!(poly.find_edge(a, b), Some(0));
        assert_eq!(poly.find_edge(b, a), None);

        // A shared vertex mutation is visible through every polygon
        let other = Polygon::from(vec![b, c, a2]);
        store.set(b, Point::new(5.0, 5.0));
        assert_eq!(store.pos(poly.get(1)), Point::new(5.0, 5.0));
        assert_eq!(store.pos(other.get(0)), Point::new(5.0, 5.0));
    }

    #[test]
    fn test_borders() {
        let mut store = PointStore::new();
        let p1 = store.alloc(Point::new(0.0, 0.0));
        let p2 = store.alloc(Point::new(1.0, 0.0));
        let p3 = store.alloc(Point::new(1.0, 1.0));
        let p4 = store.alloc(Point::new(0.0, 1.0));
        let p5 = store.alloc(Point::new(2.0, 0.0));
        let p6 = store.alloc(Point::new(2.0, 1.0));

        let sq1 = Polygon::from(vec![p1, p2, p3, p4]);
        let sq2 = Polygon::from(vec![p2, p5, p6, p3]);
        assert!(sq1.borders(&sq2));
        assert!(sq2.borders(&sq1));

        // Shared coordinates without shared identity do not count
        let p2b = store.alloc(Point::new(1.0, 0.0));
        let p3b = store.alloc(Point::new(1.0, 1.0));
        let sq3 = Polygon::from(vec![p2b, p5, p6, p3b]);
        assert!(!sq1.borders(&sq3));
    }

    #[test]
    fn test_cut_conserves_area() {
        let mut store = PointStore::new();
        let sq = square_10(&mut store);

        let halves = sq.cut(&mut store, Point::new(5.0, -1.0), Point::new(5.0, 11.0), 0.0);
        assert_eq!(halves.len(), 2);

        let total = halves[0].square(&store).abs() + halves[1].square(&store).abs();
        assert!((total - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_cut_miss_returns_unchanged() {
        let mut store = PointStore::new();
        let sq = square_10(&mut store);

        let result = sq.cut(&mut store, Point::new(-5.0, -5.0), Point::new(-3.0, -5.0), 0.0);
        assert_eq!(result.len(), 1);
        assert!((result[0].square(&store).abs() - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_cut_with_gap_loses_area() {
        let mut store = PointStore::new();
        let sq = square_10(&mut store);

        let halves = sq.cut(&mut store, Point::new(5.0, -1.0), Point::new(5.0, 11.0), 1.0);
        assert_eq!(halves.len(), 2);
        let total = halves[0].square(&store).abs() + halves[1].square(&store).abs();
        assert!(total < 100.0);
        assert!(total > 80.0);
    }

    #[test]
    fn test_shrink_eq() {
        let mut store = PointStore::new();
        let sq = square_10(&mut store);

        let shrunk = sq.shrink_eq(&mut store, 1.0);
        assert!((shrunk.square(&store).abs() - 64.0).abs() < 1.0);
    }

    #[test]
    fn test_shrink_single_edge() {
        let mut store = PointStore::new();
        let sq = square_10(&mut store);

        let shrunk = sq.shrink(&mut store, &[0.0, 0.0, 0.0, 2.0]);
        let area = shrunk.square(&store).abs();
        assert!(area < 100.0);
        assert!(area > 60.0);
    }

    #[test]
    fn test_buffer_matches_shrink_on_convex() {
        let mut store = PointStore::new();
        let sq = square_10(&mut store);

        let buffered = sq.buffer(&mut store, &[1.0, 1.0, 1.0, 1.0]);
        assert!((buffered.square(&store).abs() - 64.0).abs() < 2.0);
    }

    #[test]
    fn test_split_shares_chord_vertices() {
        let mut store = PointStore::new();
        let sq = square_10(&mut store);
        let a = sq.get(0);
        let c = sq.get(2);

        let halves = sq.split(a, c);
        assert_eq!(halves.len(), 2);
        assert!(halves[0].contains(a) && halves[0].contains(c));
        assert!(halves[1].contains(a) && halves[1].contains(c));

        let total = halves[0].square(&store).abs() + halves[1].square(&store).abs();
        assert!((total - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_smooth_vertex() {
        let mut store = PointStore::new();
        let sq = square_10(&mut store);
        let v = sq.get(0);

        // f = 1: plain average of prev, v, next
        let s = sq.smooth_vertex(&store, v, 1.0);
        assert!((s.x - 10.0 / 3.0).abs() < 1e-10);
        assert!((s.y - 10.0 / 3.0).abs() < 1e-10);

        // Large f keeps the vertex in place
        let s = sq.smooth_vertex(&store, v, 1e9);
        assert!(s.distance(&store.pos(v)) < 1e-6);
    }

    #[test]
    fn test_convexity() {
        let mut store = PointStore::new();
        let sq = square_10(&mut store);
        assert!(sq.is_convex(&store));

        let l_shape = Polygon::from(vec![
            store.alloc(Point::new(0.0, 0.0)),
            store.alloc(Point::new(2.0, 0.0)),
            store.alloc(Point::new(2.0, 1.0)),
            store.alloc(Point::new(1.0, 1.0)),
            store.alloc(Point::new(1.0, 2.0)),
            store.alloc(Point::new(0.0, 2.0)),
        ]);
        assert!(!l_shape.is_convex(&store));
    }

    #[test]
    fn test_interpolate_weights() {
        let mut store = PointStore::new();
        let sq = square_10(&mut store);

        let w = sq.interpolate(&store, Point::new(5.0, 5.0));
        assert_eq!(w.len(), 4);
        let sum: f64 = w.iter().sum();
        assert!((sum - 1.0).abs() < 1e-10);
        // Equidistant center weights every corner equally
        for wi in &w {
            assert!((wi - 0.25).abs() < 1e-10);
        }
    }
}
