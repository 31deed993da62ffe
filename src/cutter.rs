//! Higher-level polygon cuts used by ward geometry.

use crate::geometry::{interpolate, Point};
use crate::polygon::{PointId, PointStore, Polygon};

/// Split a polygon across the edge starting at `vertex`, at the given ratio
/// along the edge and rotated by `angle`. `gap` leaves an alley between the
/// halves.
pub fn bisect(
    store: &mut PointStore,
    poly: &Polygon,
    vertex: PointId,
    ratio: f64,
    angle: f64,
    gap: f64,
) -> Vec<Polygon> {
    let next = poly.next(vertex);
    let p1 = interpolate(store.pos(vertex), store.pos(next), ratio);
    let d = store.pos(next) - store.pos(vertex);

    let cos_b = angle.cos();
    let sin_b = angle.sin();
    let vx = d.x * cos_b - d.y * sin_b;
    let vy = d.y * cos_b + d.x * sin_b;
    let p2 = Point::new(p1.x - vy, p1.y + vx);

    poly.cut(store, p1, p2, gap)
}

/// Fan the polygon into triangular sectors around a center point
/// (the centroid when unset).
pub fn radial(store: &mut PointStore, poly: &Polygon, center: Option<Point>, gap: f64) -> Vec<Polygon> {
    let center = center.unwrap_or_else(|| poly.centroid(store));
    let center_id = store.alloc(center);

    let mut sectors = Vec::new();
    for (v0, v1) in poly.edges() {
        let mut sector = Polygon::from(vec![center_id, v0, v1]);
        if gap > 0.0 {
            sector = sector.shrink(store, &[gap / 2.0, 0.0, gap / 2.0]);
        }
        sectors.push(sector);
    }
    sectors
}

/// Like [`radial`], but fanning from an existing vertex (the one closest to
/// the centroid when unset), so one corner of the polygon anchors the fan.
pub fn semi_radial(
    store: &mut PointStore,
    poly: &Polygon,
    center: Option<PointId>,
    gap: f64,
) -> Vec<Polygon> {
    let center = match center {
        Some(c) => c,
        None => {
            let centroid = poly.centroid(store);
            match poly.min_vertex(store, |v| v.distance(&centroid)) {
                Some(c) => c,
                None => return Vec::new(),
            }
        }
    };

    let gap = gap / 2.0;
    let mut sectors = Vec::new();
    for (v0, v1) in poly.edges() {
        if v0 == center || v1 == center {
            continue;
        }
        let mut sector = Polygon::from(vec![center, v0, v1]);
        if gap > 0.0 {
            let d0 = if v0 == poly.next(center) { 0.0 } else { gap };
            let d2 = if v1 == poly.prev(center) { 0.0 } else { gap };
            sector = sector.shrink(store, &[d0, 0.0, d2]);
        }
        sectors.push(sector);
    }
    sectors
}

/// Peel a ring of the given thickness off the polygon, one slice per edge,
/// shortest edges first.
pub fn ring(store: &mut PointStore, poly: &Polygon, thickness: f64) -> Vec<Polygon> {
    let mut slices: Vec<(Point, Point, f64)> = Vec::new();
    for (i0, i1) in poly.edges() {
        let v1 = store.pos(i0);
        let v2 = store.pos(i1);
        let v = v2 - v1;
        let n = v.rotate90().norm(thickness);
        slices.push((v1 + n, v2 + n, v.length()));
    }

    // Short sides should be sliced first
    slices.sort_by(|s1, s2| s1.2.partial_cmp(&s2.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut peel = Vec::new();
    let mut q = poly.clone();
    for (p1, p2, _) in slices {
        let mut halves = q.cut(store, p1, p2, 0.0);
        if halves.len() == 2 {
            peel.push(halves.swap_remove(1));
        }
        q = halves.swap_remove(0);
    }
    peel
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn square(store: &mut PointStore, side: f64) -> Polygon {
        Polygon::from(vec![
            store.alloc(Point::new(0.0, 0.0)),
            store.alloc(Point::new(side, 0.0)),
            store.alloc(Point::new(side, side)),
            store.alloc(Point::new(0.0, side)),
        ])
    }

    #[test]
    fn test_bisect_halves() {
        let mut store = PointStore::new();
        let sq = square(&mut store, 10.0);
        let v0 = sq.get(0);

        let halves = bisect(&mut store, &sq, v0, 0.5, 0.0, 0.0);
        assert_eq!(halves.len(), 2);
        let total = halves[0].square(&store).abs() + halves[1].square(&store).abs();
        assert!((total - 100.0).abs() < 1.0);
    }

    #[test]
    fn test_bisect_with_gap() {
        let mut store = PointStore::new();
        let sq = square(&mut store, 10.0);
        let v0 = sq.get(0);

        let halves = bisect(&mut store, &sq, v0, 0.5, 0.0, 1.0);
        assert_eq!(halves.len(), 2);
        let total = halves[0].square(&store).abs() + halves[1].square(&store).abs();
        assert!(total < 100.0);
    }

    #[test]
    fn test_radial_sector_count() {
        let mut store = PointStore::new();
        let hex = Polygon::regular(&mut store, 6, 10.0);
        let sectors = radial(&mut store, &hex, None, 0.5);
        assert_eq!(sectors.len(), 6);
    }

    #[test]
    fn test_semi_radial_skips_anchor_edges() {
        let mut store = PointStore::new();
        let hex = Polygon::regular(&mut store, 6, 10.0);
        let sectors = semi_radial(&mut store, &hex, None, 0.0);
        // Two edges touch the anchor vertex and are skipped
        assert_eq!(sectors.len(), 4);
    }

    #[test]
    fn test_ring_peels_every_edge() {
        let mut store = PointStore::new();
        let sq = square(&mut store, 20.0);
        let pieces = ring(&mut store, &sq, 2.0);
        assert!(!pieces.is_empty());
        for p in &pieces {
            assert!(p.square(&store).abs() > 0.0);
        }
    }
}
