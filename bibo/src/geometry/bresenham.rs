//! Integer rasterization of capillary polylines.

use glam::{DVec2, I64Vec2};

/// Pixel centers of the segment `a -> b`, both endpoints included, in traversal order.
pub fn rasterize_line(a: I64Vec2, b: I64Vec2) -> Vec<I64Vec2> {
    let dx = (b.x - a.x).abs();
    let dy = -(b.y - a.y).abs();
    let sx = if a.x < b.x { 1 } else { -1 };
    let sy = if a.y < b.y { 1 } else { -1 };

    let mut out = Vec::with_capacity((dx.max(-dy) + 1) as usize);
    let mut p = a;
    let mut err = dx + dy;
    loop {
        out.push(p);
        if p == b {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            p.x += sx;
        }
        if e2 <= dx {
            err += dx;
            p.y += sy;
        }
    }
    out
}

/// Pixel centers along the whole polyline, first vertex first.
///
/// Vertices are rounded to the nearest pixel; a joint shared by two segments
/// is emitted once. Fewer than two points yields nothing.
pub fn rasterize_polyline(points: &[DVec2]) -> Vec<I64Vec2> {
    if points.len() < 2 {
        return Vec::new();
    }
    let rounded: Vec<I64Vec2> = points
        .iter()
        .map(|p| I64Vec2::new(p.x.round() as i64, p.y.round() as i64))
        .collect();

    let mut out: Vec<I64Vec2> = Vec::new();
    for w in rounded.windows(2) {
        let segment = rasterize_line(w[0], w[1]);
        let skip = usize::from(out.last() == segment.first());
        out.extend_from_slice(&segment[skip..]);
    }
    out
}
