//! Collision tests
//!
//! Everything in Jingle Rocket collides as circles: lasers against targets use
//! bounding spheres, ship contacts use plain center distance thresholds.

use glam::Vec2;

/// Whether two circles overlap (touching counts)
#[inline]
pub fn spheres_intersect(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> bool {
    let sum = radius_a + radius_b;
    a.distance_squared(b) <= sum * sum
}

/// Whether two points are strictly closer than `distance`
#[inline]
pub fn within_distance(a: Vec2, b: Vec2, distance: f32) -> bool {
    a.distance(b) < distance
}

/// Index of the last item within `distance` of `point`
///
/// Lists are scanned newest-first so the most recent spawn wins ties.
pub fn last_within<T>(
    items: &[T],
    point: Vec2,
    distance: f32,
    pos: impl Fn(&T) -> Vec2,
) -> Option<usize> {
    items
        .iter()
        .rposition(|item| within_distance(pos(item), point, distance))
}

/// Index of the last item whose circle overlaps the given circle
pub fn last_intersecting<T>(
    items: &[T],
    center: Vec2,
    radius: f32,
    circle: impl Fn(&T) -> (Vec2, f32),
) -> Option<usize> {
    items.iter().rposition(|item| {
        let (c, r) = circle(item);
        spheres_intersect(center, radius, c, r)
    })
}
