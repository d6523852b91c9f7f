//! Precomputed offset tables for foraging search. Built once per run and
//! shared read-only by every searching female.

/// Coarse mask: concentric rings at multiples of the step size, eight compass
/// directions per ring. Iterating rings outward gives a nearest-first search
/// that can stop at the first ring with a usable resource.
pub struct ForageMask {
    rings: Vec<[(i32, i32); 8]>,
    step_m: i32,
}

impl ForageMask {
    pub fn new(step_m: i32, ring_count: usize) -> Self {
        // N, NE, E, SE, S, SW, W, NW unit offsets.
        const DIRECTIONS: [(i32, i32); 8] = [
            (0, -1),
            (1, -1),
            (1, 0),
            (1, 1),
            (0, 1),
            (-1, 1),
            (-1, 0),
            (-1, -1),
        ];
        let mut rings = Vec::with_capacity(ring_count);
        for ring in 1..=ring_count as i32 {
            let radius = ring * step_m;
            let mut offsets = [(0, 0); 8];
            for (slot, (dx, dy)) in offsets.iter_mut().zip(DIRECTIONS) {
                *slot = (dx * radius, dy * radius);
            }
            rings.push(offsets);
        }
        Self { rings, step_m }
    }

    pub fn ring_count(&self) -> usize {
        self.rings.len()
    }

    /// Radius of the given ring in metres.
    pub fn ring_radius_m(&self, ring: usize) -> i32 {
        (ring as i32 + 1) * self.step_m
    }

    /// Offsets of one ring, nearest ring first at index 0.
    pub fn ring(&self, ring: usize) -> &[(i32, i32); 8] {
        &self.rings[ring]
    }

    /// Rings whose radius does not exceed `max_radius_m`, nearest first.
    pub fn rings_within(&self, max_radius_m: i32) -> impl Iterator<Item = &[(i32, i32); 8]> {
        let step = self.step_m;
        self.rings
            .iter()
            .enumerate()
            .take_while(move |(i, _)| (*i as i32 + 1) * step <= max_radius_m)
            .map(|(_, ring)| ring)
    }
}

/// Detailed mask: every offset on the step grid within the radius, ordered by
/// distance so callers can still walk it nearest-first.
pub struct ForageMaskDetailed {
    offsets: Vec<(i32, i32)>,
}

impl ForageMaskDetailed {
    pub fn new(step_m: i32, max_radius_m: i32) -> Self {
        let limit = i64::from(max_radius_m) * i64::from(max_radius_m);
        let steps = max_radius_m / step_m;
        let mut offsets = Vec::new();
        for ky in -steps..=steps {
            for kx in -steps..=steps {
                let (dx, dy) = (kx * step_m, ky * step_m);
                let d2 = i64::from(dx) * i64::from(dx) + i64::from(dy) * i64::from(dy);
                if d2 <= limit {
                    offsets.push((dx, dy));
                }
            }
        }
        offsets.sort_by_key(|&(dx, dy)| i64::from(dx) * i64::from(dx) + i64::from(dy) * i64::from(dy));
        Self { offsets }
    }

    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coarse_rings_at_step_multiples() {
        let mask = ForageMask::new(50, 20);
        assert_eq!(mask.ring_count(), 20);
        assert_eq!(mask.ring_radius_m(0), 50);
        assert_eq!(mask.ring_radius_m(19), 1000);
        assert_eq!(mask.ring(0)[0], (0, -50));
        assert_eq!(mask.ring(1)[2], (100, 0));
        // Diagonal directions use the ring radius on both axes.
        assert_eq!(mask.ring(2)[3], (150, 150));
    }

    #[test]
    fn rings_within_respects_radius_cap() {
        let mask = ForageMask::new(50, 20);
        assert_eq!(mask.rings_within(300).count(), 6);
        assert_eq!(mask.rings_within(20).count(), 0);
        assert_eq!(mask.rings_within(5000).count(), 20);
    }

    #[test]
    fn detailed_mask_covers_disc_nearest_first() {
        let mask = ForageMaskDetailed::new(1, 3);
        assert_eq!(mask.offsets()[0], (0, 0));
        assert!(mask.offsets().contains(&(3, 0)));
        assert!(!mask.offsets().contains(&(3, 3)));
        let mut last = 0;
        for &(dx, dy) in mask.offsets() {
            let d2 = dx * dx + dy * dy;
            assert!(d2 >= last);
            last = d2;
        }
    }

    #[test]
    fn detailed_mask_respects_step_grid() {
        let mask = ForageMaskDetailed::new(2, 4);
        assert!(mask.offsets().iter().all(|&(dx, dy)| dx % 2 == 0 && dy % 2 == 0));
    }
}
