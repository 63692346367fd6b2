use crate::math::{Mat4, Vec3};

/// Axis-aligned bounding box.
///
/// An empty box has `min > max` on every axis; expanding it by a point
/// yields a degenerate box at that point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Default for Aabb3 {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb3 {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Aabb3 { min, max }
    }

    pub fn empty() -> Self {
        Aabb3 {
            min: [f64::INFINITY; 3],
            max: [f64::NEG_INFINITY; 3],
        }
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    pub fn expand(&mut self, p: Vec3) {
        let p = p.to_array();
        for (i, v) in p.iter().enumerate() {
            self.min[i] = self.min[i].min(*v);
            self.max[i] = self.max[i].max(*v);
        }
    }

    pub fn union(self, other: Self) -> Self {
        if other.is_empty() {
            return self;
        }
        if self.is_empty() {
            return other;
        }
        let mut out = self;
        out.expand(Vec3::from_array(other.min));
        out.expand(Vec3::from_array(other.max));
        out
    }

    pub fn center(&self) -> Vec3 {
        Vec3::new(
            0.5 * (self.min[0] + self.max[0]),
            0.5 * (self.min[1] + self.max[1]),
            0.5 * (self.min[2] + self.max[2]),
        )
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        Vec3::new(
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        )
    }

    pub fn max_dimension(&self) -> f64 {
        self.size().max_element()
    }

    pub fn translated(&self, by: Vec3) -> Self {
        if self.is_empty() {
            return *self;
        }
        Aabb3 {
            min: (Vec3::from_array(self.min) + by).to_array(),
            max: (Vec3::from_array(self.max) + by).to_array(),
        }
    }

    /// Bounds of the eight transformed corners.
    pub fn transformed(&self, m: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let mut out = Aabb3::empty();
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min[0] } else { self.max[0] },
                if i & 2 == 0 { self.min[1] } else { self.max[1] },
                if i & 4 == 0 { self.min[2] } else { self.max[2] },
            );
            out.expand(m.transform_point3(corner));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::Aabb3;
    use crate::math::{Mat4, Vec3};

    #[test]
    fn empty_box_grows_from_first_point() {
        let mut b = Aabb3::empty();
        assert!(b.is_empty());
        b.expand(Vec3::new(1.0, 2.0, 3.0));
        assert!(!b.is_empty());
        assert_eq!(b.size(), Vec3::ZERO);
        b.expand(Vec3::new(-1.0, 0.0, 5.0));
        assert_eq!(b.min, [-1.0, 0.0, 3.0]);
        assert_eq!(b.max, [1.0, 2.0, 5.0]);
    }

    #[test]
    fn center_size_and_max_dimension() {
        let b = Aabb3::new([0.0, -2.0, 10.0], [4.0, 2.0, 11.0]);
        assert_eq!(b.center(), Vec3::new(2.0, 0.0, 10.5));
        assert_eq!(b.size(), Vec3::new(4.0, 4.0, 1.0));
        assert_eq!(b.max_dimension(), 4.0);
    }

    #[test]
    fn union_ignores_empty() {
        let a = Aabb3::new([0.0; 3], [1.0; 3]);
        assert_eq!(a.union(Aabb3::empty()), a);
        assert_eq!(Aabb3::empty().union(a), a);
        let b = Aabb3::new([-1.0; 3], [0.5; 3]);
        assert_eq!(a.union(b), Aabb3::new([-1.0; 3], [1.0; 3]));
    }

    #[test]
    fn transformed_by_translation() {
        let a = Aabb3::new([0.0; 3], [1.0; 3]);
        let t = Mat4::translation(Vec3::new(2.0, 0.0, -1.0));
        assert_eq!(a.transformed(&t), Aabb3::new([2.0, 0.0, -1.0], [3.0, 1.0, 0.0]));
        assert_eq!(a.translated(Vec3::new(2.0, 0.0, -1.0)), a.transformed(&t));
    }
}
