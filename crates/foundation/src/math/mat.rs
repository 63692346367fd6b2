use super::Vec3;

/// Column-major 4x4 matrix (`cols[c][r]`), matching the GPU upload layout.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4 {
    pub cols: [[f64; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn from_cols(cols: [[f64; 4]; 4]) -> Self {
        Self { cols }
    }

    pub fn from_cols_f32(cols: [[f32; 4]; 4]) -> Self {
        let mut out = [[0.0f64; 4]; 4];
        for (c, col) in cols.iter().enumerate() {
            for (r, v) in col.iter().enumerate() {
                out[c][r] = f64::from(*v);
            }
        }
        Self { cols: out }
    }

    pub fn to_cols_f32(&self) -> [[f32; 4]; 4] {
        let mut out = [[0.0f32; 4]; 4];
        for c in 0..4 {
            for r in 0..4 {
                out[c][r] = self.cols[c][r] as f32;
            }
        }
        out
    }

    pub fn translation(t: Vec3) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[3] = [t.x, t.y, t.z, 1.0];
        m
    }

    /// Right-handed perspective projection with OpenGL depth (NDC z in `[-1, 1]`).
    ///
    /// Points on the near plane map to z = -1, the far plane to z = +1 and
    /// anything behind the eye to z > 1.
    pub fn perspective_rh_gl(fov_y_rad: f64, aspect: f64, near: f64, far: f64) -> Self {
        let f = 1.0 / (0.5 * fov_y_rad).tan();
        let aspect = if aspect > 0.0 { aspect } else { 1.0 };
        let m00 = f / aspect;
        let m11 = f;
        let m22 = (far + near) / (near - far);
        let m23 = (2.0 * far * near) / (near - far);

        // [ m00,  0,   0,   0 ]
        // [  0,  m11,  0,   0 ]
        // [  0,   0,  m22, m23 ]
        // [  0,   0,  -1,   0 ]
        Self {
            cols: [
                [m00, 0.0, 0.0, 0.0],
                [0.0, m11, 0.0, 0.0],
                [0.0, 0.0, m22, -1.0],
                [0.0, 0.0, m23, 0.0],
            ],
        }
    }

    pub fn look_at_rh(eye: Vec3, target: Vec3, up: Vec3) -> Self {
        let f = (target - eye).normalize();
        let s = f.cross(up).normalize();
        let u = s.cross(f);

        Self {
            cols: [
                [s.x, u.x, -f.x, 0.0],
                [s.y, u.y, -f.y, 0.0],
                [s.z, u.z, -f.z, 0.0],
                [-s.dot(eye), -u.dot(eye), f.dot(eye), 1.0],
            ],
        }
    }

    /// Multiply a homogeneous point `(p, 1)`; returns clip-space `[x, y, z, w]`.
    pub fn transform_point4(&self, p: Vec3) -> [f64; 4] {
        let v = [p.x, p.y, p.z, 1.0];
        let mut out = [0.0f64; 4];
        for (r, o) in out.iter_mut().enumerate() {
            *o = self.cols[0][r] * v[0]
                + self.cols[1][r] * v[1]
                + self.cols[2][r] * v[2]
                + self.cols[3][r] * v[3];
        }
        out
    }

    /// Affine point transform (ignores the projective row).
    pub fn transform_point3(&self, p: Vec3) -> Vec3 {
        let [x, y, z, _] = self.transform_point4(p);
        Vec3::new(x, y, z)
    }
}

impl std::ops::Mul for Mat4 {
    type Output = Self;

    fn mul(self, b: Self) -> Self::Output {
        let a = self;
        let mut c = [[0.0f64; 4]; 4];
        for col in 0..4 {
            for row in 0..4 {
                c[col][row] = a.cols[0][row] * b.cols[col][0]
                    + a.cols[1][row] * b.cols[col][1]
                    + a.cols[2][row] * b.cols[col][2]
                    + a.cols[3][row] * b.cols[col][3];
            }
        }
        Self { cols: c }
    }
}
