use foundation::math::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Position the light shines from, towards the origin.
    pub position: Vec3,
    pub color: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HemisphereLight {
    pub sky: [f32; 3],
    pub ground: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightRig {
    pub ambient_color: [f32; 3],
    pub ambient_intensity: f32,
    pub directional: Vec<DirectionalLight>,
    pub hemisphere: HemisphereLight,
}

impl Default for LightRig {
    fn default() -> Self {
        Self::standard()
    }
}

impl LightRig {
    /// Bright, even lighting suited to architectural interiors.
    pub fn standard() -> Self {
        let white = [1.0, 1.0, 1.0];
        Self {
            ambient_color: white,
            ambient_intensity: 1.5,
            directional: vec![
                DirectionalLight {
                    position: Vec3::new(1.0, 1.0, 1.0),
                    color: white,
                    intensity: 1.5,
                },
                DirectionalLight {
                    position: Vec3::new(-1.0, 2.0, -1.0),
                    color: white,
                    intensity: 1.0,
                },
                DirectionalLight {
                    position: Vec3::new(0.0, -1.0, 0.0),
                    color: white,
                    intensity: 0.5,
                },
            ],
            hemisphere: HemisphereLight {
                sky: rgb(0xffffbb),
                ground: rgb(0x080820),
                intensity: 1.0,
            },
        }
    }
}

/// `0xRRGGBB` to linear-ish floats in `[0, 1]`.
pub fn rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}
