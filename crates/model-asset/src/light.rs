use glam::Vec4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightKind {
    #[default]
    Point = 0,
    Directional = 1,
    Spot = 2,
}

impl LightKind {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Point),
            1 => Some(Self::Directional),
            2 => Some(Self::Spot),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightData {
    pub kind: LightKind,
    pub on: bool,
    /// RGB with intensity in w.
    pub color: Vec4,
    /// Inner cone angle in radians.
    pub inner_angle: f32,
    /// Outer cone angle in radians.
    pub outer_angle: f32,
    /// Constant, linear and quadratic coefficients; w is unused.
    pub attenuation: Vec4,
}

impl Default for LightData {
    fn default() -> Self {
        Self {
            kind: LightKind::Point,
            on: true,
            color: Vec4::ONE,
            inner_angle: 0.0,
            outer_angle: 0.0,
            attenuation: Vec4::X,
        }
    }
}
