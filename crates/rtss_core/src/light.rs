use glam::{Vec3, Vec4};

/// Light categories in canonical slot order.
///
/// Lighting sub render states lay out their per-light uniforms in exactly this
/// order (all directional slots, then point, then spot), independent of the
/// order in which the scene reports visible lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LightType {
    Directional = 0,
    Point = 1,
    Spot = 2,
}

impl LightType {
    /// All light types in canonical slot order.
    pub const ALL: [LightType; 3] = [LightType::Directional, LightType::Point, LightType::Spot];

    /// Position inside a `[directional, point, spot]` count triple.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            LightType::Directional => "directional",
            LightType::Point => "point",
            LightType::Spot => "spot",
        }
    }
}

/// Distance attenuation of positional lights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    pub range: f32,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Attenuation {
    /// No distance falloff.
    pub const NONE: Attenuation = Attenuation {
        range: 0.0,
        constant: 1.0,
        linear: 0.0,
        quadratic: 0.0,
    };

    /// Packed as `(range, constant, linear, quadratic)`.
    #[inline]
    #[must_use]
    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(self.range, self.constant, self.linear, self.quadratic)
    }
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            range: 100.0,
            constant: 1.0,
            linear: 0.0,
            quadratic: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub attenuation: Attenuation,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    pub attenuation: Attenuation,
    /// Full inner cone angle in radians.
    pub inner_cone: f32,
    /// Full outer cone angle in radians.
    pub outer_cone: f32,
    pub falloff: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional,
    Point(PointLight),
    Spot(SpotLight),
}

/// A visible scene light with its derived world-space transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub id: u64,
    pub kind: LightKind,
    pub position: Vec3,
    pub direction: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    /// Scales both diffuse and specular colour.
    pub power: f32,
    pub cast_shadows: bool,
}

impl Light {
    /// Zero-intensity light bound to configured slots that have no visible
    /// scene light this frame.
    pub const BLANK: Light = Light {
        id: 0,
        kind: LightKind::Point(PointLight {
            attenuation: Attenuation::NONE,
        }),
        position: Vec3::ZERO,
        direction: Vec3::new(0.0, 0.0, -1.0),
        diffuse: Vec3::ZERO,
        specular: Vec3::ZERO,
        power: 0.0,
        cast_shadows: false,
    };

    #[must_use]
    pub fn new_directional(id: u64, direction: Vec3, diffuse: Vec3) -> Self {
        Self {
            id,
            kind: LightKind::Directional,
            position: Vec3::ZERO,
            direction: direction.normalize_or(Vec3::NEG_Z),
            diffuse,
            specular: diffuse,
            power: 1.0,
            cast_shadows: false,
        }
    }

    #[must_use]
    pub fn new_point(id: u64, position: Vec3, diffuse: Vec3, attenuation: Attenuation) -> Self {
        Self {
            id,
            kind: LightKind::Point(PointLight { attenuation }),
            position,
            direction: Vec3::NEG_Z,
            diffuse,
            specular: diffuse,
            power: 1.0,
            cast_shadows: false,
        }
    }

    #[must_use]
    pub fn new_spot(
        id: u64,
        position: Vec3,
        direction: Vec3,
        diffuse: Vec3,
        attenuation: Attenuation,
        inner_cone: f32,
        outer_cone: f32,
    ) -> Self {
        Self {
            id,
            kind: LightKind::Spot(SpotLight {
                attenuation,
                inner_cone,
                outer_cone,
                falloff: 1.0,
            }),
            position,
            direction: direction.normalize_or(Vec3::NEG_Z),
            diffuse,
            specular: diffuse,
            power: 1.0,
            cast_shadows: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn light_type(&self) -> LightType {
        match self.kind {
            LightKind::Directional => LightType::Directional,
            LightKind::Point(_) => LightType::Point,
            LightKind::Spot(_) => LightType::Spot,
        }
    }

    /// Homogeneous position: `(-direction, 0)` for directional lights,
    /// `(position, 1)` otherwise.
    #[must_use]
    pub fn as_homogeneous(&self) -> Vec4 {
        match self.kind {
            LightKind::Directional => (-self.direction).extend(0.0),
            _ => self.position.extend(1.0),
        }
    }

    #[must_use]
    pub fn attenuation(&self) -> Attenuation {
        match self.kind {
            LightKind::Directional => Attenuation::NONE,
            LightKind::Point(p) => p.attenuation,
            LightKind::Spot(s) => s.attenuation,
        }
    }

    /// `(cos(inner / 2), cos(outer / 2), falloff)`; a non-spot light yields a
    /// cone that never clips.
    #[must_use]
    pub fn spot_params(&self) -> Vec3 {
        match self.kind {
            LightKind::Spot(s) => Vec3::new((s.inner_cone * 0.5).cos(), (s.outer_cone * 0.5).cos(), s.falloff),
            _ => Vec3::new(1.0, 0.0, 0.0),
        }
    }

    #[inline]
    #[must_use]
    pub fn scaled_diffuse(&self) -> Vec3 {
        self.diffuse * self.power
    }

    #[inline]
    #[must_use]
    pub fn scaled_specular(&self) -> Vec3 {
        self.specular * self.power
    }
}
