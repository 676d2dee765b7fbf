//! Render States
//!
//! [`MaterialOptions`] mirrors the fixed-function state a material asks for.
//! [`RenderStates::resolve`] combines it with a pass's literal overrides into
//! the text of the render-state named fragments.

use std::fmt;

use serde::Deserialize;

use crate::pass::RenderStateOverrides;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
pub enum SurfaceType {
    #[default]
    Opaque,
    Transparent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
pub enum AlphaMode {
    #[default]
    Alpha,
    Premultiply,
    Additive,
    Multiply,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum BlendMode {
    One,
    Zero,
    SrcColor,
    SrcAlpha,
    DstColor,
    DstAlpha,
    OneMinusSrcColor,
    OneMinusSrcAlpha,
    OneMinusDstColor,
    OneMinusDstAlpha,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
pub enum CullMode {
    #[default]
    Back,
    Front,
    Off,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
pub enum ZTest {
    Less,
    Greater,
    #[default]
    LEqual,
    GEqual,
    Equal,
    NotEqual,
    Always,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
pub enum ZWrite {
    #[default]
    On,
    Off,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
pub enum ZClip {
    #[default]
    True,
    False,
}

macro_rules! display_as_debug {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        })*
    };
}

display_as_debug!(BlendMode, CullMode, ZTest, ZWrite, ZClip);

/// Material-level render state.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MaterialOptions {
    pub src_blend: BlendMode,
    pub dst_blend: BlendMode,
    /// Separate alpha factors; `None` blends alpha like colour.
    pub alpha_blend: Option<(BlendMode, BlendMode)>,
    pub cull_mode: CullMode,
    pub ztest: ZTest,
    pub zwrite: ZWrite,
    pub zclip: ZClip,
    pub lod: u32,
}

impl Default for MaterialOptions {
    fn default() -> Self {
        Self {
            src_blend: BlendMode::One,
            dst_blend: BlendMode::Zero,
            alpha_blend: None,
            cull_mode: CullMode::Back,
            ztest: ZTest::LEqual,
            zwrite: ZWrite::On,
            zclip: ZClip::True,
            lod: 200,
        }
    }
}

impl MaterialOptions {
    /// Options of an HD surface.
    ///
    /// Transparent surfaces blend premultiplied (additive for
    /// [`AlphaMode::Additive`], forced premultiplied under refraction) and do
    /// not write depth. Off-screen transparents zero the alpha source factor.
    #[must_use]
    pub fn build(
        surface_type: SurfaceType,
        alpha_mode: AlphaMode,
        two_sided: bool,
        refraction: bool,
        offscreen_transparent: bool,
    ) -> Self {
        use BlendMode::{One, OneMinusSrcAlpha, Zero};

        let mut options = Self::default();
        match surface_type {
            SurfaceType::Opaque => {
                options.src_blend = One;
                options.dst_blend = Zero;
                options.zwrite = ZWrite::On;
            }
            SurfaceType::Transparent => {
                let dst = if !refraction && alpha_mode == AlphaMode::Additive {
                    One
                } else {
                    OneMinusSrcAlpha
                };
                options.src_blend = One;
                options.dst_blend = dst;
                let alpha_src = if offscreen_transparent { Zero } else { One };
                options.alpha_blend = Some((alpha_src, dst));
                options.zwrite = ZWrite::Off;
            }
        }
        options.ztest = ZTest::LEqual;
        options.cull_mode = if two_sided { CullMode::Off } else { CullMode::Back };
        options
    }

    #[must_use]
    pub fn blend_line(&self) -> String {
        match self.alpha_blend {
            Some((src_a, dst_a)) => format!(
                "Blend {} {}, {} {}",
                self.src_blend, self.dst_blend, src_a, dst_a
            ),
            None => format!("Blend {} {}", self.src_blend, self.dst_blend),
        }
    }
}

/// Resolved text of the render-state fragments of one pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderStates {
    pub blending: String,
    pub culling: String,
    pub ztest: String,
    pub zwrite: String,
    pub zclip: String,
    pub stencil: String,
    pub color_mask: String,
    pub lod: String,
}

impl RenderStates {
    /// Pass overrides win over material options. Depth clip is not
    /// overridable; stencil falls back to a placeholder comment and colour
    /// mask to nothing.
    #[must_use]
    pub fn resolve(overrides: &RenderStateOverrides, options: &MaterialOptions) -> Self {
        let mut blending = overrides
            .blend
            .clone()
            .unwrap_or_else(|| options.blend_line());
        if let Some(op) = &overrides.blend_op {
            blending.push('\n');
            blending.push_str(op);
        }

        let stencil = match &overrides.stencil {
            Some(lines) => lines.join("\n"),
            None => "// Default Stencil".to_string(),
        };

        Self {
            blending,
            culling: overrides
                .cull
                .clone()
                .unwrap_or_else(|| format!("Cull {}", options.cull_mode)),
            ztest: overrides
                .ztest
                .clone()
                .unwrap_or_else(|| format!("ZTest {}", options.ztest)),
            zwrite: overrides
                .zwrite
                .clone()
                .unwrap_or_else(|| format!("ZWrite {}", options.zwrite)),
            zclip: format!("ZClip {}", options.zclip),
            stencil,
            color_mask: overrides.color_mask.clone().unwrap_or_default(),
            lod: options.lod.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opaque_defaults() {
        let options = MaterialOptions::build(SurfaceType::Opaque, AlphaMode::Alpha, false, false, false);
        let states = RenderStates::resolve(&RenderStateOverrides::default(), &options);
        assert_eq!(states.blending, "Blend One Zero");
        assert_eq!(states.culling, "Cull Back");
        assert_eq!(states.ztest, "ZTest LEqual");
        assert_eq!(states.zwrite, "ZWrite On");
        assert_eq!(states.zclip, "ZClip True");
        assert_eq!(states.stencil, "// Default Stencil");
        assert_eq!(states.color_mask, "");
        assert_eq!(states.lod, "200");
    }

    #[test]
    fn test_transparent_additive_two_sided() {
        let options =
            MaterialOptions::build(SurfaceType::Transparent, AlphaMode::Additive, true, false, true);
        assert_eq!(options.blend_line(), "Blend One One, Zero One");
        assert_eq!(options.cull_mode, CullMode::Off);
        assert_eq!(options.zwrite, ZWrite::Off);
    }

    #[test]
    fn test_refraction_forces_premultiplied() {
        let options =
            MaterialOptions::build(SurfaceType::Transparent, AlphaMode::Additive, false, true, false);
        assert_eq!(
            options.blend_line(),
            "Blend One OneMinusSrcAlpha, One OneMinusSrcAlpha"
        );
    }

    #[test]
    fn test_overrides_win() {
        let overrides = RenderStateOverrides {
            blend: Some("Blend Off".into()),
            blend_op: Some("BlendOp Add".into()),
            zwrite: Some("ZWrite Off".into()),
            color_mask: Some("ColorMask 0".into()),
            stencil: Some(vec!["Stencil".into(), "{".into(), "}".into()]),
            ..RenderStateOverrides::default()
        };
        let states = RenderStates::resolve(&overrides, &MaterialOptions::default());
        assert_eq!(states.blending, "Blend Off\nBlendOp Add");
        assert_eq!(states.zwrite, "ZWrite Off");
        assert_eq!(states.color_mask, "ColorMask 0");
        assert_eq!(states.stencil, "Stencil\n{\n}");
        assert_eq!(states.culling, "Cull Back");
    }
}
