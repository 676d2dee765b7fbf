//! Pass Descriptors
//!
//! Static configuration of one shader pass: template path, stage slot lists,
//! extra preprocessor lines, mandatory fields and literal render-state
//! overrides. Descriptors are plain data and deserialize with serde, every
//! field defaulted.

use serde::Deserialize;

/// Literal render-state lines that replace the values derived from
/// [`MaterialOptions`](crate::render_state::MaterialOptions).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderStateOverrides {
    pub blend: Option<String>,
    /// Appended after the blend line.
    pub blend_op: Option<String>,
    pub cull: Option<String>,
    pub ztest: Option<String>,
    pub zwrite: Option<String>,
    pub color_mask: Option<String>,
    pub stencil: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PassDescriptor {
    pub name: String,
    pub light_mode: String,
    /// Value of `#define SHADERPASS`.
    pub shader_pass_name: String,
    /// Template path, resolved through the generator's template source.
    pub template: String,
    pub includes: Vec<String>,
    pub extra_instancing_options: Vec<String>,
    pub extra_defines: Vec<String>,
    /// Root slot ids evaluated by the vertex stage.
    pub vertex_slots: Vec<u32>,
    /// Root slot ids evaluated by the pixel stage.
    pub pixel_slots: Vec<u32>,
    /// Qualified field names active regardless of the graph.
    pub required_fields: Vec<String>,
    #[serde(flatten)]
    pub overrides: RenderStateOverrides,
}

impl PassDescriptor {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            light_mode: name.clone(),
            name,
            template: template.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_light_mode(mut self, light_mode: impl Into<String>) -> Self {
        self.light_mode = light_mode.into();
        self
    }

    #[must_use]
    pub fn with_shader_pass(mut self, shader_pass_name: impl Into<String>) -> Self {
        self.shader_pass_name = shader_pass_name.into();
        self
    }

    #[must_use]
    pub fn with_includes<I, S>(mut self, includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes.extend(includes.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_instancing_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_instancing_options.extend(options.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_extra_defines<I, S>(mut self, defines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_defines.extend(defines.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_vertex_slots(mut self, slots: impl IntoIterator<Item = u32>) -> Self {
        self.vertex_slots.extend(slots);
        self
    }

    #[must_use]
    pub fn with_pixel_slots(mut self, slots: impl IntoIterator<Item = u32>) -> Self {
        self.pixel_slots.extend(slots);
        self
    }

    #[must_use]
    pub fn with_required_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: RenderStateOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}
