//! Built-in HD Render Pipeline Tables
//!
//! Struct schemas, field dependency lists and pass presets of the HD lit/unlit
//! master nodes. Initialized once per process and never mutated.
//!
//! The tessellation lists (`VaryingsMeshToPS` ⇄ `VaryingsMeshToDS`) are not
//! registered: together with the standard lists they form a cycle.

use std::sync::OnceLock;

use loom_graph::ValueType::{Bool, Float, Float3, Float4, UInt};

use crate::pass::{PassDescriptor, RenderStateOverrides};
use crate::schema::{
    DependencyTable, FieldDescriptor as F, SchemaRegistry, SchemaRegistryBuilder, StructSchema,
};

pub const ATTRIBUTES_MESH: &str = "AttributesMesh";
pub const VARYINGS_MESH_TO_PS: &str = "VaryingsMeshToPS";
pub const VARYINGS_MESH_TO_DS: &str = "VaryingsMeshToDS";
pub const FRAG_INPUTS: &str = "FragInputs";
pub const SURFACE_DESCRIPTION_INPUTS: &str = "SurfaceDescriptionInputs";
pub const VERTEX_DESCRIPTION_INPUTS: &str = "VertexDescriptionInputs";

const INSTANCING: &str = "UNITY_ANY_INSTANCING_ENABLED";

static BUILTIN: OnceLock<SchemaRegistry> = OnceLock::new();

fn builtin_tables() -> SchemaRegistryBuilder {
    SchemaRegistry::builder()
        .with_struct(attributes_mesh())
        .with_struct(varyings_mesh_to_ps())
        .with_struct(varyings_mesh_to_ds())
        .with_struct(graph_inputs(SURFACE_DESCRIPTION_INPUTS, true))
        .with_struct(graph_inputs(VERTEX_DESCRIPTION_INPUTS, false))
        .with_dependencies(frag_inputs_dependencies())
        .with_dependencies(varyings_standard_dependencies())
        .with_dependencies(surface_description_inputs_dependencies())
        .with_dependencies(vertex_description_inputs_dependencies())
}

impl SchemaRegistry {
    /// The process-wide HD registry.
    ///
    /// The tables are acyclic with unique struct names; `test_builtin_tables_validate`
    /// checks them through the validating builder.
    pub fn builtin() -> &'static SchemaRegistry {
        BUILTIN.get_or_init(|| builtin_tables().assemble())
    }
}

// ─── Schemas ─────────────────────────────────────────────────────────────────

fn attributes_mesh() -> StructSchema {
    StructSchema::new(ATTRIBUTES_MESH)
        .field(F::new("positionOS", Float3).semantic("POSITION"))
        .field(F::new("normalOS", Float3).semantic("NORMAL").optional())
        .field(F::new("tangentOS", Float4).semantic("TANGENT").optional())
        .field(F::new("uv0", Float4).semantic("TEXCOORD0").optional())
        .field(F::new("uv1", Float4).semantic("TEXCOORD1").optional())
        .field(F::new("uv2", Float4).semantic("TEXCOORD2").optional())
        .field(F::new("uv3", Float4).semantic("TEXCOORD3").optional())
        .field(F::new("color", Float4).semantic("COLOR").optional())
        .field(F::new("instanceID", UInt).semantic("INSTANCEID_SEMANTIC").guarded(INSTANCING))
}

fn varyings_mesh_to_ps() -> StructSchema {
    StructSchema::new(VARYINGS_MESH_TO_PS)
        .field(F::new("positionCS", Float4).semantic("SV_Position"))
        .field(F::new("positionRWS", Float3).optional())
        .field(F::new("normalWS", Float3).optional())
        .field(F::new("tangentWS", Float4).optional())
        .field(F::new("texCoord0", Float4).optional())
        .field(F::new("texCoord1", Float4).optional())
        .field(F::new("texCoord2", Float4).optional())
        .field(F::new("texCoord3", Float4).optional())
        .field(F::new("color", Float4).optional())
        .field(F::new("instanceID", UInt).semantic("CUSTOM_INSTANCE_ID").guarded(INSTANCING))
        .field(
            F::new("cullFace", Bool)
                .optional()
                .semantic("FRONT_FACE_SEMANTIC")
                .override_type("FRONT_FACE_TYPE")
                .guarded("SHADER_STAGE_FRAGMENT"),
        )
}

fn varyings_mesh_to_ds() -> StructSchema {
    StructSchema::new(VARYINGS_MESH_TO_DS)
        .field(F::new("positionRWS", Float3))
        .field(F::new("normalWS", Float3))
        .field(F::new("tangentWS", Float4).optional())
        .field(F::new("texCoord0", Float4).optional())
        .field(F::new("texCoord1", Float4).optional())
        .field(F::new("texCoord2", Float4).optional())
        .field(F::new("texCoord3", Float4).optional())
        .field(F::new("color", Float4).optional())
        .field(F::new("instanceID", UInt).semantic("CUSTOM_INSTANCE_ID").guarded(INSTANCING))
}

/// Graph evaluation inputs; `FaceSign` only exists for the pixel stage.
fn graph_inputs(name: &str, pixel: bool) -> StructSchema {
    let mut schema = StructSchema::new(name);
    for kind in ["Normal", "Tangent", "BiTangent", "ViewDirection", "Position"] {
        for space in ["ObjectSpace", "ViewSpace", "WorldSpace", "TangentSpace"] {
            schema = schema.field(F::new(format!("{space}{kind}"), Float3).optional());
        }
    }
    schema = schema
        .field(F::new("ScreenPosition", Float4).optional())
        .field(F::new("uv0", Float4).optional())
        .field(F::new("uv1", Float4).optional())
        .field(F::new("uv2", Float4).optional())
        .field(F::new("uv3", Float4).optional())
        .field(F::new("VertexColor", Float4).optional());
    if pixel {
        schema = schema.field(F::new("FaceSign", Float).optional());
    }
    schema
}

// ─── Dependencies ────────────────────────────────────────────────────────────

fn frag_inputs_dependencies() -> DependencyTable {
    DependencyTable::from_pairs(
        FRAG_INPUTS,
        &[
            ("FragInputs.positionRWS", "VaryingsMeshToPS.positionRWS"),
            ("FragInputs.worldToTangent", "VaryingsMeshToPS.tangentWS"),
            ("FragInputs.worldToTangent", "VaryingsMeshToPS.normalWS"),
            ("FragInputs.texCoord0", "VaryingsMeshToPS.texCoord0"),
            ("FragInputs.texCoord1", "VaryingsMeshToPS.texCoord1"),
            ("FragInputs.texCoord2", "VaryingsMeshToPS.texCoord2"),
            ("FragInputs.texCoord3", "VaryingsMeshToPS.texCoord3"),
            ("FragInputs.color", "VaryingsMeshToPS.color"),
            ("FragInputs.isFrontFace", "VaryingsMeshToPS.cullFace"),
        ],
    )
}

fn varyings_standard_dependencies() -> DependencyTable {
    DependencyTable::from_pairs(
        VARYINGS_MESH_TO_PS,
        &[
            ("VaryingsMeshToPS.positionRWS", "AttributesMesh.positionOS"),
            ("VaryingsMeshToPS.normalWS", "AttributesMesh.normalOS"),
            ("VaryingsMeshToPS.tangentWS", "AttributesMesh.tangentOS"),
            ("VaryingsMeshToPS.texCoord0", "AttributesMesh.uv0"),
            ("VaryingsMeshToPS.texCoord1", "AttributesMesh.uv1"),
            ("VaryingsMeshToPS.texCoord2", "AttributesMesh.uv2"),
            ("VaryingsMeshToPS.texCoord3", "AttributesMesh.uv3"),
            ("VaryingsMeshToPS.color", "AttributesMesh.color"),
            ("VaryingsMeshToPS.instanceID", "AttributesMesh.instanceID"),
        ],
    )
}

fn surface_description_inputs_dependencies() -> DependencyTable {
    DependencyTable::from_pairs(
        SURFACE_DESCRIPTION_INPUTS,
        &[
            ("SurfaceDescriptionInputs.WorldSpaceNormal", "FragInputs.worldToTangent"),
            ("SurfaceDescriptionInputs.ObjectSpaceNormal", "SurfaceDescriptionInputs.WorldSpaceNormal"),
            ("SurfaceDescriptionInputs.ViewSpaceNormal", "SurfaceDescriptionInputs.WorldSpaceNormal"),
            ("SurfaceDescriptionInputs.WorldSpaceTangent", "FragInputs.worldToTangent"),
            ("SurfaceDescriptionInputs.ObjectSpaceTangent", "SurfaceDescriptionInputs.WorldSpaceTangent"),
            ("SurfaceDescriptionInputs.ViewSpaceTangent", "SurfaceDescriptionInputs.WorldSpaceTangent"),
            ("SurfaceDescriptionInputs.WorldSpaceBiTangent", "FragInputs.worldToTangent"),
            ("SurfaceDescriptionInputs.ObjectSpaceBiTangent", "SurfaceDescriptionInputs.WorldSpaceBiTangent"),
            ("SurfaceDescriptionInputs.ViewSpaceBiTangent", "SurfaceDescriptionInputs.WorldSpaceBiTangent"),
            ("SurfaceDescriptionInputs.WorldSpacePosition", "FragInputs.positionRWS"),
            ("SurfaceDescriptionInputs.ObjectSpacePosition", "FragInputs.positionRWS"),
            ("SurfaceDescriptionInputs.ViewSpacePosition", "FragInputs.positionRWS"),
            // View direction is rebuilt from the world position.
            ("SurfaceDescriptionInputs.WorldSpaceViewDirection", "FragInputs.positionRWS"),
            ("SurfaceDescriptionInputs.ObjectSpaceViewDirection", "SurfaceDescriptionInputs.WorldSpaceViewDirection"),
            ("SurfaceDescriptionInputs.ViewSpaceViewDirection", "SurfaceDescriptionInputs.WorldSpaceViewDirection"),
            ("SurfaceDescriptionInputs.TangentSpaceViewDirection", "SurfaceDescriptionInputs.WorldSpaceViewDirection"),
            ("SurfaceDescriptionInputs.TangentSpaceViewDirection", "SurfaceDescriptionInputs.WorldSpaceTangent"),
            ("SurfaceDescriptionInputs.TangentSpaceViewDirection", "SurfaceDescriptionInputs.WorldSpaceBiTangent"),
            ("SurfaceDescriptionInputs.TangentSpaceViewDirection", "SurfaceDescriptionInputs.WorldSpaceNormal"),
            ("SurfaceDescriptionInputs.ScreenPosition", "SurfaceDescriptionInputs.WorldSpacePosition"),
            ("SurfaceDescriptionInputs.uv0", "FragInputs.texCoord0"),
            ("SurfaceDescriptionInputs.uv1", "FragInputs.texCoord1"),
            ("SurfaceDescriptionInputs.uv2", "FragInputs.texCoord2"),
            ("SurfaceDescriptionInputs.uv3", "FragInputs.texCoord3"),
            ("SurfaceDescriptionInputs.VertexColor", "FragInputs.color"),
            ("SurfaceDescriptionInputs.FaceSign", "FragInputs.isFrontFace"),
            ("DepthOffset", "FragInputs.positionRWS"),
        ],
    )
}

fn vertex_description_inputs_dependencies() -> DependencyTable {
    DependencyTable::from_pairs(
        VERTEX_DESCRIPTION_INPUTS,
        &[
            ("VertexDescriptionInputs.ObjectSpaceNormal", "AttributesMesh.normalOS"),
            ("VertexDescriptionInputs.WorldSpaceNormal", "AttributesMesh.normalOS"),
            ("VertexDescriptionInputs.ViewSpaceNormal", "VertexDescriptionInputs.WorldSpaceNormal"),
            ("VertexDescriptionInputs.ObjectSpaceTangent", "AttributesMesh.tangentOS"),
            ("VertexDescriptionInputs.WorldSpaceTangent", "AttributesMesh.tangentOS"),
            ("VertexDescriptionInputs.ViewSpaceTangent", "VertexDescriptionInputs.WorldSpaceTangent"),
            ("VertexDescriptionInputs.ObjectSpaceBiTangent", "AttributesMesh.normalOS"),
            ("VertexDescriptionInputs.ObjectSpaceBiTangent", "AttributesMesh.tangentOS"),
            ("VertexDescriptionInputs.WorldSpaceBiTangent", "VertexDescriptionInputs.ObjectSpaceBiTangent"),
            ("VertexDescriptionInputs.ViewSpaceBiTangent", "VertexDescriptionInputs.WorldSpaceBiTangent"),
            ("VertexDescriptionInputs.ObjectSpacePosition", "AttributesMesh.positionOS"),
            ("VertexDescriptionInputs.WorldSpacePosition", "AttributesMesh.positionOS"),
            ("VertexDescriptionInputs.ViewSpacePosition", "VertexDescriptionInputs.WorldSpacePosition"),
            ("VertexDescriptionInputs.WorldSpaceViewDirection", "VertexDescriptionInputs.WorldSpacePosition"),
            ("VertexDescriptionInputs.ObjectSpaceViewDirection", "VertexDescriptionInputs.WorldSpaceViewDirection"),
            ("VertexDescriptionInputs.ViewSpaceViewDirection", "VertexDescriptionInputs.WorldSpaceViewDirection"),
            ("VertexDescriptionInputs.TangentSpaceViewDirection", "VertexDescriptionInputs.WorldSpaceViewDirection"),
            ("VertexDescriptionInputs.TangentSpaceViewDirection", "VertexDescriptionInputs.WorldSpaceTangent"),
            ("VertexDescriptionInputs.TangentSpaceViewDirection", "VertexDescriptionInputs.WorldSpaceBiTangent"),
            ("VertexDescriptionInputs.TangentSpaceViewDirection", "VertexDescriptionInputs.WorldSpaceNormal"),
            ("VertexDescriptionInputs.ScreenPosition", "VertexDescriptionInputs.WorldSpacePosition"),
            ("VertexDescriptionInputs.uv0", "AttributesMesh.uv0"),
            ("VertexDescriptionInputs.uv1", "AttributesMesh.uv1"),
            ("VertexDescriptionInputs.uv2", "AttributesMesh.uv2"),
            ("VertexDescriptionInputs.uv3", "AttributesMesh.uv3"),
            ("VertexDescriptionInputs.VertexColor", "AttributesMesh.color"),
        ],
    )
}

// ─── Pass Presets ────────────────────────────────────────────────────────────

/// Stencil bits written by HD passes.
pub mod stencil_bits {
    pub const LIGHTING_MASK: u32 = 7;
    pub const DECALS_FORWARD_OUTPUT_NORMAL_BUFFER: u32 = 16;
    pub const DOESNT_RECEIVE_SSR: u32 = 32;
    pub const OBJECT_MOTION_VECTORS: u32 = 128;

    pub const NO_LIGHTING: u32 = 0;
    pub const SPLIT_LIGHTING: u32 = 1;
    pub const REGULAR_LIGHTING: u32 = 2;
}

pub const EXTRA_DEFINES_FORWARD_OPAQUE: &[&str] = &[
    "#pragma multi_compile _ DEBUG_DISPLAY",
    "#pragma multi_compile _ LIGHTMAP_ON",
    "#pragma multi_compile _ DIRLIGHTMAP_COMBINED",
    "#pragma multi_compile _ DYNAMICLIGHTMAP_ON",
    "#pragma multi_compile _ SHADOWS_SHADOWMASK",
    "#pragma multi_compile DECALS_OFF DECALS_3RT DECALS_4RT",
    "#pragma multi_compile USE_FPTL_LIGHTLIST USE_CLUSTERED_LIGHTLIST",
    "#pragma multi_compile SHADOW_LOW SHADOW_MEDIUM SHADOW_HIGH SHADOW_VERY_HIGH",
];

pub const EXTRA_DEFINES_FORWARD_TRANSPARENT: &[&str] = &[
    "#pragma multi_compile _ DEBUG_DISPLAY",
    "#pragma multi_compile _ LIGHTMAP_ON",
    "#pragma multi_compile _ DIRLIGHTMAP_COMBINED",
    "#pragma multi_compile _ DYNAMICLIGHTMAP_ON",
    "#pragma multi_compile _ SHADOWS_SHADOWMASK",
    "#pragma multi_compile DECALS_OFF DECALS_3RT DECALS_4RT",
    "#define USE_CLUSTERED_LIGHTLIST",
    "#pragma multi_compile SHADOW_LOW SHADOW_MEDIUM SHADOW_HIGH SHADOW_VERY_HIGH",
];

pub const EXTRA_DEFINES_FORWARD_MATERIAL_DEPTH_OR_MOTION: &[&str] = &[
    "#define WRITE_NORMAL_BUFFER",
    "#pragma multi_compile _ WRITE_MSAA_DEPTH",
];

pub const EXTRA_DEFINES_DEPTH_OR_MOTION: &[&str] = &[
    "#pragma multi_compile _ WRITE_NORMAL_BUFFER",
    "#pragma multi_compile _ WRITE_MSAA_DEPTH",
];

fn stencil_block(write_mask: u32, reference: u32) -> Vec<String> {
    vec![
        "// Stencil setup".to_string(),
        "Stencil".to_string(),
        "{".to_string(),
        format!("   WriteMask {write_mask}"),
        format!("   Ref  {reference}"),
        "   Comp Always".to_string(),
        "   Pass Replace".to_string(),
        "}".to_string(),
    ]
}

/// Stencil state of depth-only and motion-vector passes. `None` when no bit
/// is written.
#[must_use]
pub fn stencil_for_depth_or_motion(
    receive_decals: bool,
    receive_ssr: bool,
    object_motion_vectors: bool,
) -> Option<Vec<String>> {
    use stencil_bits::{DECALS_FORWARD_OUTPUT_NORMAL_BUFFER, DOESNT_RECEIVE_SSR, OBJECT_MOTION_VECTORS};

    let mut write_mask = DECALS_FORWARD_OUTPUT_NORMAL_BUFFER | DOESNT_RECEIVE_SSR;
    let mut reference = if receive_decals { DECALS_FORWARD_OUTPUT_NORMAL_BUFFER } else { 0 };
    if !receive_ssr {
        reference |= DOESNT_RECEIVE_SSR;
    }
    if object_motion_vectors {
        write_mask |= OBJECT_MOTION_VECTORS;
        reference |= OBJECT_MOTION_VECTORS;
    }
    (write_mask != 0).then(|| stencil_block(write_mask, reference))
}

#[must_use]
pub fn stencil_for_forward(split_lighting: bool) -> Vec<String> {
    use stencil_bits::{LIGHTING_MASK, REGULAR_LIGHTING, SPLIT_LIGHTING};
    let reference = if split_lighting { SPLIT_LIGHTING } else { REGULAR_LIGHTING };
    stencil_block(LIGHTING_MASK, reference)
}

#[must_use]
pub fn stencil_for_forward_unlit() -> Vec<String> {
    stencil_block(stencil_bits::LIGHTING_MASK, stencil_bits::NO_LIGHTING)
}

#[must_use]
pub fn stencil_for_gbuffer(receive_ssr: bool, split_lighting: bool) -> Vec<String> {
    use stencil_bits::{
        DECALS_FORWARD_OUTPUT_NORMAL_BUFFER, DOESNT_RECEIVE_SSR, LIGHTING_MASK, REGULAR_LIGHTING,
        SPLIT_LIGHTING,
    };
    let write_mask = LIGHTING_MASK | DOESNT_RECEIVE_SSR | DECALS_FORWARD_OUTPUT_NORMAL_BUFFER;
    let mut reference = if split_lighting { SPLIT_LIGHTING } else { REGULAR_LIGHTING };
    if !receive_ssr {
        reference |= DOESNT_RECEIVE_SSR;
    }
    stencil_block(write_mask, reference)
}

/// Forward pass of the built-in lit template.
#[must_use]
pub fn forward_pass(opaque: bool, pixel_slots: &[u32], vertex_slots: &[u32]) -> PassDescriptor {
    let extra = if opaque {
        EXTRA_DEFINES_FORWARD_OPAQUE
    } else {
        EXTRA_DEFINES_FORWARD_TRANSPARENT
    };
    PassDescriptor::new("Forward", "passes/Forward.template")
        .with_light_mode("Forward")
        .with_shader_pass("SHADERPASS_FORWARD")
        .with_extra_defines(extra.iter().copied())
        .with_includes([
            "#include \"Packages/com.unity.render-pipelines.high-definition/Runtime/RenderPipeline/ShaderPass/ShaderPassForward.hlsl\"",
        ])
        .with_pixel_slots(pixel_slots.iter().copied())
        .with_vertex_slots(vertex_slots.iter().copied())
        .with_required_fields([
            "FragInputs.worldToTangent",
            "FragInputs.positionRWS",
            "FragInputs.texCoord1",
            "FragInputs.texCoord2",
        ])
        .with_overrides(RenderStateOverrides {
            stencil: Some(stencil_for_forward(false)),
            ..RenderStateOverrides::default()
        })
}

/// Depth-only pass of the built-in templates.
#[must_use]
pub fn depth_only_pass(pixel_slots: &[u32], vertex_slots: &[u32]) -> PassDescriptor {
    PassDescriptor::new("DepthOnly", "passes/DepthOnly.template")
        .with_light_mode("DepthOnly")
        .with_shader_pass("SHADERPASS_DEPTH_ONLY")
        .with_extra_defines(EXTRA_DEFINES_DEPTH_OR_MOTION.iter().copied())
        .with_includes([
            "#include \"Packages/com.unity.render-pipelines.high-definition/Runtime/RenderPipeline/ShaderPass/ShaderPassDepthOnly.hlsl\"",
        ])
        .with_pixel_slots(pixel_slots.iter().copied())
        .with_vertex_slots(vertex_slots.iter().copied())
        .with_overrides(RenderStateOverrides {
            color_mask: Some("ColorMask 0".to_string()),
            stencil: stencil_for_depth_or_motion(true, true, false),
            ..RenderStateOverrides::default()
        })
}
