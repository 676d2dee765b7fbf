//! Graph Requirements
//!
//! Aggregated data needs of a group of nodes: coordinate spaces per vector
//! kind, mesh UV channels and a handful of boolean inputs. Unions are
//! field-wise ORs, so aggregation is associative, commutative and idempotent.

use bitflags::bitflags;

use crate::graph::MaterialGraph;
use crate::node::NodeId;

bitflags! {
    /// Coordinate spaces in which a vector input is needed.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct NeededSpace: u8 {
        const OBJECT  = 1 << 0;
        const VIEW    = 1 << 1;
        const WORLD   = 1 << 2;
        const TANGENT = 1 << 3;
    }
}

bitflags! {
    /// Mesh UV channels read by a node.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct UvChannels: u8 {
        const UV0 = 1 << 0;
        const UV1 = 1 << 1;
        const UV2 = 1 << 2;
        const UV3 = 1 << 3;
    }
}

impl NeededSpace {
    /// Field-name prefixes in canonical order.
    const PREFIXES: [(Self, &'static str); 4] = [
        (Self::OBJECT, "ObjectSpace"),
        (Self::VIEW, "ViewSpace"),
        (Self::WORLD, "WorldSpace"),
        (Self::TANGENT, "TangentSpace"),
    ];
}

impl UvChannels {
    const NAMES: [(Self, &'static str); 4] = [
        (Self::UV0, "uv0"),
        (Self::UV1, "uv1"),
        (Self::UV2, "uv2"),
        (Self::UV3, "uv3"),
    ];

    /// Returns the flag for channel `index` (0..=3), `None` otherwise.
    #[must_use]
    pub fn channel(index: u32) -> Option<Self> {
        Self::NAMES.get(index as usize).map(|(flag, _)| *flag)
    }
}

/// Shader stage a requirement set is evaluated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

/// Structured bag of data requirements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Requirements {
    pub normal: NeededSpace,
    pub tangent: NeededSpace,
    pub bitangent: NeededSpace,
    pub view_dir: NeededSpace,
    pub position: NeededSpace,
    pub uv: UvChannels,
    pub screen_position: bool,
    pub vertex_color: bool,
    pub face_sign: bool,
    pub depth_texture: bool,
    pub opaque_texture: bool,
}

impl Requirements {
    /// No requirements.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Field-wise union.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut out = *self;
        out.union_with(other);
        out
    }

    pub fn union_with(&mut self, other: &Self) {
        self.normal |= other.normal;
        self.tangent |= other.tangent;
        self.bitangent |= other.bitangent;
        self.view_dir |= other.view_dir;
        self.position |= other.position;
        self.uv |= other.uv;
        self.screen_position |= other.screen_position;
        self.vertex_color |= other.vertex_color;
        self.face_sign |= other.face_sign;
        self.depth_texture |= other.depth_texture;
        self.opaque_texture |= other.opaque_texture;
    }

    /// Union of the requirements of `nodes`. Ids missing from the graph are ignored.
    #[must_use]
    pub fn from_nodes(graph: &MaterialGraph, nodes: &[NodeId]) -> Self {
        nodes
            .iter()
            .filter_map(|&id| graph.node(id))
            .fold(Self::default(), |acc, node| acc.union(node.requirements()))
    }

    /// Calls `f` with the unqualified input-struct field name of every
    /// requirement that maps to a field for `stage`.
    ///
    /// Spatial kinds map to `<Space>Space<Kind>`, UV channels to `uvN`.
    /// `FaceSign` only exists for the pixel stage. Texture requirements map
    /// to defines, not fields.
    pub fn for_each_field(&self, stage: ShaderStage, mut f: impl FnMut(&str)) {
        if self.screen_position {
            f("ScreenPosition");
        }
        if self.vertex_color {
            f("VertexColor");
        }
        if self.face_sign && stage == ShaderStage::Pixel {
            f("FaceSign");
        }

        let spatial = [
            (self.normal, "Normal"),
            (self.tangent, "Tangent"),
            (self.bitangent, "BiTangent"),
            (self.view_dir, "ViewDirection"),
            (self.position, "Position"),
        ];
        let mut name = String::with_capacity(32);
        for (spaces, kind) in spatial {
            for (flag, prefix) in NeededSpace::PREFIXES {
                if spaces.contains(flag) {
                    name.clear();
                    name.push_str(prefix);
                    name.push_str(kind);
                    f(&name);
                }
            }
        }

        for (flag, uv) in UvChannels::NAMES {
            if self.uv.contains(flag) {
                f(uv);
            }
        }
    }

    // ─── Builder helpers ─────────────────────────────────────────────────────

    #[must_use]
    pub fn with_normal(mut self, space: NeededSpace) -> Self {
        self.normal |= space;
        self
    }

    #[must_use]
    pub fn with_tangent(mut self, space: NeededSpace) -> Self {
        self.tangent |= space;
        self
    }

    #[must_use]
    pub fn with_bitangent(mut self, space: NeededSpace) -> Self {
        self.bitangent |= space;
        self
    }

    #[must_use]
    pub fn with_view_dir(mut self, space: NeededSpace) -> Self {
        self.view_dir |= space;
        self
    }

    #[must_use]
    pub fn with_position(mut self, space: NeededSpace) -> Self {
        self.position |= space;
        self
    }

    #[must_use]
    pub fn with_uv(mut self, channels: UvChannels) -> Self {
        self.uv |= channels;
        self
    }

    #[must_use]
    pub fn with_screen_position(mut self) -> Self {
        self.screen_position = true;
        self
    }

    #[must_use]
    pub fn with_vertex_color(mut self) -> Self {
        self.vertex_color = true;
        self
    }

    #[must_use]
    pub fn with_face_sign(mut self) -> Self {
        self.face_sign = true;
        self
    }

    #[must_use]
    pub fn with_depth_texture(mut self) -> Self {
        self.depth_texture = true;
        self
    }

    #[must_use]
    pub fn with_opaque_texture(mut self) -> Self {
        self.opaque_texture = true;
        self
    }
}
