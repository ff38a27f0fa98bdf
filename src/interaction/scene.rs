//! Scene graph handed to the interaction layer.
//!
//! Decoding a GLTF into geometry is the host engine's job; this graph only
//! keeps what picking and highlighting need: node names, local transforms,
//! triangle soup per mesh and a per-mesh material.

use glam::{Mat4, Vec3};

/// Index of a node in its [`Scene`].
pub type NodeId = usize;

/// A 24-bit RGB colour, `0xRRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color(pub u32);

impl Color {
    /// No emission.
    pub const BLACK: Self = Self(0x00_00_00);
    /// Hover highlight.
    pub const HIGHLIGHT: Self = Self(0x00_ff_00);
}

/// Per-mesh material state. Each mesh owns its copy, so highlighting one
/// mesh never bleeds into another that shared a material in the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Material {
    /// Emissive colour, used for the hover highlight
    pub emissive: Color,
    /// Whether back faces are hit by rays
    pub double_sided: bool,
}

/// Triangle geometry in the node's local space.
///
/// The triangle list and its bounding box change together through
/// [`Mesh::set_triangles`]; ray casts test the box before any triangle,
/// so a stale box would hide the mesh from picking.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    triangles: Vec<[Vec3; 3]>,
    /// Material state
    pub material: Material,
    /// Whether rays may select this mesh
    pub pickable: bool,
    bounds: Option<(Vec3, Vec3)>,
}

impl Mesh {
    /// A mesh over `triangles`, not yet pickable.
    #[must_use]
    pub fn new(triangles: Vec<[Vec3; 3]>) -> Self {
        let mut mesh = Self::default();
        mesh.set_triangles(triangles);
        mesh
    }

    /// Triangles with counter-clockwise front faces.
    #[must_use]
    pub fn triangles(&self) -> &[[Vec3; 3]] {
        &self.triangles
    }

    /// Replaces the geometry and recomputes the bounding box.
    pub fn set_triangles(&mut self, triangles: Vec<[Vec3; 3]>) {
        self.bounds = triangles.iter().flatten().fold(None, |acc, &p| match acc {
            None => Some((p, p)),
            Some((min, max)) => Some((min.min(p), max.max(p))),
        });
        self.triangles = triangles;
    }

    /// An axis-aligned box centred on the origin.
    #[must_use]
    pub fn cuboid(size: Vec3) -> Self {
        let h = size * 0.5;
        let corner = |x: f32, y: f32, z: f32| Vec3::new(x * h.x, y * h.y, z * h.z);
        let faces = [
            // +Z, -Z, +X, -X, +Y, -Y; each listed counter-clockwise from outside
            [corner(-1., -1., 1.), corner(1., -1., 1.), corner(1., 1., 1.), corner(-1., 1., 1.)],
            [corner(1., -1., -1.), corner(-1., -1., -1.), corner(-1., 1., -1.), corner(1., 1., -1.)],
            [corner(1., -1., 1.), corner(1., -1., -1.), corner(1., 1., -1.), corner(1., 1., 1.)],
            [corner(-1., -1., -1.), corner(-1., -1., 1.), corner(-1., 1., 1.), corner(-1., 1., -1.)],
            [corner(-1., 1., 1.), corner(1., 1., 1.), corner(1., 1., -1.), corner(-1., 1., -1.)],
            [corner(-1., -1., -1.), corner(1., -1., -1.), corner(1., -1., 1.), corner(-1., -1., 1.)],
        ];
        let triangles = faces
            .iter()
            .flat_map(|[a, b, c, d]| [[*a, *b, *c], [*a, *c, *d]])
            .collect();
        Self::new(triangles)
    }

    /// Local-space bounding box, `None` for an empty mesh.
    #[must_use]
    pub const fn bounds(&self) -> Option<(Vec3, Vec3)> {
        self.bounds
    }
}

/// One node of the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Name from the authoring tool; may be empty
    pub name: String,
    /// Transform relative to the parent
    pub transform: Mat4,
    /// Geometry, for mesh nodes
    pub mesh: Option<Mesh>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    /// Parent node, `None` for roots.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes in insertion order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A forest of nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl Scene {
    /// An empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node under `parent` (or as a root) and returns its id.
    ///
    /// An unknown parent id makes the node a root.
    pub fn add_node(
        &mut self,
        parent: Option<NodeId>,
        name: &str,
        transform: Mat4,
        mesh: Option<Mesh>,
    ) -> NodeId {
        let id = self.nodes.len();
        let parent = parent.filter(|p| *p < id);
        self.nodes.push(Node {
            name: name.to_string(),
            transform,
            mesh,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.nodes[p].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Looks up a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Depth-first pre-order over every node, roots in insertion order.
    #[must_use]
    pub fn traverse(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children().iter().rev().copied());
        }
        order
    }

    /// The node's transform composed with all of its ancestors'.
    #[must_use]
    pub fn world_transform(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(id);
        while let Some(node) = current.and_then(|i| self.nodes.get(i)) {
            matrix = node.transform * matrix;
            current = node.parent();
        }
        matrix
    }

    /// Tags every mesh node as pickable; returns how many were tagged.
    pub fn mark_pickable(&mut self) -> usize {
        let mut count = 0;
        for node in &mut self.nodes {
            if let Some(mesh) = node.mesh.as_mut() {
                mesh.pickable = true;
                count += 1;
            }
        }
        tracing::debug!("Marked {} meshes as pickable", count);
        count
    }

    /// Sets the emissive colour of a mesh node; no-op for other nodes.
    pub fn set_emissive(&mut self, id: NodeId, color: Color) {
        if let Some(mesh) = self.nodes.get_mut(id).and_then(|n| n.mesh.as_mut()) {
            mesh.material.emissive = color;
        }
    }

    /// Emissive colour of a mesh node.
    #[must_use]
    pub fn emissive(&self, id: NodeId) -> Option<Color> {
        self.nodes
            .get(id)
            .and_then(|n| n.mesh.as_ref())
            .map(|m| m.material.emissive)
    }
}
