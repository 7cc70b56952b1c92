use glam::{Mat4, Vec3};

use super::mesh::Mesh;

/// Stable identifier for a node within one `Scene`.
///
/// Nodes are never removed, so indices stay valid for the scene's lifetime.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) usize);

/// A drawable scene node: mesh + transform + flat color.
#[derive(Debug, Clone)]
pub struct Node {
    pub mesh: Mesh,
    pub translation: Vec3,
    pub scale: Vec3,
    pub color: [f32; 4],
    pub visible: bool,
}

impl Node {
    pub fn new(mesh: Mesh) -> Self {
        Self {
            mesh,
            translation: Vec3::ZERO,
            scale: Vec3::ONE,
            color: [1.0, 1.0, 1.0, 1.0],
            visible: true,
        }
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    pub fn model(&self) -> Mat4 {
        Mat4::from_translation(self.translation) * Mat4::from_scale(self.scale)
    }
}

/// Flat list of nodes; insertion order is draw order.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<Node>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates nodes with their ids, in draw order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_returns_stable_ids() {
        let mut scene = Scene::new();
        let a = scene.push(Node::new(Mesh::plane(1.0, 1.0)));
        let b = scene.push(Node::new(Mesh::plane(1.0, 1.0)).with_scale(2.0));

        assert_ne!(a, b);
        scene.node_mut(a).translation = Vec3::new(1.0, 0.0, 0.0);
        assert_eq!(scene.node(a).translation.x, 1.0);
        assert_eq!(scene.node(b).scale, Vec3::splat(2.0));
    }

    #[test]
    fn model_applies_scale_then_translation() {
        let mut node = Node::new(Mesh::plane(1.0, 1.0)).with_scale(2.0);
        node.translation = Vec3::new(3.0, 0.0, 0.0);

        let p = node.model().project_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!((p.x - 5.0).abs() < 1e-6);
    }
}
