//! Minimal 3D scene model.
//!
//! The engine does not own scene construction; the host application builds a
//! flat node list and a camera and hands both to the frame sequencer each
//! frame. Nodes are meshes with a translation/scale transform and a flat
//! color, which is all the pointer-follower effect needs.

mod camera;
mod mesh;
mod node;

pub use camera::Camera;
pub use mesh::{Mesh, Vertex};
pub use node::{Node, NodeId, Scene};
