//! Viewer-side interaction: scene graph, picking rays and the hover/click
//! controller. Pure state; the host renders and feeds it pointer input.

pub mod controller;
pub mod ray;
pub mod scene;

pub use controller::{Cursor, InteractionController, InteractionEvent, UNNAMED_PART, ViewMode};
pub use ray::{Camera, Intersection, Pointer, Ray, intersect_scene};
pub use scene::{Color, Material, Mesh, Node, NodeId, Scene};
