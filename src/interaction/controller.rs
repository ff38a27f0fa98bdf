//! Hover and click handling driven once per frame by the host.

use tracing::debug;

use super::{
    ray::{Camera, Pointer, intersect_scene},
    scene::{Color, NodeId, Scene},
};
use crate::models::MeshActionConfig;

/// Label used in the admin view for meshes without a name.
pub const UNNAMED_PART: &str = "Unnamed part";

/// Which page the scene is shown on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// End-user showroom; only configured meshes react
    User,
    /// Admin editor; every pickable mesh reacts
    Admin,
}

/// Cursor the host should display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// Nothing interactive under the pointer
    Default,
    /// A hoverable mesh is under the pointer
    Pointer,
}

/// What a click asks the host to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionEvent {
    /// Show a text alert
    Alert {
        /// Alert text
        message: String,
    },
    /// Open the configuration panel for a mesh
    EditConfig {
        /// Mesh name, or [`UNNAMED_PART`]
        mesh: String,
    },
}

/// Hover and click state for one viewer.
#[derive(Debug, Clone)]
pub struct InteractionController {
    mode: ViewMode,
    config: MeshActionConfig,
    camera: Camera,
    hovered: Option<NodeId>,
}

impl InteractionController {
    /// A controller with the default camera and nothing hovered.
    #[must_use]
    pub fn new(mode: ViewMode, config: MeshActionConfig) -> Self {
        Self {
            mode,
            config,
            camera: Camera::default(),
            hovered: None,
        }
    }

    /// Replaces the camera.
    #[must_use]
    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = camera;
        self
    }

    /// Currently hovered mesh.
    #[must_use]
    pub const fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    fn nearest(&self, scene: &Scene, pointer: Pointer) -> Option<(NodeId, String)> {
        let ray = self.camera.ray(pointer);
        let hit = intersect_scene(scene, &ray).into_iter().next()?;
        let name = scene.node(hit.node)?.name.clone();
        Some((hit.node, name))
    }

    fn hoverable(&self, name: &str) -> bool {
        match self.mode {
            ViewMode::Admin => true,
            ViewMode::User => self
                .config
                .get(name)
                .and_then(|action| action.hover_action())
                .is_some(),
        }
    }

    /// Updates hover state for this frame. `None` means the pointer left
    /// the viewport.
    pub fn on_frame(&mut self, scene: &mut Scene, pointer: Option<Pointer>) -> Cursor {
        let target = pointer
            .and_then(|p| self.nearest(scene, p))
            .filter(|(_, name)| self.hoverable(name))
            .map(|(id, _)| id);

        if target != self.hovered {
            if let Some(previous) = self.hovered {
                scene.set_emissive(previous, Color::BLACK);
            }
            if let Some(current) = target {
                scene.set_emissive(current, Color::HIGHLIGHT);
            }
            debug!("Hover changed from {:?} to {:?}", self.hovered, target);
            self.hovered = target;
        }

        if target.is_some() {
            Cursor::Pointer
        } else {
            Cursor::Default
        }
    }

    /// Resolves a click at `pointer` into an event, if any.
    #[must_use]
    pub fn on_click(&self, scene: &Scene, pointer: Pointer) -> Option<InteractionEvent> {
        let (_, name) = self.nearest(scene, pointer)?;
        match self.mode {
            ViewMode::User => {
                let click = self.config.get(&name)?.click_action()?;
                Some(InteractionEvent::Alert {
                    message: format!("Clicked on {name}: {click}"),
                })
            }
            ViewMode::Admin => Some(InteractionEvent::EditConfig {
                mesh: if name.is_empty() {
                    UNNAMED_PART.to_string()
                } else {
                    name
                },
            }),
        }
    }
}
