//! 3D architecture diagram editor: the engine plus its canvas and panels.

pub mod camera;
mod component;
pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod flow;
pub mod geometry;
pub mod graph;
pub mod interaction;
mod panels;
pub mod registry;
mod render;
pub mod scene;
pub mod types;

pub use component::ArchSceneCanvas;
pub use config::SceneConfig;
pub use editor::{FrameTask, SceneEditor};
pub use error::{ConnectionRejected, EditorError};
pub use panels::{DocumentPanel, Inspector, Palette, Toolbar, TypeEditor};
