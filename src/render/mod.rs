//! High-quality rendering through an external renderer.

pub mod backend;
pub mod color;
pub mod controller;
pub mod request;

pub use backend::{HttpRenderBackend, RenderBackend, RenderedImage};
pub use color::{CieLabConverter, ColorConverter};
pub use controller::{Overlay, RenderCompletion, RenderPhase, RenderRequestController, RenderTicket};
pub use request::{RenderRequest, SceneElement, TranslateXz};
