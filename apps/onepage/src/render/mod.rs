// Stage 2: blocks + style sheet → WordprocessingML model → .docx package.
// Rendering has no side effects; nothing touches disk until `write_to`.

pub mod docx;
pub mod model;
pub mod package;
pub mod style;

pub use docx::render;
pub use package::RenderError;
pub use style::{Margins, StyleConfig};
