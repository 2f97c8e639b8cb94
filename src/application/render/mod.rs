pub mod composer;
pub mod compositor;
pub mod font;
pub mod legend;

pub use composer::ResultComposer;
pub use compositor::{Composite, MaskCompositor, MaskLayer};
pub use legend::LegendRenderer;
