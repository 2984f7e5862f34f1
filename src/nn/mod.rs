pub mod dense;
pub mod gradients;
pub mod mlp;

pub use dense::{Layer, LayerGradients};
pub use gradients::GradientSet;
pub use mlp::{Mlp, MlpGradients};
