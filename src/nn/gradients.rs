use crate::math::matrix::Matrix;

/// Gradients for every registered trainable parameter, in registration order.
///
/// A parameter the loss does not depend on has a `None` gradient. It is
/// carried through clipping untouched and the optimizer leaves the
/// parameter alone.
#[derive(Debug, Clone, Default)]
pub struct GradientSet {
    entries: Vec<(String, Option<Matrix>)>,
}

impl GradientSet {
    /// Lines computed gradients up with the registered parameter names.
    /// Several contributions to the same parameter are summed.
    pub fn collect<I>(names: I, computed: Vec<(String, Matrix)>) -> GradientSet
    where
        I: IntoIterator<Item = String>,
    {
        let mut entries: Vec<(String, Option<Matrix>)> =
            names.into_iter().map(|n| (n, None)).collect();

        for (name, grad) in computed {
            if let Some((_, slot)) = entries.iter_mut().find(|(n, _)| *n == name) {
                *slot = Some(match slot.take() {
                    Some(acc) => acc + grad,
                    None => grad,
                });
            } else {
                log::warn!("dropping gradient for unregistered parameter {}", name);
            }
        }

        GradientSet { entries }
    }

    /// Clips each present gradient to `max_norm` independently.
    pub fn clip_by_norm(self, max_norm: f64) -> GradientSet {
        GradientSet {
            entries: self.entries.into_iter()
                .map(|(name, grad)| {
                    let clipped = grad.map(|g| g.clip_by_norm(max_norm));
                    (name, clipped)
                })
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Matrix> {
        self.entries.iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, g)| g.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Matrix>)> {
        self.entries.iter().map(|(n, g)| (n.as_str(), g.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
