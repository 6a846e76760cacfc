//! Ordered release of Vulkan objects.
use std::fmt;

/// Releases what was acquired, last in first out.
///
/// Push a release step right after each successful acquisition. Dropping the
/// stack, whether at shutdown or on an early return, runs the steps in
/// reverse.
#[derive(Default)]
pub struct ReleaseStack {
    steps: Vec<(&'static str, Box<dyn FnOnce()>)>,
}

impl ReleaseStack {
    /// An empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `release` to run before everything pushed earlier.
    pub fn push(&mut self, name: &'static str, release: impl FnOnce() + 'static) {
        self.steps.push((name, Box::new(release)));
    }

    /// Names of the pending steps, oldest first.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.steps.iter().map(|&(name, _)| name)
    }

    /// Number of pending release steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs all pending steps, newest first.
    pub fn release_all(&mut self) {
        while let Some((name, release)) = self.steps.pop() {
            log::debug!("releasing {}", name);
            release();
        }
    }
}

impl Drop for ReleaseStack {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl fmt::Debug for ReleaseStack {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_list()
            .entries(self.steps.iter().map(|(name, _)| name))
            .finish()
    }
}
