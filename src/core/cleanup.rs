use std::fmt;
use std::sync::Arc;

/// The opaque operation behind a cleanup type. It either succeeds or reports
/// why it could not finish.
pub type Action = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

#[derive(Clone)]
pub struct CleanupType {
    pub name: String,
    pub action: Action,
    pub requires_confirmation: bool,
    pub requires_root: bool,
}

impl CleanupType {
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            action: Arc::new(action),
            requires_confirmation: false,
            requires_root: false,
        }
    }

    pub fn confirm(mut self, requires_confirmation: bool) -> Self {
        self.requires_confirmation = requires_confirmation;
        self
    }

    pub fn root(mut self, requires_root: bool) -> Self {
        self.requires_root = requires_root;
        self
    }
}

impl fmt::Debug for CleanupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupType")
            .field("name", &self.name)
            .field("requires_confirmation", &self.requires_confirmation)
            .field("requires_root", &self.requires_root)
            .finish_non_exhaustive()
    }
}
