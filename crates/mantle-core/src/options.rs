//! Engine configuration

/// How the engine decides whether a function needs super-dispatch wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuperDetection {
    /// Wrap functions created with the super flag (`Realm::function_with_super`)
    #[default]
    Flagged,
    /// Wrap every host function that has a same-named super member
    Always,
    /// The host offers no way to detect super usage; nothing is wrapped
    Unavailable,
}

/// Options for creating a [`Realm`](crate::Realm)
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Property name of the super-dispatch sentinel
    pub super_sentinel: String,

    /// Name of the instance initializer member
    pub initializer: String,

    /// Super-dispatch detection mode
    pub super_detection: SuperDetection,

    /// Whether the host can install accessor properties
    pub accessors: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            super_sentinel: "_super".to_string(),
            initializer: "initialize".to_string(),
            super_detection: SuperDetection::Flagged,
            accessors: true,
        }
    }
}

impl EngineOptions {
    /// Set the super sentinel name
    pub fn with_super_sentinel(mut self, name: impl Into<String>) -> Self {
        self.super_sentinel = name.into();
        self
    }

    /// Set the initializer member name
    pub fn with_initializer(mut self, name: impl Into<String>) -> Self {
        self.initializer = name.into();
        self
    }

    /// Set the super detection mode
    pub fn with_super_detection(mut self, mode: SuperDetection) -> Self {
        self.super_detection = mode;
        self
    }

    /// Declare whether accessor properties can be installed
    pub fn with_accessors(mut self, supported: bool) -> Self {
        self.accessors = supported;
        self
    }
}
