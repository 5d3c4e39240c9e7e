//! Member key parsing
//!
//! A textual key is a run of delimiter-separated segments; the last segment
//! is the member name and every earlier segment is a modifier token. An
//! empty modifier segment is the static shorthand, so `$count` and
//! `static$count` mean the same thing.

use std::fmt;

/// A member modifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Modifier {
    /// Installed on the class rather than its prototype
    Static,
    /// Getter half of an accessor
    Get,
    /// Setter half of an accessor
    Set,
    /// Rebound to its receiver (per instance for instance members)
    Bind,
    /// Unrecognized token, kept verbatim (uppercased)
    Other(String),
}

impl Modifier {
    /// Classify one modifier token
    pub fn from_token(token: &str) -> Self {
        if token.is_empty() {
            return Modifier::Static;
        }
        match token.to_ascii_lowercase().as_str() {
            "static" => Modifier::Static,
            "get" => Modifier::Get,
            "set" => Modifier::Set,
            "bind" => Modifier::Bind,
            _ => Modifier::Other(token.to_ascii_uppercase()),
        }
    }

    /// Canonical token text
    pub fn token(&self) -> &str {
        match self {
            Modifier::Static => "static",
            Modifier::Get => "get",
            Modifier::Set => "set",
            Modifier::Bind => "bind",
            Modifier::Other(token) => token,
        }
    }
}

/// A member name plus its modifiers
///
/// Produced by [`MemberKey::parse`] from a textual key, or built directly:
///
/// ```rust,ignore
/// let key = MemberKey::new("count").static_member().getter();
/// assert_eq!(key.to_key('$'), "static$get$count");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemberKey {
    /// Member name (empty for standalone declarations)
    pub name: String,
    /// Modifiers in declaration order, without repeats
    pub modifiers: Vec<Modifier>,
}

impl MemberKey {
    /// Create a plain instance member key
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiers: Vec::new(),
        }
    }

    /// Parse a textual key
    pub fn parse(key: &str, delimiter: char) -> Self {
        let mut segments: Vec<&str> = key.split(delimiter).collect();
        let name = segments.pop().unwrap_or_default().to_string();
        let mut parsed = Self::new(name);
        for segment in segments {
            parsed.push(Modifier::from_token(segment));
        }
        parsed
    }

    fn push(&mut self, modifier: Modifier) {
        if !self.modifiers.contains(&modifier) {
            self.modifiers.push(modifier);
        }
    }

    /// Add a modifier
    pub fn with(mut self, modifier: Modifier) -> Self {
        self.push(modifier);
        self
    }

    /// Mark as static
    pub fn static_member(self) -> Self {
        self.with(Modifier::Static)
    }

    /// Mark as a getter
    pub fn getter(self) -> Self {
        self.with(Modifier::Get)
    }

    /// Mark as a setter
    pub fn setter(self) -> Self {
        self.with(Modifier::Set)
    }

    /// Mark as bound
    pub fn bound(self) -> Self {
        self.with(Modifier::Bind)
    }

    /// Check for a modifier
    pub fn has(&self, modifier: &Modifier) -> bool {
        self.modifiers.contains(modifier)
    }

    /// Static member?
    pub fn is_static(&self) -> bool {
        self.has(&Modifier::Static)
    }

    /// Name-less key (superclass / initializer declarations)
    pub fn is_standalone(&self) -> bool {
        self.name.is_empty()
    }

    /// Render back into textual form
    pub fn to_key(&self, delimiter: char) -> String {
        let mut key = String::new();
        for modifier in &self.modifiers {
            key.push_str(modifier.token());
            key.push(delimiter);
        }
        key.push_str(&self.name);
        key
    }
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_key('$'))
    }
}
