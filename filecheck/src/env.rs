use crate::common::*;

/// The value bound to a pattern variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// The text matched by the defining placeholder, or given on the command line
    pub value: String,
    /// The index of the directive which produced this binding, or `None` if it
    /// was defined on the command line
    pub defined_at: Option<usize>,
}

/// The variable table for a single verification run.
///
/// Bindings are never removed during a run; defining a name which is already
/// bound replaces the previous binding.
#[derive(Debug, Default, Clone)]
pub struct Env {
    bindings: FxHashMap<Box<str>, Binding>,
}
impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table seeded with the `-D NAME=VALUE` definitions in `config`
    pub fn from_config(config: &Config) -> Self {
        let mut env = Self::new();
        for var in config.variables.iter() {
            env.define(&var.name, var.value.as_str(), None);
        }
        env
    }

    /// Bind `name` to `value`, replacing any existing binding
    pub fn define(&mut self, name: &str, value: impl Into<String>, defined_at: Option<usize>) {
        let value = value.into();
        log::trace!(target: "goldcheck::env", "binding '{name}' = {value:?}");
        let binding = Binding { value, defined_at };
        match self.bindings.get_mut(name) {
            Some(existing) => *existing = binding,
            None => {
                self.bindings.insert(Box::from(name), binding);
            }
        }
    }

    /// Get the text currently bound to `name`
    #[inline]
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(|binding| binding.value.as_str())
    }

    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterate over all bindings, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> + '_ {
        self.bindings.iter().map(|(name, binding)| (&**name, binding))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn env_redefinition_overwrites() {
        let mut env = Env::new();
        assert_eq!(env.resolve("X"), None);
        env.define("X", "42", Some(0));
        assert_eq!(env.resolve("X"), Some("42"));
        env.define("X", "43", Some(3));
        assert_eq!(env.resolve("X"), Some("43"));
        assert_eq!(env.binding("X").and_then(|b| b.defined_at), Some(3));
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn env_seeded_from_command_line() {
        let config = Config::default().define("INT", "i64");
        let env = Env::from_config(&config);
        assert_eq!(env.resolve("INT"), Some("i64"));
        assert_eq!(env.binding("INT").unwrap().defined_at, None);
    }
}
