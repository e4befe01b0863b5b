/// Read-only view of environment variables.
///
/// Resolution code takes this instead of calling `std::env::var` so CI
/// scenarios can be tested without mutating the process environment.
pub trait Environment {
    fn var(&self, key: &str) -> Option<String>;

    /// Like [`Environment::var`], but treats blank values as unset.
    fn non_empty(&self, key: &str) -> Option<String> {
        self.var(key).filter(|v| !v.trim().is_empty())
    }

    fn is_true(&self, key: &str) -> bool {
        self.var(key)
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
    }
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory environment, used by tests.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MapEnv {
    vars: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl Environment for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

#[cfg(test)]
impl<'a> FromIterator<(&'a str, &'a str)> for MapEnv {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}
