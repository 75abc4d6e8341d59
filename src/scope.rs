use crate::{Error, Result};

/// Terminates a scope prefix inside a physical key.
pub const SEPARATOR: char = '!';

/// A named logical database and the prefix its keys live under.
///
/// The prefix is the name with every `!` doubled, followed by a single `!`.
/// Encoded keys never contain `!`, so a physical key belongs to a scope only
/// when it starts with the scope's prefix and the remainder holds no `!` at
/// all. That second check keeps `"bang!"` (prefix `bang!!!`) from claiming
/// keys written under `"bang!!"` (prefix `bang!!!!!`).
///
/// # Example
///
/// ```
/// # use scoped_webstore::Scope;
/// let scope = Scope::named("bang!").unwrap();
/// assert_eq!(scope.prefix(), "bang!!!");
/// assert_eq!(scope.physical_key("PqKt"), "bang!!!PqKt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    name: String,
    prefix: String,
}

impl Scope {
    /// Create a scope from a database name.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if the name is empty.
    pub fn named(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidArgument(
                "database name must be a non-empty string".into(),
            ));
        }

        let mut prefix = name.replace(SEPARATOR, "!!");
        prefix.push(SEPARATOR);
        Ok(Self {
            name: name.to_owned(),
            prefix,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The escaped name plus terminator.
    #[inline]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Physical key for an already encoded logical key.
    #[inline]
    pub fn physical_key(&self, encoded_key: &str) -> String {
        let mut key = String::with_capacity(self.prefix.len() + encoded_key.len());
        key.push_str(&self.prefix);
        key.push_str(encoded_key);
        key
    }

    /// Strip this scope's prefix from a physical key.
    ///
    /// Returns `None` when the key belongs to another scope or to something
    /// that is not a scoped store at all.
    #[inline]
    pub fn strip<'a>(&self, physical_key: &'a str) -> Option<&'a str> {
        physical_key
            .strip_prefix(self.prefix.as_str())
            .filter(|encoded| !encoded.contains(SEPARATOR))
    }

    /// Whether a physical key belongs to this scope.
    #[inline]
    pub fn owns(&self, physical_key: &str) -> bool {
        self.strip(physical_key).is_some()
    }
}

impl TryFrom<&str> for Scope {
    type Error = Error;

    fn try_from(name: &str) -> Result<Self> {
        Self::named(name)
    }
}
