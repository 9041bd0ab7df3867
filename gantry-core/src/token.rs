// Injection tokens for the Gantry DI container

use once_cell::sync::Lazy;
use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_UNIQUE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a provider in the DI container.
///
/// A token is either a type (the class-constructor analog), a name, or a
/// unique value (the symbol analog). Equality is identity: two `Type` tokens
/// match iff their `TypeId`s match, two `Name` tokens iff their strings match,
/// and two `Unique` tokens iff they came from the same [`Token::unique`] call
/// regardless of their tag text.
#[derive(Clone, Debug)]
pub enum Token {
    /// A type token, keyed by `TypeId`.
    Type {
        id: TypeId,
        name: &'static str,
    },
    /// A named token.
    Name(Cow<'static, str>),
    /// A unique token; the tag is for diagnostics only.
    Unique {
        id: u64,
        tag: &'static str,
    },
}

impl Token {
    /// Token for a concrete type.
    pub fn of<T: 'static>() -> Self {
        Token::Type {
            id: TypeId::of::<T>(),
            name: short_type_name::<T>(),
        }
    }

    /// Token identified by a string name.
    pub fn name(name: impl Into<Cow<'static, str>>) -> Self {
        Token::Name(name.into())
    }

    /// A fresh unique token. Two calls with the same tag produce distinct
    /// tokens.
    pub fn unique(tag: &'static str) -> Self {
        Token::Unique {
            id: NEXT_UNIQUE_ID.fetch_add(1, Ordering::Relaxed),
            tag,
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Token::Type { id: a, .. }, Token::Type { id: b, .. }) => a == b,
            (Token::Name(a), Token::Name(b)) => a == b,
            (Token::Unique { id: a, .. }, Token::Unique { id: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Token::Type { id, .. } => {
                0u8.hash(state);
                id.hash(state);
            }
            Token::Name(name) => {
                1u8.hash(state);
                name.hash(state);
            }
            Token::Unique { id, .. } => {
                2u8.hash(state);
                id.hash(state);
            }
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Type { name, .. } => write!(f, "{}", name),
            Token::Name(name) => write!(f, "{}", name),
            Token::Unique { id, tag } => write!(f, "{}#{}", tag, id),
        }
    }
}

/// Last path segment of a type name, for logs and error messages.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Token under which the configuration service is registered, resolved
/// tolerantly during bootstrap.
pub static CONFIG_SERVICE: Lazy<Token> = Lazy::new(|| Token::unique("gantry:config:service"));

/// Token under which the platform driver handle is registered at bootstrap.
pub static PLATFORM_DRIVER: Lazy<Token> = Lazy::new(|| Token::unique("gantry:platform:driver"));

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct ServiceA;
    struct ServiceB;

    #[test]
    fn test_type_tokens_compare_by_type() {
        assert_eq!(Token::of::<ServiceA>(), Token::of::<ServiceA>());
        assert_ne!(Token::of::<ServiceA>(), Token::of::<ServiceB>());
    }

    #[test]
    fn test_name_tokens_compare_by_value() {
        assert_eq!(Token::name("db"), Token::name("db".to_string()));
        assert_ne!(Token::name("db"), Token::name("cache"));
    }

    #[test]
    fn test_unique_tokens_are_distinct_even_with_same_tag() {
        let a = Token::unique("session");
        let b = Token::unique("session");
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn test_variants_never_cross_match() {
        assert_ne!(Token::name("ServiceA"), Token::of::<ServiceA>());
        assert_ne!(Token::name("x"), Token::unique("x"));
    }

    #[test]
    fn test_tokens_usable_as_map_keys() {
        let mut set = HashSet::new();
        set.insert(Token::of::<ServiceA>());
        set.insert(Token::name("db"));
        assert!(set.contains(&Token::of::<ServiceA>()));
        assert!(set.contains(&Token::name("db")));
        assert!(!set.contains(&Token::of::<ServiceB>()));
    }

    #[test]
    fn test_display() {
        assert_eq!(Token::of::<ServiceA>().to_string(), "ServiceA");
        assert_eq!(Token::name("db").to_string(), "db");
        assert!(Token::unique("cfg").to_string().starts_with("cfg#"));
    }
}
