//! Nominal type identity for entities and services.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifies a Rust type by `TypeId`, carrying its name for diagnostics.
///
/// Equality and hashing use the `TypeId` only, so two keys match exactly
/// when they name the same type.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Returns the key for `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the fully qualified type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the type name with every module path stripped, e.g.
    /// `InvocationResult<Order>` for `my::result::InvocationResult<my::Order>`.
    #[must_use]
    pub fn short_name(&self) -> String {
        let mut short = String::with_capacity(self.name.len());
        let mut segment = String::new();

        for c in self.name.chars() {
            if c.is_alphanumeric() || c == '_' || c == ':' {
                segment.push(c);
            } else {
                short.push_str(strip_path(&segment));
                segment.clear();
                short.push(c);
            }
        }
        short.push_str(strip_path(&segment));
        short
    }
}

fn strip_path(path: &str) -> &str {
    path.rfind("::").map_or(path, |i| &path[i + 2..])
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeKey").field(&self.name).finish()
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
