//! Interned string identifiers for regions, materials and reactor types.
use anyhow::{Result, anyhow};
use indexmap::IndexSet;
use std::borrow::Borrow;
use std::hash::Hash;

/// Declare a cheaply cloneable identifier type wrapping a shared string.
///
/// The generated type can be looked up in sets by `&str` and read directly from TOML.
macro_rules! define_id_type {
    ($name:ident) => {
        #[doc = concat!("Identifier for a `", stringify!($name), "`")]
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            std::hash::Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(std::rc::Rc<str>);

        impl $name {
            /// Wrap `id` as an identifier
            pub fn new(id: &str) -> Self {
                Self(id.into())
            }

            /// The identifier as a plain string
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.as_str()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id.into())
            }
        }
    };
}
pub(crate) use define_id_type;

/// A set of known identifiers which user-supplied names are checked against
pub trait IDCollection<ID> {
    /// Find the identifier spelled `id`, failing if it is not part of the set
    fn get_id_by_str(&self, id: &str) -> Result<ID>;
}

impl<ID> IDCollection<ID> for IndexSet<ID>
where
    ID: Borrow<str> + Clone + Eq + Hash,
{
    fn get_id_by_str(&self, id: &str) -> Result<ID> {
        self.get(id)
            .cloned()
            .ok_or_else(|| anyhow!("Unknown ID {id} found"))
    }
}
