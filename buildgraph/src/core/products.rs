//! Ordered, deduplicating list of build products.

use serde::{Deserialize, Serialize};

/// The products a node produced, as ordered path-like identifiers.
///
/// Insertion order is preserved and duplicates are dropped, so the list a
/// dependent node observes is deterministic for a given execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildProducts {
    items: Vec<String>,
}

impl BuildProducts {
    /// Creates an empty product list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a product, keeping the first occurrence. Returns true if it was
    /// not already present.
    pub fn add(&mut self, product: impl Into<String>) -> bool {
        let product = product.into();
        if self.items.contains(&product) {
            false
        } else {
            self.items.push(product);
            true
        }
    }

    /// Adds every product from `other`, preserving order and dropping
    /// duplicates.
    pub fn extend_from(&mut self, other: &Self) {
        for product in &other.items {
            self.add(product.clone());
        }
    }

    /// Removes every product that also appears in `other`.
    ///
    /// Used after a build to strip products that were actually introduced by
    /// dependencies, so a node only claims what it produced itself.
    pub fn remove_overlapping(&mut self, other: &Self) {
        self.items.retain(|p| !other.items.contains(p));
    }

    /// Returns true if the product appears in the list.
    #[must_use]
    pub fn contains(&self, product: &str) -> bool {
        self.items.iter().any(|p| p == product)
    }

    /// Returns true if there are no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Iterates over the products in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.items.iter()
    }

    /// Returns the products as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.items
    }

    /// Consumes the list, returning the underlying vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.items
    }
}

impl<S: Into<String>> FromIterator<S> for BuildProducts {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut products = Self::new();
        for item in iter {
            products.add(item);
        }
        products
    }
}

impl<'a> IntoIterator for &'a BuildProducts {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
