//! Type-safe extensions for Request
//!
//! Units use extensions to hand typed values to later stages of the same
//! walk (the authenticated user, a deadline, a session).

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Type-keyed storage owned by a single request
#[derive(Default)]
pub struct Extensions {
	map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
	/// Create an empty extension map
	///
	/// # Examples
	///
	/// ```
	/// use strand_http::Extensions;
	///
	/// let extensions = Extensions::new();
	/// assert!(!extensions.contains::<String>());
	/// ```
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert a value, returning the previous value of the same type
	///
	/// # Examples
	///
	/// ```
	/// use strand_http::Extensions;
	///
	/// let mut extensions = Extensions::new();
	/// assert_eq!(extensions.insert(1u32), None);
	/// assert_eq!(extensions.insert(2u32), Some(1));
	/// ```
	pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
		self.map
			.insert(TypeId::of::<T>(), Box::new(value))
			.and_then(|previous| previous.downcast::<T>().ok())
			.map(|previous| *previous)
	}

	/// Borrow a value by type
	///
	/// # Examples
	///
	/// ```
	/// use strand_http::Extensions;
	///
	/// let mut extensions = Extensions::new();
	/// extensions.insert("hello".to_string());
	///
	/// assert_eq!(extensions.get::<String>().map(String::as_str), Some("hello"));
	/// assert!(extensions.get::<u32>().is_none());
	/// ```
	pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
		self.map
			.get(&TypeId::of::<T>())
			.and_then(|boxed| boxed.downcast_ref::<T>())
	}

	/// Mutably borrow a value by type
	pub fn get_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
		self.map
			.get_mut(&TypeId::of::<T>())
			.and_then(|boxed| boxed.downcast_mut::<T>())
	}

	/// Check if a value of the given type exists
	pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
		self.map.contains_key(&TypeId::of::<T>())
	}

	/// Remove a value from extensions and return it
	pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
		self.map
			.remove(&TypeId::of::<T>())
			.and_then(|boxed| boxed.downcast::<T>().ok())
			.map(|value| *value)
	}

	/// Number of stored values
	pub fn len(&self) -> usize {
		self.map.len()
	}

	/// Whether no values are stored
	pub fn is_empty(&self) -> bool {
		self.map.is_empty()
	}
}

impl std::fmt::Debug for Extensions {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Extensions")
			.field("len", &self.map.len())
			.finish()
	}
}
