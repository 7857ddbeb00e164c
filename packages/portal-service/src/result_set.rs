use std::collections::BTreeMap;

use portal_domain::WorkItem;

/// Work items keyed by id. Merging never mutates in place; every union yields a new set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
	items: BTreeMap<String, WorkItem>,
}
impl ResultSet {
	/// Builds a set from a stream of items; a later item replaces an earlier one with the same id.
	pub fn from_items<I>(items: I) -> Self
	where
		I: IntoIterator<Item = WorkItem>,
	{
		items.into_iter().fold(Self::default(), |set, item| set.with(item))
	}

	/// Union by id. Entries from `other` win.
	pub fn union(self, other: Self) -> Self {
		other.items.into_values().fold(self, |set, item| set.with(item))
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &WorkItem> {
		self.items.values()
	}

	pub fn into_items(self) -> Vec<WorkItem> {
		self.items.into_values().collect()
	}

	fn with(mut self, item: WorkItem) -> Self {
		self.items.insert(item.id.clone(), item);

		self
	}
}

#[cfg(test)]
mod tests {
	use portal_domain::RelationRefs;

	use super::*;

	fn item(id: &str, title: &str) -> WorkItem {
		WorkItem {
			id: id.to_string(),
			title: title.to_string(),
			status: "Open".to_string(),
			progress: None,
			due_date: None,
			subject_refs: RelationRefs::empty(),
			sub_entity_refs: RelationRefs::empty(),
		}
	}

	#[test]
	fn union_dedups_by_id_and_keeps_last_seen() {
		let first = ResultSet::from_items([item("a", "old"), item("b", "b")]);
		let second = ResultSet::from_items([item("a", "new"), item("c", "c")]);
		let merged = first.clone().union(second);

		assert_eq!(merged.len(), 3);
		assert_eq!(first.len(), 2);
		assert_eq!(merged.iter().find(|item| item.id == "a").map(|item| item.title.as_str()), Some("new"));
	}

	#[test]
	fn union_with_empty_is_identity() {
		let set = ResultSet::from_items([item("a", "a")]);

		assert_eq!(set.clone().union(ResultSet::default()), set);
		assert_eq!(ResultSet::default().union(set.clone()), set);
	}
}
