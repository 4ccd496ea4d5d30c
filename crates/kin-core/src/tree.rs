//! Ancestry forest reconstruction for a clan.
//!
//! The forest is rebuilt from parent links on every request. A root is any
//! clan member with no recorded mother and no recorded father; each node's
//! children are the clan members naming it as mother or father.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::{
  Error, Result,
  person::{Person, PersonId},
};

/// A person with their descendants nested beneath them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
  #[serde(flatten)]
  pub person:   Person,
  pub children: Vec<TreeNode>,
}

/// Assemble the forest for `clan` from its `members`.
///
/// Roots and children are ordered by id ascending. Fails with
/// [`Error::ClanNotFound`] when `members` is empty.
pub fn build_forest(clan: &str, members: Vec<Person>) -> Result<Vec<TreeNode>> {
  if members.is_empty() {
    return Err(Error::ClanNotFound(clan.to_owned()));
  }

  let by_id: BTreeMap<PersonId, Person> =
    members.into_iter().map(|p| (p.id, p)).collect();

  let mut children: BTreeMap<PersonId, Vec<PersonId>> = BTreeMap::new();
  for person in by_id.values() {
    for parent in person.parents() {
      children.entry(parent).or_default().push(person.id);
    }
  }

  let forest = Forest { by_id: &by_id, children: &children };
  Ok(
    by_id
      .values()
      .filter(|p| p.is_root())
      .map(|root| forest.node(root.id, HashSet::new()))
      .collect(),
  )
}

struct Forest<'a> {
  by_id:    &'a BTreeMap<PersonId, Person>,
  children: &'a BTreeMap<PersonId, Vec<PersonId>>,
}

impl Forest<'_> {
  /// Build the node for `id`. `visited` holds the ids on the path from the
  /// root and is copied into each child, so siblings never see each other's
  /// visits and a shared descendant appears under every parent.
  fn node(&self, id: PersonId, mut visited: HashSet<PersonId>) -> TreeNode {
    visited.insert(id);

    let mut nodes = Vec::new();
    for &child in self.children.get(&id).map(Vec::as_slice).unwrap_or_default() {
      if visited.contains(&child) {
        tracing::warn!(
          parent = id,
          child,
          "parent links form a cycle; dropping child from this branch"
        );
        continue;
      }
      nodes.push(self.node(child, visited.clone()));
    }

    TreeNode { person: self.by_id[&id].clone(), children: nodes }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};

  use super::*;

  fn person(id: PersonId, first: &str) -> Person {
    Person {
      id,
      owner: 1,
      first_name: first.into(),
      last_name: "Zvihwati".into(),
      gender: None,
      date_of_birth: None,
      date_of_death: None,
      history: String::new(),
      mother: None,
      father: None,
      spouses: vec![],
      chiefdom_of_origin: None,
      village_of_origin: None,
      current_location: None,
      created_at: Utc.timestamp_opt(0, 0).unwrap(),
    }
  }

  fn child(id: PersonId, first: &str, mother: Option<PersonId>, father: Option<PersonId>) -> Person {
    Person { mother, father, ..person(id, first) }
  }

  fn names(nodes: &[TreeNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.person.first_name.as_str()).collect()
  }

  #[test]
  fn empty_clan_is_not_found() {
    let err = build_forest("Zvihwati", vec![]).unwrap_err();
    assert_eq!(err, Error::ClanNotFound("Zvihwati".into()));
  }

  #[test]
  fn single_root_with_child() {
    // Jane's parent is outside this set, so she is not a root.
    let members = vec![
      person(1, "John"),
      child(2, "Jane", Some(99), None),
      child(3, "Alice", Some(2), Some(1)),
    ];
    let forest = build_forest("Zvihwati", members).unwrap();
    assert_eq!(names(&forest), ["John"]);
    assert_eq!(names(&forest[0].children), ["Alice"]);
  }

  #[test]
  fn both_parents_as_roots_share_the_child() {
    let members = vec![
      person(1, "John"),
      person(2, "Jane"),
      child(3, "Alice", Some(2), Some(1)),
    ];
    let forest = build_forest("Zvihwati", members).unwrap();
    assert_eq!(names(&forest), ["John", "Jane"]);
    assert_eq!(names(&forest[0].children), ["Alice"]);
    assert_eq!(names(&forest[1].children), ["Alice"]);
  }

  #[test]
  fn ordering_is_by_id() {
    let members = vec![
      child(9, "Last", None, Some(1)),
      person(1, "Root"),
      child(4, "First", None, Some(1)),
      person(0, "Other"),
    ];
    let forest = build_forest("Zvihwati", members).unwrap();
    assert_eq!(names(&forest), ["Other", "Root"]);
    assert_eq!(names(&forest[1].children), ["First", "Last"]);
  }

  #[test]
  fn same_parent_twice_yields_one_child_edge() {
    let members = vec![person(1, "Root"), child(2, "Kid", Some(1), Some(1))];
    let forest = build_forest("Zvihwati", members).unwrap();
    assert_eq!(forest[0].children.len(), 1);
  }

  #[test]
  fn mutual_mothers_terminate_with_no_roots() {
    let members = vec![
      child(1, "A", Some(2), None),
      child(2, "B", Some(1), None),
    ];
    let forest = build_forest("Zvihwati", members).unwrap();
    assert!(forest.is_empty());
  }

  #[test]
  fn cycle_below_a_root_is_truncated() {
    // Root -> A (father Root, mother B); B's mother is A.
    let members = vec![
      person(1, "Root"),
      child(2, "A", Some(3), Some(1)),
      child(3, "B", Some(2), None),
    ];
    let forest = build_forest("Zvihwati", members).unwrap();
    assert_eq!(names(&forest), ["Root"]);
    let a = &forest[0].children[0];
    assert_eq!(a.person.first_name, "A");
    let b = &a.children[0];
    assert_eq!(b.person.first_name, "B");
    assert!(b.children.is_empty());
  }

  #[test]
  fn node_serialises_flat_with_children() {
    let forest = build_forest("Zvihwati", vec![person(1, "John")]).unwrap();
    let json = serde_json::to_value(&forest[0]).unwrap();
    assert_eq!(json["first_name"], "John");
    assert_eq!(json["user"], 1);
    assert!(json["children"].as_array().unwrap().is_empty());
  }
}
