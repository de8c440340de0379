//! BK-tree over canonical item names.
//!
//! The tree is built once per catalog load and is read-only afterwards. The
//! distance function is pluggable through [`Metric`]: the tree is always built
//! with the metric it was constructed with, while a query may supply a
//! different one (the lookalike metric used for hand-typed imports).

use std::{cmp::Ordering, collections::BTreeMap};

/// Default search radius.
pub const MAX_DISTANCE: usize = 5;

// ─── Metrics ─────────────────────────────────────────────────────────────────

/// An edit-distance function plus the query normalisation that goes with it.
pub trait Metric: Send + Sync {
  fn distance(&self, a: &str, b: &str) -> usize;

  /// Normalise a raw query before it is compared to stored words.
  fn normalize(&self, query: &str) -> String { pascal_case(query) }
}

/// Plain Levenshtein distance over Unicode scalar values. Case-sensitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Levenshtein;

impl Metric for Levenshtein {
  fn distance(&self, a: &str, b: &str) -> usize {
    edit_distance(a, b, |x, y| x == y)
  }
}

/// Levenshtein distance that treats visually similar glyphs as equal, to
/// tolerate OCR and manual-entry noise. Case-insensitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lookalike;

const LOOKALIKE_CLASSES: &[&[char]] = &[
  &['l', '1', 'i', '|'],
  &['o', '0'],
  &['s', '5', '$'],
  &['z', '2'],
  &['b', '8'],
  &['g', '9'],
];

fn lookalike_eq(x: char, y: char) -> bool {
  let (x, y) = (x.to_ascii_lowercase(), y.to_ascii_lowercase());
  x == y
    || LOOKALIKE_CLASSES
      .iter()
      .any(|class| class.contains(&x) && class.contains(&y))
}

impl Metric for Lookalike {
  fn distance(&self, a: &str, b: &str) -> usize { edit_distance(a, b, lookalike_eq) }

  /// Like [`pascal_case`] but keeps digits and lookalike symbols, which are
  /// the noise this metric exists to absorb.
  fn normalize(&self, query: &str) -> String {
    let kept: String = query
      .chars()
      .filter(|c| {
        c.is_alphanumeric()
          || *c == '-'
          || c.is_whitespace()
          || LOOKALIKE_CLASSES.iter().any(|class| class.contains(c))
      })
      .collect();
    join_capitalized(&kept)
  }
}

fn edit_distance(a: &str, b: &str, eq: impl Fn(char, char) -> bool) -> usize {
  let a: Vec<char> = a.chars().collect();
  let b: Vec<char> = b.chars().collect();
  if a.is_empty() {
    return b.len();
  }
  if b.is_empty() {
    return a.len();
  }

  let mut prev: Vec<usize> = (0..=b.len()).collect();
  let mut curr = vec![0; b.len() + 1];

  for (i, &ca) in a.iter().enumerate() {
    curr[0] = i + 1;
    for (j, &cb) in b.iter().enumerate() {
      let substitution = prev[j] + usize::from(!eq(ca, cb));
      curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
    }
    std::mem::swap(&mut prev, &mut curr);
  }

  prev[b.len()]
}

// ─── Normalisation ───────────────────────────────────────────────────────────

/// Strip everything but letters, hyphens and spaces, split on hyphens and
/// whitespace, capitalise each token and concatenate.
///
/// `"kamisato ayaka"` and `"Kamisato-Ayaka"` both become `"KamisatoAyaka"`.
pub fn pascal_case(input: &str) -> String {
  let kept: String = input
    .chars()
    .filter(|c| c.is_alphabetic() || *c == '-' || c.is_whitespace())
    .collect();
  join_capitalized(&kept)
}

fn join_capitalized(kept: &str) -> String {
  kept
    .split(|c: char| c == '-' || c.is_whitespace())
    .filter(|token| !token.is_empty())
    .map(|token| {
      let mut chars = token.chars();
      chars
        .next()
        .map(|first| {
          first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect::<String>()
        })
        .unwrap_or_default()
    })
    .collect()
}

// ─── Tree ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Node {
  word:     String,
  children: BTreeMap<usize, Node>,
}

impl Node {
  fn leaf(word: String) -> Self { Self { word, children: BTreeMap::new() } }
}

/// A word found by [`BkTree::search`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
  pub word:     String,
  pub distance: usize,
}

/// A BK-tree keyed by the edit distance of `M`.
#[derive(Debug)]
pub struct BkTree<M = Levenshtein> {
  root:   Option<Node>,
  metric: M,
  len:    usize,
}

impl Default for BkTree<Levenshtein> {
  fn default() -> Self { Self::new(Levenshtein) }
}

impl<M: Metric> BkTree<M> {
  pub fn new(metric: M) -> Self { Self { root: None, metric, len: 0 } }

  pub fn len(&self) -> usize { self.len }

  pub fn is_empty(&self) -> bool { self.len == 0 }

  /// Insert `word`. Returns `false` if an identical word is already present.
  pub fn insert(&mut self, word: impl Into<String>) -> bool {
    let word = word.into();
    let Some(mut node) = self.root.as_mut() else {
      self.root = Some(Node::leaf(word));
      self.len = 1;
      return true;
    };

    loop {
      let distance = self.metric.distance(&node.word, &word);
      if distance == 0 {
        return false;
      }
      match node.children.entry(distance) {
        std::collections::btree_map::Entry::Occupied(entry) => {
          node = entry.into_mut();
        }
        std::collections::btree_map::Entry::Vacant(entry) => {
          entry.insert(Node::leaf(word));
          self.len += 1;
          return true;
        }
      }
    }
  }

  /// Find every stored word within `max_distance` of `query`, nearest first.
  ///
  /// The query is normalised with the tree's metric before comparison. Ties
  /// are broken by [`query_order`].
  pub fn search(&self, query: &str, max_distance: usize) -> Vec<SearchHit> {
    self.walk(query, max_distance, &self.metric, true)
  }

  /// [`search`](Self::search) with an alternative metric for this query only.
  ///
  /// Child keys hold distances under the tree's own metric, which bound
  /// nothing under another one, so this visits every node.
  pub fn search_with(
    &self,
    query: &str,
    max_distance: usize,
    metric: &dyn Metric,
  ) -> Vec<SearchHit> {
    self.walk(query, max_distance, metric, false)
  }

  fn walk(
    &self,
    query: &str,
    max_distance: usize,
    metric: &dyn Metric,
    prune: bool,
  ) -> Vec<SearchHit> {
    let Some(root) = self.root.as_ref() else {
      return Vec::new();
    };

    let normalized = metric.normalize(query);
    let mut hits = Vec::new();
    collect(root, &normalized, max_distance, metric, prune, &mut hits);

    let lowered = normalized.to_lowercase();
    hits.sort_by(|a, b| {
      a.distance
        .cmp(&b.distance)
        .then_with(|| query_order(&a.word, &b.word, &lowered))
    });
    hits
  }
}

fn collect(
  node: &Node,
  query: &str,
  max_distance: usize,
  metric: &dyn Metric,
  prune: bool,
  hits: &mut Vec<SearchHit>,
) {
  let distance = metric.distance(&node.word, query);
  if distance <= max_distance {
    hits.push(SearchHit { word: node.word.clone(), distance });
  }

  let (low, high) = if prune {
    (distance.saturating_sub(max_distance), distance + max_distance)
  } else {
    (0, usize::MAX)
  };
  for child in node.children.range(low..=high).map(|(_, child)| child) {
    collect(child, query, max_distance, metric, prune, hits);
  }
}

/// Order two equally distant candidates by the query itself.
///
/// At the first position where the (lowercased) candidates differ, the one
/// whose character occurs earlier in `lowered_query` wins; a character that
/// occurs beats one that does not. When neither occurs the candidates fall
/// back to lexical order.
pub fn query_order(a: &str, b: &str, lowered_query: &str) -> Ordering {
  let lower_a = a.chars().flat_map(char::to_lowercase);
  let lower_b = b.chars().flat_map(char::to_lowercase);

  for (ca, cb) in lower_a.zip(lower_b) {
    if ca == cb {
      continue;
    }
    return match (lowered_query.find(ca), lowered_query.find(cb)) {
      (Some(ia), Some(ib)) => ia.cmp(&ib),
      (Some(_), None) => Ordering::Less,
      (None, Some(_)) => Ordering::Greater,
      (None, None) => a.cmp(b),
    };
  }

  a.cmp(b)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tree(words: &[&str]) -> BkTree {
    let mut tree = BkTree::default();
    for word in words {
      tree.insert(*word);
    }
    tree
  }

  #[test]
  fn pascal_case_normalises_noise() {
    assert_eq!(pascal_case("amber"), "Amber");
    assert_eq!(pascal_case("kamisato ayaka"), "KamisatoAyaka");
    assert_eq!(pascal_case("HU-TAO!"), "HuTao");
    assert_eq!(pascal_case("  Kagura's   Verity "), "KagurasVerity");
    assert_eq!(pascal_case("123"), "");
  }

  #[test]
  fn levenshtein_basics() {
    let m = Levenshtein;
    assert_eq!(m.distance("Amber", "Amber"), 0);
    assert_eq!(m.distance("Amber", "Ambr"), 1);
    assert_eq!(m.distance("Ambra", "Ambr"), 1);
    assert_eq!(m.distance("", "Lisa"), 4);
    assert_eq!(m.distance("kitten", "sitting"), 3);
  }

  #[test]
  fn lookalike_substitutions_are_free() {
    let m = Lookalike;
    assert_eq!(m.distance("L1sa", "Lisa"), 0);
    assert_eq!(m.distance("N0e11e", "Noelle"), 0);
    assert_eq!(m.distance("$ucro5e", "Sucrose"), 0);
    assert_eq!(m.distance("Xingqiu", "Xlngqlu"), 0);
    assert_eq!(Levenshtein.distance("L1sa", "Lisa"), 1);
  }

  #[test]
  fn insert_ignores_duplicates() {
    let mut t = tree(&["Amber", "Lisa"]);
    assert!(!t.insert("Amber"));
    assert_eq!(t.len(), 2);
  }

  #[test]
  fn exact_word_is_first_at_distance_zero() {
    let words = ["Amber", "Ambra", "Lisa", "Kaeya", "Keqing", "Klee", "Qiqi"];
    let t = tree(&words);
    for word in words {
      let hits = t.search(word, MAX_DISTANCE);
      assert_eq!(hits[0], SearchHit { word: word.to_owned(), distance: 0 });
    }
  }

  #[test]
  fn lowercase_query_resolves_exactly() {
    let t = tree(&["Amber", "Ambra", "Lisa"]);
    let hits = t.search("amber", MAX_DISTANCE);
    assert_eq!(hits[0].word, "Amber");
    assert_eq!(hits[0].distance, 0);
  }

  #[test]
  fn equal_distance_tie_prefers_query_characters() {
    let t = tree(&["Amber", "Ambra", "Lisa"]);
    let hits = t.search("ambr", MAX_DISTANCE);

    assert_eq!(hits[0].distance, 1);
    assert_eq!(hits[1].distance, 1);
    // First difference is 'e' vs 'r'; only 'r' occurs in the query.
    assert_eq!(hits[0].word, "Ambra");
    assert_eq!(hits[1].word, "Amber");
  }

  #[test]
  fn query_order_falls_back_to_lexical() {
    assert_eq!(query_order("Abc", "Abd", "xyz"), Ordering::Less);
    assert_eq!(query_order("Abd", "Abc", "xyz"), Ordering::Greater);
    assert_eq!(query_order("Abd", "Abc", "d"), Ordering::Less);
  }

  #[test]
  fn search_respects_radius() {
    let t = tree(&["Amber", "Lisa", "Xiangling"]);
    let hits = t.search("Amber", 1);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].word, "Amber");
  }

  #[test]
  fn empty_tree_yields_no_hits() {
    let t = BkTree::default();
    assert!(t.search("Amber", MAX_DISTANCE).is_empty());
  }

  #[test]
  fn search_with_swaps_metric_per_query() {
    let t = tree(&["Lisa", "Noelle", "Sucrose"]);
    let hits = t.search_with("N0e11e", MAX_DISTANCE, &Lookalike);
    assert_eq!(hits[0], SearchHit { word: "Noelle".into(), distance: 0 });
  }

  #[test]
  fn foreign_metric_reaches_children_outside_the_window() {
    // Two apart under Levenshtein, equal under Lookalike.
    let t = tree(&["Ilsa", "Lisa"]);
    let hits = t.search_with("Lisa", 0, &Lookalike);
    let words: Vec<&str> = hits.iter().map(|h| h.word.as_str()).collect();
    assert_eq!(words, vec!["Lisa", "Ilsa"]);
    assert!(hits.iter().all(|h| h.distance == 0));
  }
}
