//! Messaging quadrants of the Leesburg Grid
//!
//! The grid is a fixed 2x2 matrix. `QuadrantKey` is the closed set of
//! quadrant identifiers and `Quadrants<T>` is a total map from every key to
//! a value, serialized as a JSON object keyed by the wire names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use crate::Error;

/// One of the four messaging categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuadrantKey {
    /// What we say about ourselves
    OurStory,
    /// What we say about them
    TheAttack,
    /// What they say about themselves
    TheirDefense,
    /// What they say about us
    TheCounter,
}

impl QuadrantKey {
    /// All quadrants in storage order
    pub const ALL: [QuadrantKey; 4] = [
        QuadrantKey::OurStory,
        QuadrantKey::TheAttack,
        QuadrantKey::TheirDefense,
        QuadrantKey::TheCounter,
    ];

    /// Display order of the printed grid: self-messaging and their defense on
    /// the top row, attack and counter below.
    pub const DISPLAY_ORDER: [QuadrantKey; 4] = [
        QuadrantKey::OurStory,
        QuadrantKey::TheirDefense,
        QuadrantKey::TheAttack,
        QuadrantKey::TheCounter,
    ];

    /// Wire name (matches the serde representation)
    pub fn as_str(&self) -> &'static str {
        match self {
            QuadrantKey::OurStory => "our-story",
            QuadrantKey::TheAttack => "the-attack",
            QuadrantKey::TheirDefense => "their-defense",
            QuadrantKey::TheCounter => "the-counter",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            QuadrantKey::OurStory => "Our Story",
            QuadrantKey::TheAttack => "The Attack",
            QuadrantKey::TheirDefense => "Their Defense",
            QuadrantKey::TheCounter => "The Counter",
        }
    }

    pub fn subtitle(&self) -> &'static str {
        match self {
            QuadrantKey::OurStory => "What we say about ourselves",
            QuadrantKey::TheAttack => "What we say about them",
            QuadrantKey::TheirDefense => "What they say about themselves",
            QuadrantKey::TheCounter => "What they say about us",
        }
    }

    /// Icon name used by the front end
    pub fn icon(&self) -> &'static str {
        match self {
            QuadrantKey::OurStory => "Shield",
            QuadrantKey::TheAttack => "Swords",
            QuadrantKey::TheirDefense => "ShieldAlert",
            QuadrantKey::TheCounter => "Undo2",
        }
    }
}

impl fmt::Display for QuadrantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuadrantKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuadrantKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown quadrant: {}", s)))
    }
}

/// Total map from every quadrant to a `T`
///
/// Missing keys deserialize to `T::default()`, so a stored `{}` or a
/// partial generation response both load as empty quadrants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Quadrants<T> {
    #[serde(rename = "our-story")]
    pub our_story: T,
    #[serde(rename = "the-attack")]
    pub the_attack: T,
    #[serde(rename = "their-defense")]
    pub their_defense: T,
    #[serde(rename = "the-counter")]
    pub the_counter: T,
}

impl<T> Quadrants<T> {
    /// Build a map by evaluating `f` for each quadrant
    pub fn from_fn(mut f: impl FnMut(QuadrantKey) -> T) -> Self {
        Self {
            our_story: f(QuadrantKey::OurStory),
            the_attack: f(QuadrantKey::TheAttack),
            their_defense: f(QuadrantKey::TheirDefense),
            the_counter: f(QuadrantKey::TheCounter),
        }
    }

    /// Iterate `(key, value)` pairs in storage order
    pub fn iter(&self) -> impl Iterator<Item = (QuadrantKey, &T)> {
        QuadrantKey::ALL.into_iter().map(move |key| (key, &self[key]))
    }

    /// Iterate values mutably in storage order
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        [
            &mut self.our_story,
            &mut self.the_attack,
            &mut self.their_defense,
            &mut self.the_counter,
        ]
        .into_iter()
    }

    pub fn map<U>(self, mut f: impl FnMut(QuadrantKey, T) -> U) -> Quadrants<U> {
        Quadrants {
            our_story: f(QuadrantKey::OurStory, self.our_story),
            the_attack: f(QuadrantKey::TheAttack, self.the_attack),
            their_defense: f(QuadrantKey::TheirDefense, self.their_defense),
            the_counter: f(QuadrantKey::TheCounter, self.the_counter),
        }
    }
}

impl<T> Quadrants<Vec<T>> {
    /// Total number of items across all quadrants
    pub fn total_len(&self) -> usize {
        self.iter().map(|(_, items)| items.len()).sum()
    }

    pub fn is_all_empty(&self) -> bool {
        self.total_len() == 0
    }
}

impl<T> Index<QuadrantKey> for Quadrants<T> {
    type Output = T;

    fn index(&self, key: QuadrantKey) -> &T {
        match key {
            QuadrantKey::OurStory => &self.our_story,
            QuadrantKey::TheAttack => &self.the_attack,
            QuadrantKey::TheirDefense => &self.their_defense,
            QuadrantKey::TheCounter => &self.the_counter,
        }
    }
}

impl<T> IndexMut<QuadrantKey> for Quadrants<T> {
    fn index_mut(&mut self, key: QuadrantKey) -> &mut T {
        match key {
            QuadrantKey::OurStory => &mut self.our_story,
            QuadrantKey::TheAttack => &mut self.the_attack,
            QuadrantKey::TheirDefense => &mut self.their_defense,
            QuadrantKey::TheCounter => &mut self.the_counter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip_through_from_str() {
        for key in QuadrantKey::ALL {
            assert_eq!(key.as_str().parse::<QuadrantKey>().unwrap(), key);
            assert_eq!(
                serde_json::to_string(&key).unwrap(),
                format!("\"{}\"", key.as_str())
            );
        }
    }

    #[test]
    fn test_unknown_quadrant_rejected() {
        assert!("the-middle".parse::<QuadrantKey>().is_err());
    }

    #[test]
    fn test_partial_object_fills_missing_quadrants() {
        let parsed: Quadrants<Vec<String>> =
            serde_json::from_str(r#"{"our-story": ["a", "b"]}"#).unwrap();
        assert_eq!(parsed.our_story.len(), 2);
        assert!(parsed.the_attack.is_empty());
        assert!(parsed.their_defense.is_empty());
        assert!(parsed.the_counter.is_empty());
        assert_eq!(parsed.total_len(), 2);
    }

    #[test]
    fn test_index_matches_fields() {
        let mut map = Quadrants::from_fn(|key| key.title().to_string());
        assert_eq!(map[QuadrantKey::TheirDefense], "Their Defense");
        map[QuadrantKey::TheCounter] = "changed".to_string();
        assert_eq!(map.the_counter, "changed");
    }

    #[test]
    fn test_display_order_is_permutation_of_all() {
        let mut display = QuadrantKey::DISPLAY_ORDER.to_vec();
        display.sort();
        let mut all = QuadrantKey::ALL.to_vec();
        all.sort();
        assert_eq!(display, all);
    }
}
