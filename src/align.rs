//! Word alignment links and their projection across token rewrites.

use serde::{Deserialize, Serialize};

/// One alignment link between a source and a target token index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentLink {
    pub source:     usize,
    pub target:     usize,
    pub confidence: f32,
}

/// A set of alignment links.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub links: Vec<AlignmentLink>,
}

impl Alignment {
    pub fn new(links: Vec<AlignmentLink>) -> Self {
        Self { links }
    }

    /// The target indices linked to the given source index, in order.
    pub fn targets_of(&self, source: usize) -> impl Iterator<Item = usize> + '_ {
        self.links.iter().filter(move |l| l.source == source).map(|l| l.target)
    }

    /// The source indices linked to the given target index, in order.
    pub fn sources_of(&self, target: usize) -> impl Iterator<Item = usize> + '_ {
        self.links.iter().filter(move |l| l.target == target).map(|l| l.source)
    }

    /// Projects target indices through a rewrite map; links whose target was
    /// dropped disappear.
    pub fn project_targets(&self, map: &[Option<usize>]) -> Alignment {
        let links = self
            .links
            .iter()
            .filter_map(|link| {
                let target = *map.get(link.target)?;
                target.map(|target| AlignmentLink { target, ..*link })
            })
            .collect();
        Alignment { links }
    }

    /// Shifts target indices at or after `at` by one, making room for an
    /// inserted token.
    pub fn shift_targets_for_insert(&mut self, at: usize) {
        for link in &mut self.links {
            if link.target >= at {
                link.target += 1;
            }
        }
    }
}
