//! Per-level storage indexed by absolute level number.

use std::ops::{Index, IndexMut};

/// One `T` for each level in `min_level..=max_level`.
#[derive(Clone, Debug, PartialEq)]
pub struct MgLevelObject<T> {
    min_level: usize,
    objects: Vec<T>,
}

impl<T> MgLevelObject<T> {
    /// Build by calling `f(level)` for every level, coarsest first.
    pub fn new(min_level: usize, max_level: usize, f: impl FnMut(usize) -> T) -> Self {
        assert!(min_level <= max_level, "min_level {} above max_level {}", min_level, max_level);
        Self { min_level, objects: (min_level..=max_level).map(f).collect() }
    }

    /// Wrap `objects`, the first of which belongs to `min_level`.
    pub fn from_vec(min_level: usize, objects: Vec<T>) -> Self {
        assert!(!objects.is_empty(), "a level hierarchy needs at least one level");
        Self { min_level, objects }
    }

    pub fn min_level(&self) -> usize {
        self.min_level
    }

    pub fn max_level(&self) -> usize {
        self.min_level + self.objects.len() - 1
    }

    pub fn n_levels(&self) -> usize {
        self.objects.len()
    }

    pub fn levels(&self) -> std::ops::RangeInclusive<usize> {
        self.min_level..=self.max_level()
    }

    /// `(level, &T)` pairs, coarsest first.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.objects.iter().enumerate().map(move |(i, t)| (self.min_level + i, t))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        let min = self.min_level;
        self.objects.iter_mut().enumerate().map(move |(i, t)| (min + i, t))
    }

    pub fn get(&self, level: usize) -> Option<&T> {
        level.checked_sub(self.min_level).and_then(|i| self.objects.get(i))
    }

    /// Mutable access to `level - 1` and `level` at the same time.
    pub fn pair_mut(&mut self, level: usize) -> (&mut T, &mut T) {
        assert!(
            level > self.min_level && level <= self.max_level(),
            "level {} has no coarser neighbour in {:?}",
            level,
            self.levels()
        );
        let fine = level - self.min_level;
        let (coarse_part, fine_part) = self.objects.split_at_mut(fine);
        (&mut coarse_part[fine - 1], &mut fine_part[0])
    }

    pub fn map<U>(&self, mut f: impl FnMut(usize, &T) -> U) -> MgLevelObject<U> {
        MgLevelObject { min_level: self.min_level, objects: self.iter().map(|(l, t)| f(l, t)).collect() }
    }
}

impl<T> Index<usize> for MgLevelObject<T> {
    type Output = T;

    fn index(&self, level: usize) -> &T {
        &self.objects[level - self.min_level]
    }
}

impl<T> IndexMut<usize> for MgLevelObject<T> {
    fn index_mut(&mut self, level: usize) -> &mut T {
        &mut self.objects[level - self.min_level]
    }
}
