//! Uniform-grid spatial hash for free entities sharing the track's world
//!
//! Objects are indexed by their X/Z footprint into every cell they overlap.
//! Cells hash into a fixed number of buckets, so a bucket may hold objects
//! from unrelated cells; queries re-check each candidate's footprint.
//! Visited objects are stamped with the query's timestamp instead of being
//! collected into a separate visited set.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned footprint on the X/Z plane (`Vec2::x` = world X, `Vec2::y` = world Z)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Square of half-width `half` around `center`
    pub fn around(center: Vec2, half: f32) -> Self {
        let half = Vec2::splat(half.abs());
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x && self.min.y <= other.max.y && self.max.y >= other.min.y
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Whether the segment `from -> to` touches this rect (slab test)
    pub fn intersects_segment(&self, from: Vec2, to: Vec2) -> bool {
        let delta = to - from;
        let mut t_min = 0.0f32;
        let mut t_max = 1.0f32;
        for axis in 0..2 {
            let (origin, d, lo, hi) = (from[axis], delta[axis], self.min[axis], self.max[axis]);
            if d.abs() < 1e-8 {
                if origin < lo || origin > hi {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / d;
            let (t0, t1) = {
                let a = (lo - origin) * inv;
                let b = (hi - origin) * inv;
                (a.min(b), a.max(b))
            };
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return false;
            }
        }
        true
    }
}

/// Anything with an X/Z footprint
pub trait Bounded {
    fn bounds(&self) -> Rect;
}

/// Handle of an object in a `SpatialGrid`; stale after removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone)]
struct Slot<T> {
    value: Option<T>,
    generation: u32,
    /// Timestamp of the last query that visited this object
    stamp: u64,
    /// Buckets this object is listed in
    buckets: Vec<usize>,
}

/// Uniform grid over `Bounded` objects
#[derive(Debug, Clone)]
pub struct SpatialGrid<T: Bounded> {
    cell_size: f32,
    buckets: Vec<Vec<u32>>,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    timestamp: u64,
    len: usize,
}

type Cell = (i32, i32);

/// Upper bound on DDA steps per ray
const MAX_RAY_CELLS: usize = 4096;

impl<T: Bounded> SpatialGrid<T> {
    pub fn new(cell_size: f32, bucket_count: usize) -> Self {
        Self {
            cell_size: cell_size.max(1e-3),
            buckets: vec![Vec::new(); bucket_count.max(1)],
            slots: Vec::new(),
            free: Vec::new(),
            timestamp: 0,
            len: 0,
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn cell_of(&self, point: Vec2) -> Cell {
        (
            (point.x / self.cell_size).floor() as i32,
            (point.y / self.cell_size).floor() as i32,
        )
    }

    fn bucket_of(&self, cell: Cell) -> usize {
        let h = (cell.0 as i64).wrapping_mul(73_856_093) ^ (cell.1 as i64).wrapping_mul(19_349_663);
        h.rem_euclid(self.buckets.len() as i64) as usize
    }

    fn cell_rect(&self, cell: Cell) -> Rect {
        let min = Vec2::new(cell.0 as f32, cell.1 as f32) * self.cell_size;
        Rect {
            min,
            max: min + Vec2::splat(self.cell_size),
        }
    }

    /// Distinct buckets covering every cell `rect` overlaps
    fn buckets_for(&self, rect: &Rect) -> Vec<usize> {
        let (x0, y0) = self.cell_of(rect.min);
        let (x1, y1) = self.cell_of(rect.max);
        let mut out = Vec::new();
        for x in x0..=x1 {
            for y in y0..=y1 {
                let bucket = self.bucket_of((x, y));
                if !out.contains(&bucket) {
                    out.push(bucket);
                }
                if out.len() == self.buckets.len() {
                    return out;
                }
            }
        }
        out
    }

    fn slot(&self, handle: GridHandle) -> Option<&Slot<T>> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation && s.value.is_some())
    }

    pub fn contains(&self, handle: GridHandle) -> bool {
        self.slot(handle).is_some()
    }

    pub fn get(&self, handle: GridHandle) -> Option<&T> {
        self.slot(handle).and_then(|s| s.value.as_ref())
    }

    pub fn insert(&mut self, value: T) -> GridHandle {
        let buckets = self.buckets_for(&value.bounds());
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    value: None,
                    generation: 0,
                    stamp: 0,
                    buckets: Vec::new(),
                });
                (self.slots.len() - 1) as u32
            }
        };
        for &bucket in &buckets {
            self.buckets[bucket].push(index);
        }
        let slot = &mut self.slots[index as usize];
        slot.value = Some(value);
        slot.buckets = buckets;
        self.len += 1;
        GridHandle {
            index,
            generation: slot.generation,
        }
    }

    /// Remove an object; `None` for stale handles
    pub fn remove(&mut self, handle: GridHandle) -> Option<T> {
        self.slot(handle)?;
        let slot = &mut self.slots[handle.index as usize];
        let value = slot.value.take();
        let buckets = std::mem::take(&mut slot.buckets);
        slot.generation = slot.generation.wrapping_add(1);
        for bucket in buckets {
            self.buckets[bucket].retain(|i| *i != handle.index);
        }
        self.free.push(handle.index);
        self.len -= 1;
        value
    }

    /// Replace an object and re-index it under its new footprint.
    ///
    /// The handle stays valid. A stale handle hands `value` back as `Err`.
    pub fn update(&mut self, handle: GridHandle, value: T) -> Result<T, T> {
        let new_buckets = self.buckets_for(&value.bounds());
        let Some(slot) = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
        else {
            return Err(value);
        };
        let Some(old) = slot.value.take() else {
            return Err(value);
        };
        slot.value = Some(value);
        let old_buckets = std::mem::replace(&mut slot.buckets, new_buckets.clone());
        for bucket in old_buckets {
            self.buckets[bucket].retain(|i| *i != handle.index);
        }
        for bucket in new_buckets {
            self.buckets[bucket].push(handle.index);
        }
        Ok(old)
    }

    fn next_timestamp(&mut self) -> u64 {
        self.timestamp += 1;
        self.timestamp
    }

    fn handle_at(&self, index: u32) -> GridHandle {
        GridHandle {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    /// Objects whose footprint overlaps `region`, each reported once
    pub fn query_region(&mut self, region: &Rect) -> Vec<GridHandle> {
        let stamp = self.next_timestamp();
        let mut found = Vec::new();
        for bucket in self.buckets_for(region) {
            for &index in &self.buckets[bucket] {
                let slot = &mut self.slots[index as usize];
                if slot.stamp == stamp {
                    continue;
                }
                slot.stamp = stamp;
                if slot.value.as_ref().is_some_and(|v| v.bounds().overlaps(region)) {
                    found.push(index);
                }
            }
        }
        found.into_iter().map(|i| self.handle_at(i)).collect()
    }

    /// Objects whose footprint the segment `from -> to` passes through,
    /// in the order the grid traversal meets them
    pub fn ray_cast(&mut self, from: Vec2, to: Vec2) -> Vec<GridHandle> {
        let stamp = self.next_timestamp();
        let mut found = Vec::new();
        for cell in self.traverse(from, to) {
            let cell_rect = self.cell_rect(cell);
            let bucket = self.bucket_of(cell);
            for &index in &self.buckets[bucket] {
                let slot = &mut self.slots[index as usize];
                if slot.stamp == stamp {
                    continue;
                }
                let Some(bounds) = slot.value.as_ref().map(|v| v.bounds()) else {
                    continue;
                };
                // Hash collisions: the object must actually cover this cell
                if !bounds.overlaps(&cell_rect) {
                    continue;
                }
                slot.stamp = stamp;
                if bounds.intersects_segment(from, to) {
                    found.push(index);
                }
            }
        }
        found.into_iter().map(|i| self.handle_at(i)).collect()
    }

    /// Cells crossed by `from -> to`, DDA order
    fn traverse(&self, from: Vec2, to: Vec2) -> Vec<Cell> {
        let mut cell = self.cell_of(from);
        let last = self.cell_of(to);
        let mut cells = vec![cell];
        let delta = to - from;
        if cell == last {
            return cells;
        }

        let step = (delta.x.signum() as i32, delta.y.signum() as i32);
        let inv_or_max = |v: f32| if v.abs() < 1e-8 { f32::MAX } else { 1.0 / v.abs() };
        let t_delta = Vec2::new(
            self.cell_size * inv_or_max(delta.x),
            self.cell_size * inv_or_max(delta.y),
        );
        let boundary = |c: i32, s: i32| (if s > 0 { (c + 1) as f32 } else { c as f32 }) * self.cell_size;
        let mut t_max = Vec2::new(
            if delta.x.abs() < 1e-8 {
                f32::MAX
            } else {
                (boundary(cell.0, step.0) - from.x) / delta.x
            },
            if delta.y.abs() < 1e-8 {
                f32::MAX
            } else {
                (boundary(cell.1, step.1) - from.y) / delta.y
            },
        );

        for _ in 0..MAX_RAY_CELLS {
            if t_max.x.min(t_max.y) > 1.0 {
                break;
            }
            if t_max.x < t_max.y {
                cell.0 += step.0;
                t_max.x += t_delta.x;
            } else {
                cell.1 += step.1;
                t_max.y += t_delta.y;
            }
            cells.push(cell);
            if cell == last {
                break;
            }
        }
        cells
    }

    /// Live handles, in slot order
    pub fn handles(&self) -> Vec<GridHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.value.is_some())
            .map(|(i, s)| GridHandle {
                index: i as u32,
                generation: s.generation,
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GridHandle, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.value.as_ref().map(|v| {
                (
                    GridHandle {
                        index: i as u32,
                        generation: s.generation,
                    },
                    v,
                )
            })
        })
    }

    /// Remove every object matching `remove`; returns the removed objects
    pub fn drain_where(&mut self, mut remove: impl FnMut(&T) -> bool) -> Vec<T> {
        let doomed: Vec<GridHandle> = self.iter().filter(|(_, v)| remove(v)).map(|(h, _)| h).collect();
        doomed.into_iter().filter_map(|h| self.remove(h)).collect()
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                slot.buckets.clear();
                self.free.push(i as u32);
            }
        }
        self.len = 0;
    }
}
