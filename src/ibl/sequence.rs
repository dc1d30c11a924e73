use glam::Vec2;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Radical inverse of `index` in `base`: its digits mirrored around the radix point.
pub fn van_der_corput(mut index: u32, base: u32) -> f32 {
    debug_assert!(base >= 2);
    let inv_base = 1.0 / base as f64;
    let mut result = 0.0f64;
    let mut scale = inv_base;
    while index > 0 {
        result += (index % base) as f64 * scale;
        index /= base;
        scale *= inv_base;
    }
    result as f32
}

pub fn hammersley(index: u32, count: u32) -> Vec2 {
    Vec2::new(index as f32 / count as f32, van_der_corput(index, 2))
}

/// Memoized Hammersley points. A table is built once per sample count and shared by every
/// integration that asks for that count; entries are never evicted.
#[derive(Default)]
pub struct SampleSequence {
    tables: RwLock<HashMap<u32, Arc<[Vec2]>>>,
}

impl SampleSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self, count: u32) -> Arc<[Vec2]> {
        if let Some(table) = self.tables.read().get(&count) {
            return table.clone();
        }
        let table: Arc<[Vec2]> = (0..count).map(|index| hammersley(index, count)).collect();
        // Another thread may have raced us here; keep whichever table landed first.
        self.tables.write().entry(count).or_insert(table).clone()
    }

    pub fn hammersley(&self, index: u32, count: u32) -> Vec2 {
        match self.points(count).get(index as usize) {
            Some(point) => *point,
            None => hammersley(index, count),
        }
    }

    pub fn cached_counts(&self) -> usize {
        self.tables.read().len()
    }
}
