use crate::prelude::HashMap;
use crate::tiles::tile::{Tile, TileKey};

/// Every tile the drawer has touched, plus the bounded pool of tiles holding
/// a decoded image
#[derive(Debug)]
pub struct TileCache<I> {
    tiles: HashMap<TileKey, Tile<I>>,
    loaded: Vec<TileKey>,
    max_loaded: usize,
}

impl<I> TileCache<I> {
    pub fn new(max_loaded: usize) -> Self {
        Self {
            tiles: HashMap::default(),
            loaded: Vec::new(),
            max_loaded,
        }
    }

    pub fn max_loaded(&self) -> usize {
        self.max_loaded
    }

    pub fn get(&self, key: &TileKey) -> Option<&Tile<I>> {
        self.tiles.get(key)
    }

    pub fn get_mut(&mut self, key: &TileKey) -> Option<&mut Tile<I>> {
        self.tiles.get_mut(key)
    }

    /// Returns the tile for `key`, creating it with `create` on first use
    pub fn get_or_insert_with(
        &mut self,
        key: TileKey,
        create: impl FnOnce() -> Tile<I>,
    ) -> &mut Tile<I> {
        self.tiles.entry(key).or_insert_with(create)
    }

    /// Number of tiles ever created
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile<I>> {
        self.tiles.values()
    }

    /// Tiles currently holding an image, in pool order
    pub fn loaded_keys(&self) -> &[TileKey] {
        &self.loaded
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Adds a freshly loaded tile to the pool.
    ///
    /// When the pool is full, the eligible tile touched longest ago is
    /// unloaded and its slot reused, preferring the finer level on equal
    /// times. Tiles being drawn and tiles at or below `cutoff_level` are
    /// never evicted; if none qualifies the pool grows instead.
    pub fn insert_loaded(&mut self, key: TileKey, cutoff_level: u32) -> Option<TileKey> {
        let mut slot = self.loaded.len();
        let mut evicted = None;

        if self.loaded.len() >= self.max_loaded {
            let mut worst: Option<(usize, f64, u32)> = None;

            for (index, candidate) in self.loaded.iter().enumerate().rev() {
                let tile = match self.tiles.get(candidate) {
                    Some(tile) => tile,
                    None => continue,
                };
                if tile.level() <= cutoff_level || tile.being_drawn {
                    continue;
                }

                let replace = match worst {
                    None => true,
                    Some((_, worst_time, worst_level)) => {
                        tile.last_touch_time < worst_time
                            || (tile.last_touch_time == worst_time && tile.level() > worst_level)
                    }
                };
                if replace {
                    worst = Some((index, tile.last_touch_time, tile.level()));
                }
            }

            match worst {
                Some((index, _, _)) => {
                    let worst_key = self.loaded[index];
                    if let Some(tile) = self.tiles.get_mut(&worst_key) {
                        tile.unload();
                    }
                    log::debug!("evicting tile {} for {}", worst_key, key);
                    slot = index;
                    evicted = Some(worst_key);
                }
                None => log::debug!(
                    "no evictable tile among {} loaded, growing the pool",
                    self.loaded.len()
                ),
            }
        }

        if slot == self.loaded.len() {
            self.loaded.push(key);
        } else {
            self.loaded[slot] = key;
        }
        evicted
    }

    /// Drops every tile, loaded or not
    pub fn clear(&mut self) {
        self.tiles.clear();
        self.loaded.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::Rect;

    fn add_loaded(
        cache: &mut TileCache<u8>,
        key: TileKey,
        touched: f64,
        cutoff: u32,
    ) -> Option<TileKey> {
        let tile = cache.get_or_insert_with(key, || {
            Tile::new(key, Rect::new(0.0, 0.0, 1.0, 1.0), true, String::new())
        });
        tile.mark_loaded(1);
        tile.last_touch_time = touched;
        cache.insert_loaded(key, cutoff)
    }

    #[test]
    fn test_pool_fills_up_to_max() {
        let mut cache = TileCache::new(3);
        for x in 0..3 {
            assert!(add_loaded(&mut cache, TileKey::new(5, x, 0), x as f64, 2).is_none());
        }
        assert_eq!(cache.loaded_count(), 3);
    }

    #[test]
    fn test_evicts_oldest_touch() {
        let mut cache = TileCache::new(3);
        add_loaded(&mut cache, TileKey::new(5, 0, 0), 30.0, 2);
        add_loaded(&mut cache, TileKey::new(5, 1, 0), 10.0, 2);
        add_loaded(&mut cache, TileKey::new(5, 2, 0), 20.0, 2);

        let evicted = add_loaded(&mut cache, TileKey::new(5, 3, 0), 40.0, 2);
        assert_eq!(evicted, Some(TileKey::new(5, 1, 0)));
        assert_eq!(cache.loaded_count(), 3);
        assert_eq!(cache.loaded_keys()[1], TileKey::new(5, 3, 0));

        let old = cache.get(&TileKey::new(5, 1, 0)).unwrap();
        assert!(!old.loaded);
        assert!(old.image.is_none());
    }

    #[test]
    fn test_tie_prefers_finer_level() {
        let mut cache = TileCache::new(2);
        add_loaded(&mut cache, TileKey::new(6, 0, 0), 10.0, 2);
        add_loaded(&mut cache, TileKey::new(4, 0, 0), 10.0, 2);

        let evicted = add_loaded(&mut cache, TileKey::new(5, 0, 0), 50.0, 2);
        assert_eq!(evicted, Some(TileKey::new(6, 0, 0)));
    }

    #[test]
    fn test_protected_tiles_are_kept() {
        let mut cache = TileCache::new(2);
        // at the cutoff level
        add_loaded(&mut cache, TileKey::new(2, 0, 0), 1.0, 2);
        add_loaded(&mut cache, TileKey::new(5, 0, 0), 2.0, 2);
        cache.get_mut(&TileKey::new(5, 0, 0)).unwrap().being_drawn = true;

        let evicted = add_loaded(&mut cache, TileKey::new(5, 1, 0), 3.0, 2);
        assert!(evicted.is_none());
        assert_eq!(cache.loaded_count(), 3);
        assert!(cache.get(&TileKey::new(2, 0, 0)).unwrap().loaded);
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mut cache = TileCache::new(4);
        add_loaded(&mut cache, TileKey::new(3, 0, 0), 0.0, 0);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.loaded_count(), 0);
    }
}
