//! Sparse hash grid rebuilt every tick for neighbor queries

use ahash::AHashMap;
use glam::Vec3;

use crate::core::config::SpatialConfig;
use crate::core::types::AgentId;

/// Hash key of one grid cell
pub type CellKey = i64;

/// Snapshot of one agent taken when the grid was rebuilt
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialEntry {
    pub id: AgentId,
    /// Column index of the agent in the archetype at rebuild time
    pub slot: usize,
    pub position: Vec3,
    pub is_dead: bool,
}

/// Uniform grid keyed by `floor(x / cell) + y_mult * floor(z / cell)`
///
/// Cells are cleared rather than dropped on rebuild, so their vectors only
/// ever grow and a steady population stops allocating after warm-up. A cell
/// left empty by a whole rebuild is dropped on the next one, which keeps the
/// rebuild cost tied to the population instead of every cell ever visited.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f32,
    y_mult: i64,
    cells: AHashMap<CellKey, Vec<SpatialEntry>>,
    len: usize,
}

impl SpatialIndex {
    pub fn new(cell_size: f32, y_mult: i64) -> Self {
        Self {
            cell_size,
            y_mult,
            cells: AHashMap::new(),
            len: 0,
        }
    }

    pub fn from_config(config: &SpatialConfig) -> Self {
        Self::new(config.cell_size, config.y_mult)
    }

    #[inline]
    fn cell_coord(&self, pos: Vec3) -> (i64, i64) {
        (
            (pos.x / self.cell_size).floor() as i64,
            (pos.z / self.cell_size).floor() as i64,
        )
    }

    #[inline]
    fn key_of(&self, cx: i64, cz: i64) -> CellKey {
        cx + self.y_mult * cz
    }

    /// Key of the cell containing `pos`
    #[inline]
    pub fn cell_key(&self, pos: Vec3) -> CellKey {
        let (cx, cz) = self.cell_coord(pos);
        self.key_of(cx, cz)
    }

    /// Empty every cell while keeping its allocation
    ///
    /// Cells that were already empty are released.
    pub fn clear(&mut self) {
        self.cells.retain(|_, cell| {
            let used = !cell.is_empty();
            cell.clear();
            used
        });
        self.len = 0;
    }

    pub fn insert(&mut self, entry: SpatialEntry) {
        let key = self.cell_key(entry.position);
        let cell = self.cells.entry(key).or_default();
        if cell.len() == cell.capacity() && cell.capacity() > 0 {
            tracing::debug!("Spatial cell {} growing past {} entries", key, cell.capacity());
        }
        cell.push(entry);
        self.len += 1;
    }

    /// Rebuild grid from agent snapshots
    pub fn rebuild(&mut self, entries: impl IntoIterator<Item = SpatialEntry>) {
        self.clear();
        for entry in entries {
            self.insert(entry);
        }
    }

    /// All entries in the 3x3 block of cells around `pos`
    ///
    /// Agents farther than one full cell outside the block are never
    /// returned, even if they are within a caller's query radius.
    pub fn neighbors(&self, pos: Vec3) -> impl Iterator<Item = &SpatialEntry> + '_ {
        let (cx, cz) = self.cell_coord(pos);

        (-1..=1).flat_map(move |dz| {
            (-1..=1).flat_map(move |dx| {
                self.cells
                    .get(&self.key_of(cx + dx, cz + dz))
                    .into_iter()
                    .flatten()
            })
        })
    }

    /// Entries stored under one key
    pub fn cell(&self, key: CellKey) -> &[SpatialEntry] {
        self.cells.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Non-empty cells, in no particular order
    pub fn cells(&self) -> impl Iterator<Item = (CellKey, &[SpatialEntry])> + '_ {
        self.cells
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(&key, entries)| (key, entries.as_slice()))
    }

    /// Number of entries inserted since the last rebuild
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of allocated cells, including ones emptied by the last rebuild
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Total entry capacity across all cells
    pub fn capacity(&self) -> usize {
        self.cells.values().map(Vec::capacity).sum()
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::from_config(&SpatialConfig::default())
    }
}
