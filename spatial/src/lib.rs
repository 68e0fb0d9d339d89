#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Faction-partitioned uniform grid over the `hecs` component store.
//!
//! World space is cut into square cells. Each of the [`MAX_FACTIONS`] factions
//! owns an independent array of cells, and every cell stores only the head of
//! an intrusive doubly-linked list threaded through the [`SpatialNode`]
//! component of its members. Insert, remove and relocation are handle
//! rewrites; rectangle, radius and nearest-neighbour queries walk only the
//! cells overlapping the search area (broad phase) and then test the live
//! [`Position`] of each candidate (narrow phase).
//!
//! The grid never owns entities. Links are plain [`Entity`] handles that the
//! grid keeps consistent as long as every position change of a tracked entity
//! is reported through [`SpatialGrid::update`].

use battlegrid_core::{
    components::{Faction, Position},
    is_valid_faction, math, Entity, Vec2, MAX_FACTIONS,
};
use hecs::World;
use log::{debug, trace};
use thiserror::Error;

/// Errors reported while constructing a [`SpatialGrid`].
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum GridError {
    /// The cell size was zero, negative or not finite.
    #[error("cell size must be a positive finite number, got {0}")]
    InvalidCellSize(f32),
    /// The world extent does not fit a single cell on some axis.
    #[error("world of {width}x{height} cannot hold a cell of size {cell_size}")]
    EmptyGrid {
        /// Requested world width.
        width: f32,
        /// Requested world height.
        height: f32,
        /// Requested cell edge length.
        cell_size: f32,
    },
}

/// Intrusive list linkage stored on every grid-tracked entity.
///
/// Only [`SpatialGrid`] writes these fields; other crates can inspect them
/// through the accessors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpatialNode {
    next: Option<Entity>,
    prev: Option<Entity>,
    cell_index: Option<usize>,
    faction: Option<u32>,
}

impl SpatialNode {
    /// Cell the entity is linked into, `None` when it is not in any bucket.
    #[must_use]
    pub fn cell_index(&self) -> Option<usize> {
        self.cell_index
    }

    /// Faction grid the entity is linked into.
    #[must_use]
    pub fn faction(&self) -> Option<u32> {
        self.faction
    }

    /// Next entity in the same bucket.
    #[must_use]
    pub fn next(&self) -> Option<Entity> {
        self.next
    }

    /// Previous entity in the same bucket, `None` for the bucket head.
    #[must_use]
    pub fn prev(&self) -> Option<Entity> {
        self.prev
    }

    /// Reports whether the entity is currently linked into a bucket.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.cell_index.is_some()
    }
}

/// Faction restriction applied to radius and nearest-neighbour queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FactionFilter {
    /// Every faction grid is searched.
    Any,
    /// Only the given faction is searched.
    Only(u32),
    /// Every faction except the given one is searched.
    Except(u32),
}

impl FactionFilter {
    /// Builds a filter from an optional faction and a same-faction flag.
    ///
    /// A missing or out-of-range faction yields [`FactionFilter::Any`].
    #[must_use]
    pub fn new(faction: Option<u32>, same_faction: bool) -> Self {
        match faction {
            Some(id) if is_valid_faction(id) && same_faction => Self::Only(id),
            Some(id) if is_valid_faction(id) => Self::Except(id),
            _ => Self::Any,
        }
    }

    /// Shorthand for allies of `faction`.
    #[must_use]
    pub fn allies_of(faction: u32) -> Self {
        Self::new(Some(faction), true)
    }

    /// Shorthand for enemies of `faction`.
    #[must_use]
    pub fn enemies_of(faction: u32) -> Self {
        Self::new(Some(faction), false)
    }

    fn admits(self, faction: usize) -> bool {
        match self {
            Self::Any => true,
            Self::Only(id) => id as usize == faction,
            Self::Except(id) => id as usize != faction,
        }
    }
}

#[derive(Clone, Debug)]
struct FactionGrid {
    heads: Vec<Option<Entity>>,
    entity_count: usize,
}

impl FactionGrid {
    fn new(cells: usize) -> Self {
        Self {
            heads: vec![None; cells],
            entity_count: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.entity_count == 0
    }

    fn clear(&mut self) {
        self.heads.fill(None);
        self.entity_count = 0;
    }
}

/// Inclusive cell-coordinate bounds of a query area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CellBounds {
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
}

/// Uniform grid partitioned per faction.
#[derive(Clone, Debug)]
pub struct SpatialGrid {
    width: f32,
    height: f32,
    cell_size: f32,
    cols: usize,
    rows: usize,
    grids: Vec<FactionGrid>,
}

impl SpatialGrid {
    /// Creates a grid covering `width` x `height` world units.
    ///
    /// Column and row counts are the truncated quotient of the extent by the
    /// cell size; positions beyond the extent clamp into the border cells.
    pub fn new(width: f32, height: f32, cell_size: f32) -> Result<Self, GridError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(GridError::InvalidCellSize(cell_size));
        }

        let cols = (width / cell_size) as usize;
        let rows = (height / cell_size) as usize;
        if cols == 0 || rows == 0 {
            return Err(GridError::EmptyGrid {
                width,
                height,
                cell_size,
            });
        }

        debug!("spatial grid {cols}x{rows} cells of {cell_size} over {width}x{height}");
        Ok(Self {
            width,
            height,
            cell_size,
            cols,
            rows,
            grids: (0..MAX_FACTIONS)
                .map(|_| FactionGrid::new(cols * rows))
                .collect(),
        })
    }

    /// World extent covered by the grid.
    #[must_use]
    pub fn extent(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Edge length of one cell.
    #[must_use]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of columns and rows.
    #[must_use]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    /// Number of linked entities across every faction grid.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grids.iter().map(|grid| grid.entity_count).sum()
    }

    /// Reports whether no entity is linked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grids.iter().all(FactionGrid::is_empty)
    }

    /// Number of entities linked into the grid of `faction`.
    #[must_use]
    pub fn faction_len(&self, faction: u32) -> usize {
        self.grids
            .get(faction as usize)
            .map_or(0, |grid| grid.entity_count)
    }

    /// Row-major cell index containing `pos`, clamped to the grid.
    #[must_use]
    pub fn cell_index_of(&self, pos: Vec2) -> usize {
        let (x, y) = self.cell_coords(pos);
        x + y * self.cols
    }

    fn cell_coords(&self, pos: Vec2) -> (usize, usize) {
        (
            clamp_axis(pos.x / self.cell_size, self.cols),
            clamp_axis(pos.y / self.cell_size, self.rows),
        )
    }

    fn bounds(&self, min: Vec2, max: Vec2) -> CellBounds {
        let (min_x, min_y) = self.cell_coords(min);
        let (max_x, max_y) = self.cell_coords(max);
        CellBounds {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Links `entity` into the bucket containing `pos`.
    ///
    /// The faction comes from `faction` or, when absent, from the entity's
    /// [`Faction`] component. Entities without a resolvable in-range faction
    /// are left untouched. An already linked entity is unlinked first.
    pub fn insert(&mut self, world: &mut World, entity: Entity, pos: Vec2, faction: Option<u32>) {
        let resolved = faction.or_else(|| world.get::<&Faction>(entity).ok().map(|f| f.id));
        let Some(faction) = resolved.filter(|id| is_valid_faction(*id)) else {
            trace!("grid insert of {entity:?} skipped: no valid faction ({resolved:?})");
            return;
        };
        if !world.contains(entity) {
            trace!("grid insert of {entity:?} skipped: entity is gone");
            return;
        }
        if node_of(world, entity).is_some_and(|node| node.is_linked()) {
            self.remove(world, entity);
        }

        let cell = self.cell_index_of(pos);
        let grid = &mut self.grids[faction as usize];
        let head = grid.heads[cell];
        if let Some(head) = head {
            let _ = with_node(world, head, |node| node.prev = Some(entity));
        }
        grid.heads[cell] = Some(entity);
        grid.entity_count += 1;

        write_node(
            world,
            entity,
            SpatialNode {
                next: head,
                prev: None,
                cell_index: Some(cell),
                faction: Some(faction),
            },
        );
    }

    /// Unlinks `entity` from its bucket. Unlinked or untracked entities are
    /// ignored, so repeated removal is harmless.
    pub fn remove(&mut self, world: &mut World, entity: Entity) {
        let Some(node) = node_of(world, entity) else {
            return;
        };
        let (Some(cell), Some(faction)) = (node.cell_index, node.faction) else {
            return;
        };
        let Some(grid) = self.grids.get_mut(faction as usize) else {
            return;
        };

        match node.prev {
            Some(prev) => {
                let _ = with_node(world, prev, |prev| prev.next = node.next);
            }
            None => {
                if grid.heads[cell] == Some(entity) {
                    grid.heads[cell] = node.next;
                }
            }
        }
        if let Some(next) = node.next {
            let _ = with_node(world, next, |next| next.prev = node.prev);
        }
        grid.entity_count = grid.entity_count.saturating_sub(1);

        write_node(world, entity, SpatialNode::default());
    }

    /// Relocates `entity` after its position moved from `old_pos` to
    /// `new_pos`.
    ///
    /// Nothing happens when the cell and faction are unchanged or when the
    /// entity was never linked. An entity that lost its [`Faction`] is
    /// unlinked.
    pub fn update(&mut self, world: &mut World, entity: Entity, old_pos: Vec2, new_pos: Vec2) {
        let Some(node) = node_of(world, entity).filter(SpatialNode::is_linked) else {
            return;
        };
        let Some(faction) = world.get::<&Faction>(entity).ok().map(|f| f.id) else {
            self.remove(world, entity);
            return;
        };

        let moved_cell = self.cell_index_of(old_pos) != self.cell_index_of(new_pos);
        if moved_cell || node.faction != Some(faction) {
            self.remove(world, entity);
            self.insert(world, entity, new_pos, Some(faction));
        }
    }

    /// Empties every bucket and unlinks all tracked entities.
    pub fn clear(&mut self, world: &mut World) {
        for grid in &mut self.grids {
            grid.clear();
        }
        for (_, node) in world.query_mut::<&mut SpatialNode>() {
            *node = SpatialNode::default();
        }
    }

    /// Clears the grid and re-links every entity carrying both a
    /// [`Position`] and a [`Faction`].
    pub fn rebuild(&mut self, world: &mut World) {
        self.clear(world);
        let members: Vec<(Entity, Vec2, u32)> = world
            .query::<(&Position, &Faction)>()
            .iter()
            .map(|(entity, (position, faction))| (entity, position.value, faction.id))
            .collect();
        for (entity, position, faction) in members {
            self.insert(world, entity, position, Some(faction));
        }
        debug!("spatial grid rebuilt with {} entities", self.len());
    }

    /// Invokes `visit` for every linked entity whose position lies inside the
    /// rectangle, edges included.
    pub fn query_rect(&self, world: &World, min: Vec2, max: Vec2, mut visit: impl FnMut(Entity)) {
        let bounds = self.bounds(min, max);
        self.traverse(world, bounds, FactionFilter::Any, |entity, position| {
            if math::point_in_rect(position, min, max) {
                visit(entity);
            }
        });
    }

    /// Collects the result of [`SpatialGrid::query_rect`].
    #[must_use]
    pub fn entities_in_rect(&self, world: &World, min: Vec2, max: Vec2) -> Vec<Entity> {
        let mut found = Vec::new();
        self.query_rect(world, min, max, |entity| found.push(entity));
        found
    }

    /// Returns the entity closest to `pos` at a distance strictly below
    /// `radius`.
    ///
    /// Ties keep the first candidate met: faction grids in ascending order,
    /// then cells row-major, then each bucket from its most recent insert.
    #[must_use]
    pub fn find_nearest(
        &self,
        world: &World,
        pos: Vec2,
        radius: f32,
        filter: FactionFilter,
    ) -> Option<Entity> {
        self.find_nearest_by(world, pos, radius, filter, |_| true)
    }

    /// Like [`SpatialGrid::find_nearest`], but only candidates accepted by
    /// `accept` compete. A rejected entity never hides one further away.
    #[must_use]
    pub fn find_nearest_by(
        &self,
        world: &World,
        pos: Vec2,
        radius: f32,
        filter: FactionFilter,
        mut accept: impl FnMut(Entity) -> bool,
    ) -> Option<Entity> {
        let radius_sq = radius * radius;
        let mut best: Option<(Entity, f32)> = None;
        let bounds = self.radius_bounds(pos, radius);
        self.traverse(world, bounds, filter, |entity, position| {
            let distance_sq = pos.distance_squared(position);
            let best_sq = best.map_or(radius_sq, |(_, d)| d);
            if distance_sq <= radius_sq && distance_sq < best_sq && accept(entity) {
                best = Some((entity, distance_sq));
            }
        });
        best.map(|(entity, _)| entity)
    }

    /// Invokes `visit` for every entity within `radius` of `pos`, boundary
    /// included.
    pub fn query_radius(
        &self,
        world: &World,
        pos: Vec2,
        radius: f32,
        filter: FactionFilter,
        mut visit: impl FnMut(Entity),
    ) {
        let radius_sq = radius * radius;
        let bounds = self.radius_bounds(pos, radius);
        self.traverse(world, bounds, filter, |entity, position| {
            if pos.distance_squared(position) <= radius_sq {
                visit(entity);
            }
        });
    }

    /// Collects the result of [`SpatialGrid::query_radius`].
    #[must_use]
    pub fn entities_in_radius(
        &self,
        world: &World,
        pos: Vec2,
        radius: f32,
        filter: FactionFilter,
    ) -> Vec<Entity> {
        let mut found = Vec::new();
        self.query_radius(world, pos, radius, filter, |entity| found.push(entity));
        found
    }

    /// Entities linked into one bucket, head first.
    #[must_use]
    pub fn cell_entities(&self, world: &World, faction: u32, cell: usize) -> Vec<Entity> {
        let mut members = Vec::new();
        let Some(grid) = self.grids.get(faction as usize) else {
            return members;
        };
        let mut cursor = grid.heads.get(cell).copied().flatten();
        while let Some(entity) = cursor {
            members.push(entity);
            cursor = node_of(world, entity).and_then(|node| node.next);
        }
        members
    }

    fn radius_bounds(&self, pos: Vec2, radius: f32) -> CellBounds {
        let reach = Vec2::splat(radius);
        self.bounds(pos - reach, pos + reach)
    }

    fn traverse(
        &self,
        world: &World,
        bounds: CellBounds,
        filter: FactionFilter,
        mut visit: impl FnMut(Entity, Vec2),
    ) {
        for (faction, grid) in self.grids.iter().enumerate() {
            if grid.is_empty() || !filter.admits(faction) {
                continue;
            }
            for y in bounds.min_y..=bounds.max_y {
                for x in bounds.min_x..=bounds.max_x {
                    let mut cursor = grid.heads[x + y * self.cols];
                    while let Some(entity) = cursor {
                        cursor = node_of(world, entity).and_then(|node| node.next);
                        let position = world.get::<&Position>(entity).ok().map(|p| p.value);
                        if let Some(position) = position {
                            visit(entity, position);
                        }
                    }
                }
            }
        }
    }
}

fn clamp_axis(scaled: f32, cells: usize) -> usize {
    let truncated = scaled as i64;
    truncated.clamp(0, cells as i64 - 1) as usize
}

fn node_of(world: &World, entity: Entity) -> Option<SpatialNode> {
    world.get::<&SpatialNode>(entity).ok().map(|node| *node)
}

fn with_node(world: &mut World, entity: Entity, edit: impl FnOnce(&mut SpatialNode)) -> bool {
    match world.get::<&mut SpatialNode>(entity) {
        Ok(mut node) => {
            edit(&mut *node);
            true
        }
        Err(_) => false,
    }
}

fn write_node(world: &mut World, entity: Entity, node: SpatialNode) {
    if !with_node(world, entity, |slot| *slot = node) {
        let _ = world.insert_one(entity, node);
    }
}
