//! A small cave-layout domain used to exercise the engine end to end:
//! floor tiles and pillars on a fixed grid, a connectedness constraint over
//! the floor, and the largest open area as fitness.

use fi2pop::EvolutionLayer;
use fi2pop::models::{
    Crossover, DesignElement, GenericLevel, Mutation, MutationCounters, SpawnEnvironment,
    split_half_merge,
};
use rand::Rng;

pub const WIDTH: i32 = 8;
pub const HEIGHT: i32 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum CaveElementKind {
    Floor,
    Pillar,
    Spike,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum CaveElement {
    /// A walkable cell.
    Floor { x: i32, y: i32 },
    /// Blocks the cell it stands on.
    Pillar { x: i32, y: i32 },
    /// Never valid anywhere; exists to prove invalid elements cannot enter a
    /// candidate.
    Spike { x: i32, y: i32 },
}

fn in_bounds(x: i32, y: i32) -> bool {
    (0..WIDTH).contains(&x) && (0..HEIGHT).contains(&y)
}

impl DesignElement for CaveElement {
    type Kind = CaveElementKind;
    type Environment = CaveGrid;

    fn kind(&self) -> CaveElementKind {
        match self {
            CaveElement::Floor { .. } => CaveElementKind::Floor,
            CaveElement::Pillar { .. } => CaveElementKind::Pillar,
            CaveElement::Spike { .. } => CaveElementKind::Spike,
        }
    }

    fn spawn(&self, environment: &mut CaveGrid) {
        match self {
            CaveElement::Floor { x, y } => environment.set_floor(*x, *y),
            CaveElement::Pillar { x, y } => environment.set_blocked(*x, *y),
            CaveElement::Spike { .. } => {}
        }
    }

    fn mutate(&mut self, rng: &mut impl Rng) -> bool {
        match self {
            CaveElement::Floor { x, y } | CaveElement::Pillar { x, y } => {
                let dx = rng.random_range(-1..=1);
                let dy = rng.random_range(-1..=1);
                if dx == 0 && dy == 0 {
                    return false;
                }
                // No clamping; out-of-bounds shifts fail the validity check
                // and roll back.
                *x += dx;
                *y += dy;
                true
            }
            CaveElement::Spike { .. } => false,
        }
    }

    fn check_validity(&self) -> bool {
        match self {
            CaveElement::Floor { x, y } | CaveElement::Pillar { x, y } => in_bounds(*x, *y),
            CaveElement::Spike { .. } => false,
        }
    }
}

/// Occupancy grid rebuilt from a candidate's elements. Finalization runs a
/// flood fill over the walkable cells to count connected regions and measure
/// the largest one.
#[derive(Clone, Debug, PartialEq)]
pub struct CaveGrid {
    floor: Vec<bool>,
    blocked: Vec<bool>,
    pub floor_cells: usize,
    pub region_count: usize,
    pub largest_region: usize,
}

impl CaveGrid {
    pub fn new() -> Self {
        let cells = (WIDTH * HEIGHT) as usize;
        Self {
            floor: vec![false; cells],
            blocked: vec![false; cells],
            floor_cells: 0,
            region_count: 0,
            largest_region: 0,
        }
    }

    fn index(x: i32, y: i32) -> usize {
        (y * WIDTH + x) as usize
    }

    fn set_floor(&mut self, x: i32, y: i32) {
        self.floor[Self::index(x, y)] = true;
    }

    fn set_blocked(&mut self, x: i32, y: i32) {
        self.blocked[Self::index(x, y)] = true;
    }

    fn walkable(&self, x: i32, y: i32) -> bool {
        let index = Self::index(x, y);
        self.floor[index] && !self.blocked[index]
    }
}

impl SpawnEnvironment for CaveGrid {
    fn clear(&mut self) {
        self.floor.fill(false);
        self.blocked.fill(false);
        self.floor_cells = 0;
        self.region_count = 0;
        self.largest_region = 0;
    }

    fn finalize(&mut self) {
        let mut visited = vec![false; self.floor.len()];
        self.floor_cells = 0;
        self.region_count = 0;
        self.largest_region = 0;

        for start_y in 0..HEIGHT {
            for start_x in 0..WIDTH {
                if !self.walkable(start_x, start_y) || visited[Self::index(start_x, start_y)] {
                    continue;
                }

                let mut region_size = 0;
                let mut queue = vec![(start_x, start_y)];
                visited[Self::index(start_x, start_y)] = true;
                while let Some((x, y)) = queue.pop() {
                    region_size += 1;
                    for (nx, ny) in [(x + 1, y), (x - 1, y), (x, y + 1), (x, y - 1)] {
                        if in_bounds(nx, ny)
                            && self.walkable(nx, ny)
                            && !visited[Self::index(nx, ny)]
                        {
                            visited[Self::index(nx, ny)] = true;
                            queue.push((nx, ny));
                        }
                    }
                }

                self.region_count += 1;
                self.largest_region = self.largest_region.max(region_size);
                self.floor_cells += region_size;
            }
        }
    }
}

/// Adds, removes and perturbs cave elements through the transactional path.
pub struct CaveMutation {
    pub add_probability: f64,
    pub remove_probability: f64,
}

impl Default for CaveMutation {
    fn default() -> Self {
        Self {
            add_probability: 0.4,
            remove_probability: 0.2,
        }
    }
}

impl Mutation<CaveElement> for CaveMutation {
    fn mutate_impl(
        &self,
        level: &mut GenericLevel<CaveElement>,
        counters: &mut MutationCounters,
        rng: &mut impl Rng,
    ) {
        if rng.random_bool(self.add_probability) {
            let tile = CaveElement::Floor {
                x: rng.random_range(0..WIDTH),
                y: rng.random_range(0..HEIGHT),
            };
            counters.record_structural(level.add_checked(tile));
        }

        let floor_count = level.kind_count(CaveElementKind::Floor);
        if floor_count > 1 && rng.random_bool(self.remove_probability) {
            let index = rng.random_range(0..floor_count);
            level.remove_element(CaveElementKind::Floor, index);
            counters.record_structural(true);
        }

        for kind in [CaveElementKind::Floor, CaveElementKind::Pillar] {
            for index in 0..level.kind_count(kind) {
                if let Some(outcome) = level.mutate_element(kind, index, rng) {
                    counters.record(outcome);
                }
            }
        }
    }
}

pub struct CaveCrossover;

impl Crossover<CaveElement> for CaveCrossover {
    fn crossover(
        &self,
        lhs: &GenericLevel<CaveElement>,
        rhs: &GenericLevel<CaveElement>,
        rng: &mut impl Rng,
    ) -> GenericLevel<CaveElement> {
        let mut child = GenericLevel::new(CaveGrid::new());
        split_half_merge(lhs, rhs, &mut child, rng);
        child
    }
}

pub struct CaveLayer {
    pub start_tiles: usize,
    pub start_pillars: usize,
    pub spike_attempts: usize,
    mutation: CaveMutation,
    crossover: CaveCrossover,
}

impl CaveLayer {
    pub fn new(start_tiles: usize) -> Self {
        Self {
            start_tiles,
            start_pillars: 2,
            spike_attempts: 0,
            mutation: CaveMutation::default(),
            crossover: CaveCrossover,
        }
    }

    pub fn with_spike_attempts(mut self, attempts: usize) -> Self {
        self.spike_attempts = attempts;
        self
    }
}

impl EvolutionLayer for CaveLayer {
    type Element = CaveElement;
    type Mutation = CaveMutation;
    type Crossover = CaveCrossover;

    fn create_member(
        &mut self,
        previous: Option<&GenericLevel<CaveElement>>,
        rng: &mut impl Rng,
    ) -> GenericLevel<CaveElement> {
        let mut level = GenericLevel::new(CaveGrid::new());

        // A previous layer's solution sets the scale of fresh candidates.
        let tiles = previous
            .map(|solution| solution.kind_count(CaveElementKind::Floor).max(1))
            .unwrap_or(self.start_tiles);

        for _ in 0..tiles {
            level.add_checked(CaveElement::Floor {
                x: rng.random_range(0..WIDTH),
                y: rng.random_range(0..HEIGHT),
            });
        }
        for _ in 0..self.start_pillars {
            level.add_checked(CaveElement::Pillar {
                x: rng.random_range(0..WIDTH),
                y: rng.random_range(0..HEIGHT),
            });
        }
        for _ in 0..self.spike_attempts {
            level.add_checked(CaveElement::Spike {
                x: rng.random_range(0..WIDTH),
                y: rng.random_range(0..HEIGHT),
            });
        }

        level
    }

    fn calculate_fitness(&mut self, level: &GenericLevel<CaveElement>) -> f64 {
        level.environment().largest_region as f64
    }

    fn calculate_constraint_violations(&mut self, level: &GenericLevel<CaveElement>) -> f64 {
        let regions = level.environment().region_count;
        if regions <= 1 {
            0.0
        } else {
            (regions - 1) as f64
        }
    }

    fn mutation(&self) -> &CaveMutation {
        &self.mutation
    }

    fn crossover(&self) -> &CaveCrossover {
        &self.crossover
    }
}

/// Elements of one kind in content order, for multiset comparisons.
pub fn sorted_elements(level: &GenericLevel<CaveElement>, kind: CaveElementKind) -> Vec<CaveElement> {
    let mut elements = level.elements_of_kind(kind).to_vec();
    elements.sort();
    elements
}
