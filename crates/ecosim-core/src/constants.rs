/// Largest valid arena dimension (world units). Keeps quadtree subdivision well conditioned.
pub const MAX_WORLD_SIZE: f64 = 2048.0;

/// Entries a quadtree node holds before it tries to subdivide.
pub const QUADTREE_CAPACITY: usize = 5;

/// Deepest level a quadtree node may be split to. The root is level 0.
pub const QUADTREE_MAX_DEPTH: usize = 6;

/// Number of Bernoulli trials behind one random wandering turn.
pub const WANDER_TURN_TRIALS: u32 = 10;

/// Upper bound for run lengths accepted by experiment helpers.
pub const MAX_EXPERIMENT_STEPS: usize = 1_000_000;

/// Offset added to the run seed for the scenario generator's stream.
pub const SCENARIO_SEED_OFFSET: u64 = 0x9E37_79B9_7F4A_7C15;
