// id.rs — Stable arena identifiers for the call-graph program
//
// Routines, call edges, and region markers live in flat vectors inside
// `Program`; these IDs index those vectors. Allocated in document order
// during load, so iteration over IDs reproduces document order.

/// Index of a routine in `Program::routines`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutineId(pub u32);

/// Index of a call edge in `Program::calls`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u32);

/// Index of a kernel region marker in `Program::regions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub u32);

impl RoutineId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl EdgeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl RegionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Allocator for arena IDs. Produces monotonically increasing IDs in
/// allocation (document) order, ensuring deterministic assignment.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next_routine: u32,
    next_edge: u32,
    next_region: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_routine(&mut self) -> RoutineId {
        let id = RoutineId(self.next_routine);
        self.next_routine += 1;
        id
    }

    pub fn alloc_edge(&mut self) -> EdgeId {
        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        id
    }

    pub fn alloc_region(&mut self) -> RegionId {
        let id = RegionId(self.next_region);
        self.next_region += 1;
        id
    }
}
