//! The program evaluator: runs every rung of a program, in resolved
//! order, against one working image for one scan.

use crate::element::Program;
use crate::error::SoftErrorCounters;
use crate::fb::BlockStateTable;
use crate::image::Image;
use crate::resolver::ExecutionOrder;
use crate::rung;

/// Everything the program evaluator carries between scans: the
/// function-block side table. `Program`'s static rungs never change
/// during execution, so they aren't part of this — only the state is.
#[derive(Debug, Clone, Default)]
pub struct ProgramState {
    pub blocks: BlockStateTable,
}

impl ProgramState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }
}

/// Run one scan: walk `order` over `program.rungs`, feeding each rung
/// the current working image so later rungs in the order observe
/// earlier rungs' writes within this same scan. `previous_image` is
/// the image committed at the end of the *prior* scan, consulted only
/// by edge-detecting function blocks inside `rung::evaluate`.
///
/// Returns the scan's output image (`image_in` merged with every
/// rung's delta, in order).
pub fn run_scan(
    program: &Program,
    order: &ExecutionOrder,
    image_in: &Image,
    previous_image: &Image,
    dt: f64,
    state: &mut ProgramState,
    counters: &SoftErrorCounters,
) -> Image {
    let mut working = image_in.clone();

    for &rung_index in order {
        let rung = &program.rungs[rung_index];
        let result = rung::evaluate(rung, &working, previous_image, dt, &mut state.blocks, counters);
        working.merge(&result.delta);
    }

    working
}
