use life_core::LiveSet;
use service_abi::Cell;

/// Batch stepping function run by a backend.
///
/// An `Err` fails only the request that produced it.
pub type StepKernel = fn(Vec<Cell>, u32) -> Result<Vec<Cell>, String>;

/// Standard B3/S23 rule applied `generations` times.
pub fn life_kernel(cells: Vec<Cell>, generations: u32) -> Result<Vec<Cell>, String> {
    let mut live: LiveSet = cells.into_iter().collect();
    live.advance(u64::from(generations.max(1)));
    Ok(live.to_vec())
}
