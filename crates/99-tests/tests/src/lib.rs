//! Cross-crate tests for the Game of Life runtime.

#[cfg(test)]
mod support;

#[cfg(test)]
mod batch_equivalence;

#[cfg(test)]
mod native_e2e;

#[cfg(test)]
mod staleness;
