//! Native stack growth for the recursive walks over `Value` trees.
//!
//! Evaluation, reading, printing and comparison recurse through nested forms.
//! Each recursive step runs through [`guarded`], which moves onto a fresh heap
//! segment when the current stack runs low, so the configured recursion
//! limit holds on any thread, however small its stack.

/// Remaining stack below which a new segment is allocated.
const STACK_RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment.
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

pub(crate) fn guarded<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, f)
}
