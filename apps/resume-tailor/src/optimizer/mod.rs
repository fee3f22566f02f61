//! Resume optimizer: the structure-preserving rewrite engine and the generator that feeds it.
//!
//! Leaves first: `snapshot` captures a paragraph's runs and format, `redistribute`
//! spreads new text over the old run positions, `rewriter` rebuilds the
//! paragraph, `walker` drives all of it across the document tree, and
//! `section_generator` supplies the replacement text.

pub mod prompts;
pub mod redistribute;
pub mod rewriter;
pub mod section_generator;
pub mod snapshot;
pub mod walker;

pub use section_generator::SectionOptimizer;
pub use walker::{count_sections, for_each_section};
