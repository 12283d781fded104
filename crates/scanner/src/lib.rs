//! mmbake Definition Scanner
//!
//! Walks a directory tree depth-first and turns every recognised file into
//! a [`Definition`]: the raw diagram text plus the base name its rendered
//! artifacts will be written under.
//!
//! ```text
//! diagrams/
//! ├── flow.mermaid        ──▶  Definition { output_name: "flow", .. }
//! ├── notes.txt               (skipped)
//! └── nested/
//!     ├── seq.mermaid     ──▶  Definition { output_name: "seq", .. }
//!     └── guide.md        ──▶  one Definition per {{< mermaid >}} block
//!                              (only with shortcode scanning enabled)
//! ```
//!
//! The scanner is lazy and single-pass. Files are read as they are yielded,
//! and the first filesystem error ends the sequence.

pub mod definition;
pub mod scan;
pub mod shortcode;

pub use definition::*;
pub use scan::*;
