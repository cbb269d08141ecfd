//! Brief writers.
//!
//! # Submodules
//!
//! - [`json`]: the full [`Brief`](crate::models::Brief) as JSON
//! - [`markdown`]: a readable Markdown rendering of the same brief
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── monthly_intel_2025-06-30.json
//! └── monthly_intel_2025-06-30.md
//! ```

pub mod json;
pub mod markdown;

/// `{output_dir}/monthly_intel_{brief_date}.{ext}`
pub fn output_path(output_dir: &str, brief_date: &str, ext: &str) -> String {
    format!(
        "{}/monthly_intel_{}.{}",
        output_dir.trim_end_matches('/'),
        brief_date,
        ext
    )
}
