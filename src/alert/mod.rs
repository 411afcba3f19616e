/// Fiscal health classification.
///
/// Submodules:
/// - `thresholds` — autonomy/deficit thresholds and status classification.

pub mod thresholds;
