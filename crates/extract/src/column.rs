use billsieve_core::Line;

/// Estimates the x position of the amount column as the median `left` of each
/// line's rightmost word. An even count averages the two middle values.
pub fn estimate_amount_column(lines: &[Line]) -> Option<i32> {
    let mut lefts: Vec<i64> = lines
        .iter()
        .filter_map(Line::rightmost)
        .map(|w| i64::from(w.left))
        .collect();
    if lefts.is_empty() {
        return None;
    }
    lefts.sort_unstable();

    let mid = lefts.len() / 2;
    let median = if lefts.len() % 2 == 1 {
        lefts[mid]
    } else {
        (lefts[mid - 1] + lefts[mid]) / 2
    };
    i32::try_from(median).ok()
}

/// Whether `x` is close enough to the estimated column. With no estimate every
/// position qualifies.
pub fn near_column(x: i32, column: Option<i32>, tolerance: i32) -> bool {
    column.map_or(true, |col| (x - col).abs() <= tolerance)
}
