use ordered_float::OrderedFloat;

/// Robust 3-point median filter.
/// End points reuse themselves as the missing neighbour so the length is kept.
pub fn median3(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let n = values.len();
    let mut out = Vec::with_capacity(n);

    for i in 0..n {
        let a0 = if i > 0 { values[i - 1] } else { values[i] };
        let a1 = values[i];
        let a2 = if i + 1 < n { values[i + 1] } else { values[i] };

        let mut win = [OrderedFloat(a0), OrderedFloat(a1), OrderedFloat(a2)];
        win.sort();
        out.push(win[1].into_inner()); // median
    }

    out
}
