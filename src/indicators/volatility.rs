use crate::data::MarketData;
use crate::error::Result;

/// Average True Range over `period` bars, aligned one-to-one with the input.
///
/// True range is max(high − low, |high − prev_close|, |low − prev_close|);
/// the first bar has no previous close and uses high − low alone. The rolling
/// mean leaves the first `period − 1` positions unset; those are back-filled
/// from the first complete window so every aligned position carries a value.
/// A series shorter than `period` yields NaN throughout, which disables the
/// barrier comparisons downstream instead of failing.
pub fn atr_series(data: &MarketData, period: usize) -> Result<Vec<f64>> {
    let high = data.high()?;
    let low = data.low()?;
    let close = data.close()?;
    let n = close.len();

    let mut true_ranges = Vec::with_capacity(n);
    for i in 0..n {
        let h = high.get(i).unwrap_or(f64::NAN);
        let l = low.get(i).unwrap_or(f64::NAN);

        let tr = if i == 0 {
            h - l
        } else {
            let prev_c = close.get(i - 1).unwrap_or(f64::NAN);
            (h - l).max((h - prev_c).abs()).max((l - prev_c).abs())
        };
        true_ranges.push(tr);
    }

    let mut atr = vec![f64::NAN; n];
    if n >= period {
        let mut window_sum: f64 = true_ranges[..period].iter().sum();
        atr[period - 1] = window_sum / period as f64;
        for i in period..n {
            window_sum += true_ranges[i] - true_ranges[i - period];
            atr[i] = window_sum / period as f64;
        }

        // Back-fill the warm-up prefix from the first complete window.
        for i in 0..period - 1 {
            atr[i] = atr[period - 1];
        }
    }

    Ok(atr)
}
