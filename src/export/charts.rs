//! The nine PNG charts.
//!
//! Each chart is built as a [`Canvas`] by a pure function and then encoded.
//! Category order follows the tables: most active sentiment first for the
//! per-sentiment bars, scale order elsewhere.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use image::Rgb;
use tracing::{debug, info};

use super::canvas::{
    colors, compact_number, diverging_color, sentiment_color, text_width, Align, Canvas, YScale,
};
use crate::analysis::ChartConfig;
use crate::metrics::pearson;
use crate::models::{
    AnalysisResults, AnalyzedTrade, MonthlyRow, RiskRow, SentimentClass, SentimentMetrics,
    SideRow, TradeSide,
};

pub const TRADES_CHART: &str = "1_trades_per_sentiment.png";
pub const AVG_PNL_CHART: &str = "2_avg_pnl_per_sentiment.png";
pub const WIN_RATE_CHART: &str = "3_win_rate_per_sentiment.png";
pub const VOLUME_CHART: &str = "4_total_volume_per_sentiment.png";
pub const RISK_CHART: &str = "5_risk_metrics_per_sentiment.png";
pub const PNL_DISTRIBUTION_CHART: &str = "6_pnl_distribution.png";
pub const VOLUME_TIMESERIES_CHART: &str = "7_volume_timeseries.png";
pub const CORRELATION_CHART: &str = "8_correlation_heatmap.png";
pub const BUY_SELL_CHART: &str = "9_buy_vs_sell_pnl.png";

// Figure sizes in inches
const STANDARD_FIGURE: (f64, f64) = (10.0, 6.0);
const WIDE_FIGURE: (f64, f64) = (12.0, 6.0);
const TIMESERIES_FIGURE: (f64, f64) = (14.0, 6.0);
const HEATMAP_FIGURE: (f64, f64) = (8.0, 6.0);

const HISTOGRAM_ALPHA: f64 = 0.6;
const GRID_TICKS: usize = 5;
const SENTIMENT_AXIS: &str = "Market Sentiment";

/// Title and axis titles of one chart.
struct Labels {
    title: &'static str,
    x: &'static str,
    y: &'static str,
}

/// Render every chart into `dir`, one at a time.
pub fn render_charts(
    results: &AnalysisResults,
    trades: &[AnalyzedTrade],
    config: &ChartConfig,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    let dpi = config.dpi;
    let mut written = Vec::with_capacity(9);

    let mut save = |name: &str, canvas: Canvas| -> Result<()> {
        let path = dir.join(name);
        canvas.save(&path)?;
        debug!(path = %path.display(), width = canvas.width(), height = canvas.height(), "Wrote chart");
        written.push(path);
        Ok(())
    };

    save(TRADES_CHART, trades_per_sentiment(&results.sentiment, dpi))?;
    save(AVG_PNL_CHART, avg_pnl_per_sentiment(&results.sentiment, dpi))?;
    save(WIN_RATE_CHART, win_rate_per_sentiment(&results.sentiment, dpi))?;
    save(VOLUME_CHART, volume_per_sentiment(&results.sentiment, dpi))?;
    save(RISK_CHART, risk_per_sentiment(&results.risk, dpi))?;
    save(PNL_DISTRIBUTION_CHART, pnl_distribution(trades, config))?;
    save(VOLUME_TIMESERIES_CHART, volume_timeseries(&results.monthly, dpi))?;
    save(CORRELATION_CHART, correlation_heatmap(&results.sentiment, dpi))?;
    save(BUY_SELL_CHART, buy_vs_sell_pnl(&results.sides, dpi))?;

    info!(count = written.len(), dir = %dir.display(), dpi, "Charts rendered");
    Ok(written)
}

// === Bar charts ===

/// One category on a bar chart.
struct Bar {
    color: Rgb<u8>,
    label: String,
    value: Option<f64>,
}

/// Axis tick text for a sentiment, one word per line.
fn category_label(class: SentimentClass) -> String {
    class.as_str().replace(' ', "\n")
}

/// Draw one bar per slot, growing from zero (or the floor of a log scale).
fn draw_bars(canvas: &mut Canvas, scale: &YScale, bars: &[Bar]) {
    if bars.is_empty() {
        return;
    }
    let base = canvas.y_of(scale, 0.0);
    let slot = 1.0 / bars.len() as f64;

    for (i, bar) in bars.iter().enumerate() {
        canvas.x_tick_label(slot * (i as f64 + 0.5), &bar.label);
        let Some(value) = bar.value else { continue };
        let x0 = canvas.x_of(slot * (i as f64 + 0.2));
        let x1 = canvas.x_of(slot * (i as f64 + 0.8));
        let top = canvas.y_of(scale, value);
        canvas.fill_rect(x0, base, x1, top, bar.color);
    }
}

fn bar_chart(bars: &[Bar], scale: YScale, zero_line: bool, labels: &Labels, dpi: u32) -> Canvas {
    let mut canvas = Canvas::from_inches(STANDARD_FIGURE.0, STANDARD_FIGURE.1, dpi);
    canvas.grid(&scale, GRID_TICKS);
    draw_bars(&mut canvas, &scale, bars);
    if zero_line {
        let y = canvas.y_of(&scale, 0.0);
        let t = canvas.stroke();
        canvas.dashed_hline(y, colors::BLACK, t);
    }
    canvas.axes();
    canvas.y_tick_labels(&scale, GRID_TICKS);
    canvas.labels(labels.title, labels.x, labels.y);
    canvas
}

fn sentiment_bars<F>(rows: &[SentimentMetrics], value: F) -> Vec<Bar>
where
    F: Fn(&SentimentMetrics) -> Option<f64>,
{
    rows.iter()
        .map(|r| Bar {
            color: sentiment_color(r.classification),
            label: category_label(r.classification),
            value: value(r),
        })
        .collect()
}

fn present(bars: &[Bar]) -> impl Iterator<Item = f64> + '_ {
    bars.iter().filter_map(|b| b.value)
}

pub fn trades_per_sentiment(rows: &[SentimentMetrics], dpi: u32) -> Canvas {
    let bars = sentiment_bars(rows, |r| Some(r.total_trades as f64));
    let scale = YScale::including_zero(present(&bars));
    let labels = Labels {
        title: "Total Trades by Market Sentiment",
        x: SENTIMENT_AXIS,
        y: "Number of Trades",
    };
    bar_chart(&bars, scale, false, &labels, dpi)
}

pub fn avg_pnl_per_sentiment(rows: &[SentimentMetrics], dpi: u32) -> Canvas {
    let bars = sentiment_bars(rows, |r| r.avg_pnl);
    let scale = YScale::including_zero(present(&bars));
    let labels = Labels {
        title: "Average Closed PnL by Market Sentiment",
        x: SENTIMENT_AXIS,
        y: "Average PnL (USD)",
    };
    bar_chart(&bars, scale, true, &labels, dpi)
}

pub fn win_rate_per_sentiment(rows: &[SentimentMetrics], dpi: u32) -> Canvas {
    let bars = sentiment_bars(rows, |r| Some(r.win_rate));
    let labels = Labels {
        title: "Win Rate by Market Sentiment",
        x: SENTIMENT_AXIS,
        y: "Win Rate",
    };
    bar_chart(&bars, YScale::linear(0.0, 1.0), false, &labels, dpi)
}

pub fn volume_per_sentiment(rows: &[SentimentMetrics], dpi: u32) -> Canvas {
    let bars = sentiment_bars(rows, |r| Some(r.total_volume_usd));
    let scale = YScale::log(present(&bars));
    let labels = Labels {
        title: "Total Trading Volume by Market Sentiment",
        x: SENTIMENT_AXIS,
        y: "Total Volume (USD)",
    };
    bar_chart(&bars, scale, false, &labels, dpi)
}

pub fn risk_per_sentiment(rows: &[RiskRow], dpi: u32) -> Canvas {
    let bars: Vec<Bar> = rows
        .iter()
        .map(|r| Bar {
            color: sentiment_color(r.classification),
            label: category_label(r.classification),
            value: r.avg_abs_pnl,
        })
        .collect();
    let scale = YScale::including_zero(present(&bars));
    let labels = Labels {
        title: "Average Absolute PnL (Risk Proxy) by Market Sentiment",
        x: SENTIMENT_AXIS,
        y: "Average Absolute PnL (USD)",
    };
    bar_chart(&bars, scale, false, &labels, dpi)
}

/// Average PnL of sells and buys side by side for each sentiment.
pub fn buy_vs_sell_pnl(rows: &[SideRow], dpi: u32) -> Canvas {
    let classes: Vec<SentimentClass> = rows
        .iter()
        .map(|r| r.classification)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut canvas = Canvas::from_inches(STANDARD_FIGURE.0, STANDARD_FIGURE.1, dpi);
    let scale = YScale::including_zero(rows.iter().filter_map(|r| r.avg_pnl));
    canvas.grid(&scale, GRID_TICKS);

    let base = canvas.y_of(&scale, 0.0);
    let slot = 1.0 / classes.len().max(1) as f64;
    for (i, class) in classes.iter().enumerate() {
        canvas.x_tick_label(slot * (i as f64 + 0.5), &category_label(*class));
        for (j, side) in [TradeSide::Sell, TradeSide::Buy].into_iter().enumerate() {
            let Some(avg) = rows
                .iter()
                .find(|r| r.classification == *class && r.side == side)
                .and_then(|r| r.avg_pnl)
            else {
                continue;
            };
            let start = slot * (i as f64 + 0.1 + 0.4 * j as f64);
            let x0 = canvas.x_of(start);
            let x1 = canvas.x_of(start + slot * 0.4);
            let top = canvas.y_of(&scale, avg);
            canvas.fill_rect(x0, base, x1, top, side_color(side));
        }
    }

    let t = canvas.stroke();
    canvas.dashed_hline(base, colors::BLACK, t);
    canvas.axes();
    canvas.y_tick_labels(&scale, GRID_TICKS);
    canvas.legend(&[
        (side_color(TradeSide::Sell), TradeSide::Sell.as_str().to_string()),
        (side_color(TradeSide::Buy), TradeSide::Buy.as_str().to_string()),
    ]);
    canvas.labels(
        "Average PnL: Buy vs Sell by Market Sentiment",
        SENTIMENT_AXIS,
        "Average PnL (USD)",
    );
    canvas
}

fn side_color(side: TradeSide) -> Rgb<u8> {
    match side {
        TradeSide::Sell => colors::TEAL,
        TradeSide::Buy => colors::ORANGE,
    }
}

// === Distribution ===

/// Counts per equal-width bin over `range`; values outside the range are not counted.
pub fn histogram(values: &[f64], bins: usize, range: (f64, f64)) -> Vec<usize> {
    let mut counts = vec![0usize; bins];
    let (lo, hi) = range;
    if bins == 0 || hi <= lo {
        return counts;
    }

    let width = (hi - lo) / bins as f64;
    for v in values.iter().filter(|v| **v >= lo && **v <= hi) {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
}

/// Overlaid semi-transparent PnL histograms, one per sentiment in scale order.
pub fn pnl_distribution(trades: &[AnalyzedTrade], config: &ChartConfig) -> Canvas {
    let series: Vec<(SentimentClass, Vec<usize>)> = SentimentClass::ALL
        .iter()
        .filter_map(|class| {
            let values: Vec<f64> = trades
                .iter()
                .filter(|t| t.classification() == Some(*class))
                .filter_map(AnalyzedTrade::pnl)
                .collect();
            if values.is_empty() {
                return None;
            }
            Some((*class, histogram(&values, config.histogram_bins, config.histogram_range)))
        })
        .collect();

    let mut canvas = Canvas::from_inches(WIDE_FIGURE.0, WIDE_FIGURE.1, config.dpi);
    let peak = series
        .iter()
        .flat_map(|(_, counts)| counts.iter().copied())
        .max()
        .unwrap_or(0);
    let scale = YScale::including_zero([peak as f64]);
    canvas.grid(&scale, GRID_TICKS);

    let bins = config.histogram_bins.max(1) as f64;
    let base = canvas.y_of(&scale, 0.0);
    for (class, counts) in &series {
        for (i, count) in counts.iter().enumerate().filter(|(_, c)| **c > 0) {
            let x0 = canvas.x_of(i as f64 / bins);
            let x1 = canvas.x_of((i + 1) as f64 / bins) - 1;
            let top = canvas.y_of(&scale, *count as f64);
            canvas.blend_rect(x0, base, x1, top, sentiment_color(*class), HISTOGRAM_ALPHA);
        }
    }

    let (lo, hi) = config.histogram_range;
    for k in 0..=4 {
        let t = k as f64 / 4.0;
        canvas.x_tick_label(t, &compact_number(lo + (hi - lo) * t));
    }

    canvas.axes();
    canvas.y_tick_labels(&scale, GRID_TICKS);
    let legend: Vec<(Rgb<u8>, String)> = series
        .iter()
        .map(|(c, _)| (sentiment_color(*c), c.as_str().to_string()))
        .collect();
    canvas.legend(&legend);
    canvas.labels("PnL Distribution by Market Sentiment", "Closed PnL (USD)", "Frequency");
    canvas
}

// === Time series ===

/// Monthly volume, one line per sentiment over a shared month axis.
pub fn volume_timeseries(rows: &[MonthlyRow], dpi: u32) -> Canvas {
    let months: Vec<&str> = rows
        .iter()
        .map(|r| r.year_month.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut canvas = Canvas::from_inches(TIMESERIES_FIGURE.0, TIMESERIES_FIGURE.1, dpi);
    let scale = YScale::including_zero(rows.iter().map(|r| r.volume));
    canvas.grid(&scale, GRID_TICKS);

    let slot = 1.0 / months.len().max(1) as f64;
    let t = canvas.stroke() * 2;
    let mut legend = Vec::new();

    for class in SentimentClass::ALL {
        let points: Vec<(i64, i64)> = rows
            .iter()
            .filter(|r| r.classification == class)
            .filter_map(|r| {
                let i = months.iter().position(|m| *m == r.year_month)?;
                Some((canvas.x_of(slot * (i as f64 + 0.5)), canvas.y_of(&scale, r.volume)))
            })
            .collect();
        if points.is_empty() {
            continue;
        }

        let color = sentiment_color(class);
        for pair in points.windows(2) {
            canvas.line(pair[0], pair[1], color, t);
        }
        for point in &points {
            canvas.marker(*point, t * 2, color);
        }
        legend.push((color, class.as_str().to_string()));
    }

    // Thin out month labels so neighbours do not overlap
    let label_width = text_width("2024-01", canvas.font_scale(8.0)) as f64;
    let slot_width = canvas.plot().width() as f64 * slot;
    let every = (label_width * 1.2 / slot_width.max(1.0)).ceil().max(1.0) as usize;
    for (i, month) in months.iter().enumerate().step_by(every) {
        canvas.x_tick_label(slot * (i as f64 + 0.5), month);
    }

    canvas.axes();
    canvas.y_tick_labels(&scale, GRID_TICKS);
    canvas.legend(&legend);
    canvas.labels(
        "Monthly Trading Volume by Market Sentiment Over Time",
        "Month",
        "Trading Volume (USD)",
    );
    canvas
}

// === Correlation ===

/// Pearson correlation between sentiments across their headline metrics.
///
/// Entry `[i][j]` correlates the metric profiles of rows `i` and `j`; `None`
/// when fewer than two metrics are present in both or a profile is flat.
pub fn correlation_matrix(rows: &[SentimentMetrics]) -> Vec<Vec<Option<f64>>> {
    let profiles: Vec<[Option<f64>; 5]> = rows
        .iter()
        .map(|r| {
            [
                Some(r.total_trades as f64),
                Some(r.total_volume_usd),
                r.avg_pnl,
                Some(r.win_rate),
                r.avg_abs_pnl,
            ]
        })
        .collect();

    profiles
        .iter()
        .map(|a| profiles.iter().map(|b| pearson(a, b)).collect())
        .collect()
}

pub fn correlation_heatmap(rows: &[SentimentMetrics], dpi: u32) -> Canvas {
    let matrix = correlation_matrix(rows);
    let mut canvas = Canvas::from_inches(HEATMAP_FIGURE.0, HEATMAP_FIGURE.1, dpi);
    canvas.labels("Correlation Matrix: Trading Metrics by Sentiment", "", "");

    let n = matrix.len() as i64;
    if n == 0 {
        return canvas;
    }

    let plot = canvas.plot();
    let cell = (plot.width().min(plot.height()) / n).max(1);
    let left = plot.left + (plot.width() - cell * n) / 2;
    let gap = (cell / 40).max(1);
    let value_h = 8 * canvas.font_scale(9.0);
    let tick_gap = canvas.stroke() * 4;

    for (i, row) in matrix.iter().enumerate() {
        let y0 = plot.top + i as i64 * cell;
        let label = category_label(rows[i].classification);
        let label_h = 10 * canvas.font_scale(8.0) * label.lines().count() as i64;
        canvas.text(left - tick_gap, y0 + (cell - label_h) / 2, &label, 8.0, Align::Right, colors::AXIS);

        for (j, value) in row.iter().enumerate() {
            let x0 = left + j as i64 * cell;
            let color = value.map(diverging_color).unwrap_or(colors::GRID);
            canvas.fill_rect(x0 + gap, y0 + gap, x0 + cell - gap, y0 + cell - gap, color);

            let (text, ink) = match value {
                Some(v) if v.abs() > 0.6 => (format!("{:.2}", v), colors::WHITE),
                Some(v) => (format!("{:.2}", v), colors::BLACK),
                None => ("n/a".to_string(), colors::AXIS),
            };
            canvas.text(x0 + cell / 2, y0 + (cell - value_h) / 2, &text, 9.0, Align::Center, ink);
        }
    }

    let bottom = plot.top + n * cell + tick_gap;
    for (j, r) in rows.iter().enumerate() {
        let x = left + j as i64 * cell + cell / 2;
        canvas.text(x, bottom, &category_label(r.classification), 8.0, Align::Center, colors::AXIS);
    }
    canvas
}
