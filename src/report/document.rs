//! Report content, independent of page layout.

use super::format::{percent, ratio_percent, thousands, usd_opt, usd_whole};
use super::inputs::{ReportInputs, SentimentLine};

pub const REPORT_TITLE: &str = "Trading Behavior vs Market Sentiment Analysis";
pub const REPORT_SUBTITLE: &str = "Data Science Assignment - Web3 Trading Team";

pub const TABLE_HEADERS: [&str; 5] = [
    "Sentiment",
    "Trades",
    "Total Volume (USD)",
    "Avg PnL (USD)",
    "Win Rate",
];

/// One flowable unit of the report.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title(String),
    Subtitle(String),
    Heading(String),
    Paragraph(String),
    /// Bulleted item with a bold lead-in
    Bullet { label: String, text: String },
    Table { headers: Vec<String>, rows: Vec<Vec<String>> },
    /// Vertical gap in inches
    Spacer(f32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub title: String,
    pub blocks: Vec<Block>,
}

fn or_na(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("n/a")
}

/// Build the full report from the analysis outputs.
pub fn build_document(inputs: &ReportInputs) -> Document {
    let mut blocks = vec![
        Block::Title(REPORT_TITLE.to_string()),
        Block::Spacer(0.2),
        Block::Subtitle(REPORT_SUBTITLE.to_string()),
        Block::Spacer(0.3),
    ];

    executive_summary(inputs, &mut blocks);
    key_findings(inputs, &mut blocks);
    findings_table(&inputs.sentiment, &mut blocks);
    sentiment_insights(inputs, &mut blocks);
    recommendations(&mut blocks);
    methodology(inputs, &mut blocks);
    conclusion(inputs, &mut blocks);

    Document {
        title: REPORT_TITLE.to_string(),
        blocks,
    }
}

fn date_span(inputs: &ReportInputs) -> (&str, &str) {
    let range = &inputs.summary.date_range;
    (or_na(&range.start), or_na(&range.end))
}

fn executive_summary(inputs: &ReportInputs, blocks: &mut Vec<Block>) {
    let summary = &inputs.summary;
    let insights = &summary.key_insights;
    let (start, end) = date_span(inputs);

    blocks.push(Block::Heading("Executive Summary".to_string()));
    blocks.push(Block::Paragraph(format!(
        "This report presents a comprehensive analysis of the relationship between trader behavior and market \
         sentiment. The analysis covers {} trades from {} to {}, correlated with Bitcoin Fear & Greed Index data; \
         {} of them fall on days with a sentiment reading. Key findings reveal differences in trading behavior \
         across market sentiment conditions, with {} periods showing the highest average profitability and {} \
         periods showing the highest trading volume.",
        thousands(summary.total_trades as u64),
        start,
        end,
        thousands(summary.trades_with_sentiment as u64),
        or_na(&insights.highest_avg_pnl_sentiment),
        or_na(&insights.highest_volume_sentiment),
    )));
    blocks.push(Block::Spacer(0.2));
}

fn key_findings(inputs: &ReportInputs, blocks: &mut Vec<Block>) {
    let insights = &inputs.summary.key_insights;
    let ranked = inputs.summary.ranked_distribution();

    blocks.push(Block::Heading("Key Findings".to_string()));
    blocks.push(Block::Bullet {
        label: "Highest Average PnL:".to_string(),
        text: format!(
            "{} sentiment shows the best average profitability",
            or_na(&insights.highest_avg_pnl_sentiment)
        ),
    });
    blocks.push(Block::Bullet {
        label: "Highest Trading Volume:".to_string(),
        text: format!(
            "{} sentiment has the most trading activity",
            or_na(&insights.highest_volume_sentiment)
        ),
    });
    blocks.push(Block::Bullet {
        label: "Highest Win Rate:".to_string(),
        text: format!(
            "{} sentiment shows the best win rate",
            or_na(&insights.highest_win_rate_sentiment)
        ),
    });

    let distribution = match ranked.as_slice() {
        [] => "No trades matched a sentiment reading".to_string(),
        [(first, n)] => format!("{} periods account for all matched trades ({})", first, thousands(*n as u64)),
        [(first, n), (second, m), ..] => format!(
            "{} periods account for the most trades ({}), followed by {} ({})",
            first,
            thousands(*n as u64),
            second,
            thousands(*m as u64)
        ),
    };
    blocks.push(Block::Bullet {
        label: "Sentiment Distribution:".to_string(),
        text: distribution,
    });
    blocks.push(Block::Spacer(0.2));
}

fn findings_table(rows: &[SentimentLine], blocks: &mut Vec<Block>) {
    blocks.push(Block::Heading("Detailed Analysis by Sentiment".to_string()));
    blocks.push(Block::Table {
        headers: TABLE_HEADERS.iter().map(|h| h.to_string()).collect(),
        rows: rows
            .iter()
            .map(|r| {
                vec![
                    r.classification.clone(),
                    thousands(r.total_trades),
                    usd_whole(r.total_volume_usd),
                    usd_opt(r.avg_pnl),
                    ratio_percent(r.win_rate),
                ]
            })
            .collect(),
    });
    blocks.push(Block::Spacer(0.3));
}

fn sentiment_insights(inputs: &ReportInputs, blocks: &mut Vec<Block>) {
    let insights = &inputs.summary.key_insights;
    let riskiest = inputs
        .risk
        .iter()
        .filter_map(|r| r.avg_abs_pnl.map(|v| (v, r.classification.as_str())))
        .fold(None, |best: Option<(f64, &str)>, (v, c)| match best {
            Some((b, _)) if b >= v => best,
            _ => Some((v, c)),
        })
        .map(|(_, c)| c);

    blocks.push(Block::Heading("Insights by Sentiment Category".to_string()));

    for row in &inputs.sentiment {
        let class = row.classification.as_str();
        let mut text = format!(
            "{} trades with {} total volume. Average PnL of {} with a {} win rate.",
            thousands(row.total_trades),
            usd_whole(row.total_volume_usd),
            usd_opt(row.avg_pnl),
            ratio_percent(row.win_rate),
        );

        if let Some(margin) = inputs.profitability_of(class).and_then(|p| p.profit_margin) {
            text.push_str(&format!(" Share of net PnL across sentiments: {}.", percent(margin)));
        }
        if insights.highest_avg_pnl_sentiment.as_deref() == Some(class) {
            text.push_str(" Traders perform best on average in this regime, which may also signal reversal risk.");
        }
        if insights.highest_volume_sentiment.as_deref() == Some(class) {
            text.push_str(" Trading is most active here, pointing to both opportunity and risk.");
        }
        if riskiest == Some(class) {
            let abs = inputs.risk_of(class).and_then(|r| r.avg_abs_pnl);
            text.push_str(&format!(
                " Highest average absolute PnL ({}) indicates the largest risk exposure; size positions conservatively.",
                usd_opt(abs)
            ));
        }

        blocks.push(Block::Bullet {
            label: format!("{}:", class),
            text,
        });
    }
    blocks.push(Block::Spacer(0.3));
}

const RECOMMENDATIONS: [(&str, &str); 5] = [
    (
        "During Extreme Greed:",
        "While profitability can be high, traders should be cautious of potential market reversals. \
         Consider taking profits and reducing position sizes.",
    ),
    (
        "During Fear:",
        "High trading volume suggests opportunities exist, but increased volatility requires careful risk \
         management. Focus on quality setups with proper stop-losses.",
    ),
    (
        "During Extreme Fear:",
        "Highest risk period - use conservative position sizing and wait for clear reversal signals before \
         entering positions.",
    ),
    (
        "During Neutral:",
        "Balanced approach works best. Focus on consistent strategy execution without over-leveraging.",
    ),
    (
        "During Greed:",
        "Moderate bullish sentiment allows for balanced risk-taking. Maintain standard position sizing and \
         risk management protocols.",
    ),
];

fn recommendations(blocks: &mut Vec<Block>) {
    blocks.push(Block::Heading("Trading Strategy Recommendations".to_string()));
    for (label, text) in RECOMMENDATIONS {
        blocks.push(Block::Bullet {
            label: label.to_string(),
            text: text.to_string(),
        });
    }
    blocks.push(Block::Spacer(0.3));
}

fn methodology(inputs: &ReportInputs, blocks: &mut Vec<Block>) {
    let (start, end) = date_span(inputs);
    blocks.push(Block::Heading("Methodology".to_string()));
    blocks.push(Block::Paragraph(format!(
        "The analysis merged historical trading data from Hyperliquid with Bitcoin Fear & Greed Index data based \
         on trade dates. Key metrics calculated include: total trades, trading volume, average PnL, win rates, and \
         risk metrics (absolute PnL, standard deviation). The analysis covers all trades from {} to {}, with \
         sentiment classifications: Extreme Fear, Fear, Neutral, Greed, and Extreme Greed.",
        start, end
    )));
    blocks.push(Block::Spacer(0.3));
}

fn conclusion(inputs: &ReportInputs, blocks: &mut Vec<Block>) {
    let insights = &inputs.summary.key_insights;
    blocks.push(Block::Heading("Conclusion".to_string()));
    blocks.push(Block::Paragraph(format!(
        "The analysis reveals clear patterns in trading behavior across different market sentiment conditions. \
         {} periods offer the best average profitability but require caution. {} periods show the highest \
         trading activity, suggesting both opportunity and risk. Understanding these patterns can help traders \
         develop more informed strategies that adapt to market sentiment conditions.",
        or_na(&insights.highest_avg_pnl_sentiment),
        or_na(&insights.highest_volume_sentiment),
    )));
}
