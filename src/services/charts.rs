// src/services/charts.rs
//! Chart specs serialized as Plotly figures (`{data, layout}`) and rendered
//! into embeddable HTML fragments. Pages load plotly.js from the CDN once.
use log::error;
use serde::Serialize;

use crate::config::Currency;
use crate::models::{PriceSeries, StatementTable};
use super::calculations::{item_changes, ItemChanges};
use super::formatting::format_percent_label;
use super::statements::{select_net_debt_items, MissingLineItem, NetDebtSelection};

pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";

const CANVAS_WIDTH: u32 = 1570;
const CANVAS_HEIGHT: u32 = 500;
const GRID_COLOR: &str = "rgba(0, 0, 0, 0.1)";
const LINE_COLOR: &str = "#9370DB";
const FILL_COLOR: &str = "rgba(147, 112, 219, 0.2)";

#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Scatter(ScatterTrace),
    Bar(BarTrace),
}

impl Trace {
    pub fn name(&self) -> &str {
        match self {
            Trace::Scatter(t) => &t.name,
            Trace::Bar(t) => &t.name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScatterTrace {
    pub x: Vec<String>,
    pub y: Vec<f64>,
    pub mode: &'static str,
    pub name: String,
    pub fill: &'static str,
    pub fillcolor: &'static str,
    pub line: LineStyle,
    pub hovertemplate: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineStyle {
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct BarTrace {
    pub x: Vec<String>,
    pub y: Vec<f64>,
    pub name: String,
    pub marker: Marker,
    pub text: Vec<String>,
    pub hoverinfo: &'static str,
    pub textposition: &'static str,
    pub showlegend: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub xaxis: Axis,
    pub yaxis: Axis,
    pub height: u32,
    pub width: u32,
    pub plot_bgcolor: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<Margin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barmode: Option<&'static str>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Axis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<AxisTitle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showgrid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gridcolor: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showline: Option<bool>,
    pub linecolor: &'static str,
    pub linewidth: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AxisTitle {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Margin {
    pub t: u32,
    pub l: u32,
    pub r: u32,
    pub b: u32,
}

impl ChartSpec {
    /// `<div>` plus an inline `Plotly.newPlot` call. Assumes plotly.js is
    /// already loaded on the page.
    pub fn to_html(&self, div_id: &str) -> String {
        format!(
            "<div id=\"{id}\" class=\"plotly-graph-div\" style=\"height:{h}px; width:{w}px;\"></div>\n\
             <script type=\"text/javascript\">Plotly.newPlot(\"{id}\", {data}, {layout}, {{\"responsive\": true}});</script>",
            id = div_id,
            h = self.layout.height,
            w = self.layout.width,
            data = script_json(&self.data),
            layout = script_json(&self.layout),
        )
    }
}

fn script_json<T: Serialize>(value: &T) -> String {
    match serde_json::to_string(value) {
        // keep "</script>" inside strings from closing the tag
        Ok(json) => json.replace("</", "<\\/"),
        Err(e) => {
            error!("Failed to serialize chart: {}", e);
            "null".to_string()
        }
    }
}

fn grid_axis(title: &str) -> Axis {
    Axis {
        title: Some(AxisTitle { text: title.to_string() }),
        showgrid: Some(true),
        gridcolor: Some(GRID_COLOR),
        showline: None,
        linecolor: "gray",
        linewidth: 2,
    }
}

/// Filled line of daily closes, hover label `dd-mm-yyyy` and the price with
/// the currency symbol.
pub fn build_price_line_chart(series: &PriceSeries, currency: &Currency) -> ChartSpec {
    let (x, y) = series.points.iter()
        .map(|p| (p.date.format("%Y-%m-%d").to_string(), p.close))
        .unzip();

    let trace = ScatterTrace {
        x,
        y,
        mode: "lines",
        name: format!("Close ({})", currency.code),
        fill: "tozeroy",
        fillcolor: FILL_COLOR,
        line: LineStyle { color: LINE_COLOR },
        hovertemplate: format!(
            "<b>Date</b>: %{{x|%d-%m-%Y}}<br><b>Price ({})</b>: {}%{{y:.2f}}<extra></extra>",
            currency.code, currency.symbol
        ),
    };

    ChartSpec {
        data: vec![Trace::Scatter(trace)],
        layout: Layout {
            xaxis: grid_axis("Date"),
            yaxis: grid_axis("Price"),
            height: CANVAS_HEIGHT,
            width: CANVAS_WIDTH,
            plot_bgcolor: "white",
            margin: Some(Margin { t: 0, l: 0, r: 0, b: 0 }),
            barmode: None,
        },
    }
}

fn display_name(item: &str) -> String {
    item.replace("Total Debt", "Financial Debt")
}

/// One bar series per line item, grouped by comparison year. Colors follow
/// `palette` in series order.
pub fn build_yoy_bar_chart(changes: &[ItemChanges], palette: &[&'static str]) -> ChartSpec {
    let data = changes.iter()
        .zip(palette.iter().cycle())
        .map(|(item, &color)| {
            Trace::Bar(BarTrace {
                x: item.changes.iter().map(|(year, _)| year.to_string()).collect(),
                y: item.changes.iter().map(|(_, v)| *v).collect(),
                name: display_name(&item.item),
                marker: Marker { color },
                text: item.changes.iter().map(|(_, v)| format_percent_label(*v)).collect(),
                hoverinfo: "text",
                textposition: "auto",
                showlegend: true,
            })
        })
        .collect();

    let axis = Axis {
        showline: Some(true),
        linecolor: "black",
        linewidth: 1,
        ..Axis::default()
    };

    ChartSpec {
        data,
        layout: Layout {
            xaxis: axis.clone(),
            yaxis: axis,
            height: CANVAS_HEIGHT,
            width: CANVAS_WIDTH,
            plot_bgcolor: "rgba(0,0,0,0)",
            margin: None,
            barmode: Some("group"),
        },
    }
}

/// Year-over-year change of debt and cash (and net debt, when reported).
pub fn build_net_debt_chart(
    balance_sheet: &StatementTable,
    comparison_years: &[i32],
) -> Result<(ChartSpec, NetDebtSelection), MissingLineItem> {
    let selection = select_net_debt_items(balance_sheet)?;
    let changes: Vec<ItemChanges> = selection.items().iter()
        .map(|item| item_changes(balance_sheet, item, comparison_years))
        .collect();

    Ok((build_yoy_bar_chart(&changes, selection.palette()), selection))
}
