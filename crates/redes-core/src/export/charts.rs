//! SVG charts: bar charts, histograms and network drawings.
//!
//! Charts are rendered as SVG text; [`crate::export::raster`] turns them
//! into PNG.

use std::f64::consts::PI;
use std::fmt::Write as _;

use petgraph::graph::NodeIndex;

use crate::export::graph_formats::xml_escape;
use crate::graph::network::Network;

const WIDTH: f64 = 1000.0;
const HEIGHT: f64 = 700.0;
const MARGIN: f64 = 60.0;
const LABEL_WIDTH: usize = 40;

/// Categorical palette; community `i` uses `PALETTE[i % len]`.
const PALETTE: &[&str] = &[
    "#4c72b0", "#dd8452", "#55a868", "#c44e52", "#8172b3", "#937860", "#da8bc3", "#8c8c8c",
    "#ccb974", "#64b5cd",
];

/// Compact amount: `1.2 bi`, `35.0 mi`, `12.5 mil`, `980`.
pub fn short_amount(v: f64) -> String {
    let a = v.abs();
    if a >= 1e9 {
        format!("{:.1} bi", v / 1e9)
    } else if a >= 1e6 {
        format!("{:.1} mi", v / 1e6)
    } else if a >= 1e3 {
        format!("{:.1} mil", v / 1e3)
    } else {
        format!("{v:.0}")
    }
}

fn truncate_label(s: &str) -> String {
    if s.chars().count() > LABEL_WIDTH {
        let head: String = s.chars().take(LABEL_WIDTH).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

fn open_svg(out: &mut String, title: &str) {
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
    );
    let _ = writeln!(out, r#"<rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        out,
        r#"<text x="{}" y="30" text-anchor="middle" font-size="18" font-weight="bold">{}</text>"#,
        WIDTH / 2.0,
        xml_escape(title)
    );
}

/// Horizontal bars, one per `(label, value)`, in the given order.
pub fn bar_chart(title: &str, x_label: &str, bars: &[(String, f64)], color: &str) -> String {
    let mut out = String::new();
    open_svg(&mut out, title);

    let left = 330.0;
    let plot_w = WIDTH - left - MARGIN;
    let plot_h = HEIGHT - 2.0 * MARGIN;
    let max = bars.iter().map(|b| b.1).fold(0.0, f64::max);
    let slot = if bars.is_empty() {
        0.0
    } else {
        plot_h / bars.len() as f64
    };

    for (i, (label, value)) in bars.iter().enumerate() {
        let y = MARGIN + i as f64 * slot;
        let w = if max > 0.0 { value / max * plot_w } else { 0.0 };
        let _ = writeln!(
            out,
            r#"<rect x="{left}" y="{:.1}" width="{w:.1}" height="{:.1}" fill="{color}"/>"#,
            y + slot * 0.1,
            slot * 0.8
        );
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end" font-size="11">{}</text>"#,
            left - 6.0,
            y + slot * 0.55,
            xml_escape(&truncate_label(label))
        );
        let _ = writeln!(
            out,
            r#"<text x="{:.1}" y="{:.1}" font-size="11">{}</text>"#,
            left + w + 4.0,
            y + slot * 0.55,
            short_amount(*value)
        );
    }
    let _ = writeln!(
        out,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="13">{}</text>"#,
        left + plot_w / 2.0,
        HEIGHT - 20.0,
        xml_escape(x_label)
    );
    out.push_str("</svg>\n");
    out
}

/// Equal-width bin counts over `[min, max]`; a constant input fills one bin.
pub fn histogram_bins(values: &[f64], bins: usize) -> (f64, f64, Vec<usize>) {
    let bins = bins.max(1);
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return (0.0, 0.0, vec![0; bins]);
    }
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut counts = vec![0usize; bins];
    let span = max - min;
    for v in finite {
        let idx = if span > 0.0 {
            (((v - min) / span) * bins as f64) as usize
        } else {
            0
        };
        counts[idx.min(bins - 1)] += 1;
    }
    (min, max, counts)
}

/// Vertical-bar histogram; with `log_counts` bar heights follow `ln(1 + count)`.
pub fn histogram(
    title: &str,
    x_label: &str,
    values: &[f64],
    bins: usize,
    log_counts: bool,
    color: &str,
) -> String {
    let (min, max, counts) = histogram_bins(values, bins);
    let mut out = String::new();
    open_svg(&mut out, title);

    let plot_w = WIDTH - 2.0 * MARGIN;
    let plot_h = HEIGHT - 2.0 * MARGIN - 20.0;
    let scale = |c: usize| {
        if log_counts {
            (1.0 + c as f64).ln()
        } else {
            c as f64
        }
    };
    let top = counts.iter().map(|&c| scale(c)).fold(0.0, f64::max);
    let bar_w = plot_w / counts.len() as f64;

    for (i, &c) in counts.iter().enumerate() {
        let h = if top > 0.0 { scale(c) / top * plot_h } else { 0.0 };
        let x = MARGIN + i as f64 * bar_w;
        let y = MARGIN + plot_h - h;
        let _ = writeln!(
            out,
            r#"<rect x="{x:.1}" y="{y:.1}" width="{:.1}" height="{h:.1}" fill="{color}" opacity="0.8"><title>{c}</title></rect>"#,
            (bar_w - 1.0).max(0.5)
        );
    }

    let axis_y = MARGIN + plot_h;
    let _ = writeln!(
        out,
        r#"<line x1="{MARGIN}" y1="{axis_y:.1}" x2="{:.1}" y2="{axis_y:.1}" stroke="black"/>"#,
        MARGIN + plot_w
    );
    let _ = writeln!(
        out,
        r#"<text x="{MARGIN}" y="{:.1}" font-size="11">{}</text>"#,
        axis_y + 16.0,
        short_amount(min)
    );
    let _ = writeln!(
        out,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="end" font-size="11">{}</text>"#,
        MARGIN + plot_w,
        axis_y + 16.0,
        short_amount(max)
    );
    let y_label = if log_counts {
        "frequency (log)"
    } else {
        "frequency"
    };
    let _ = writeln!(
        out,
        r#"<text x="20" y="{:.1}" font-size="13" transform="rotate(-90 20 {:.1})" text-anchor="middle">{y_label}</text>"#,
        HEIGHT / 2.0,
        HEIGHT / 2.0
    );
    let _ = writeln!(
        out,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="13">{}</text>"#,
        WIDTH / 2.0,
        HEIGHT - 15.0,
        xml_escape(x_label)
    );
    out.push_str("</svg>\n");
    out
}

/// Fruchterman–Reingold positions in the unit square, by node position.
///
/// Nodes start evenly spaced on a circle, so the layout is deterministic.
/// Attraction is scaled by the edge weight relative to the heaviest edge.
pub fn spring_layout(net: &Network, iterations: usize) -> Vec<(f64, f64)> {
    let n = net.node_count();
    if n == 0 {
        return Vec::new();
    }
    let mut pos: Vec<(f64, f64)> = (0..n)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / n as f64;
            (0.5 + 0.5 * angle.cos(), 0.5 + 0.5 * angle.sin())
        })
        .collect();
    if n == 1 {
        return vec![(0.5, 0.5)];
    }

    let adj = net.adjacency();
    let max_w = adj
        .iter()
        .flatten()
        .map(|&(_, w, _)| w)
        .fold(0.0, f64::max);
    let k = (1.0 / n as f64).sqrt();
    let mut temperature = 0.1;
    let cooling = temperature / (iterations as f64 + 1.0);
    let mut disp = vec![(0.0f64, 0.0f64); n];

    for _ in 0..iterations {
        disp.fill((0.0, 0.0));
        for i in 0..n {
            for j in (i + 1)..n {
                let dx = pos[i].0 - pos[j].0;
                let dy = pos[i].1 - pos[j].1;
                let d = (dx * dx + dy * dy).sqrt().max(0.01);
                let f = k * k / d;
                disp[i].0 += dx / d * f;
                disp[i].1 += dy / d * f;
                disp[j].0 -= dx / d * f;
                disp[j].1 -= dy / d * f;
            }
        }
        for (i, row) in adj.iter().enumerate() {
            for &(j, w, _) in row {
                if j <= i {
                    continue;
                }
                let strength = if max_w > 0.0 { w / max_w } else { 1.0 };
                let dx = pos[i].0 - pos[j].0;
                let dy = pos[i].1 - pos[j].1;
                let d = (dx * dx + dy * dy).sqrt().max(0.01);
                let f = d * d / k * strength;
                disp[i].0 -= dx / d * f;
                disp[i].1 -= dy / d * f;
                disp[j].0 += dx / d * f;
                disp[j].1 += dy / d * f;
            }
        }
        for (p, d) in pos.iter_mut().zip(&disp) {
            let len = (d.0 * d.0 + d.1 * d.1).sqrt();
            if len > 0.0 {
                let step = len.min(temperature);
                p.0 += d.0 / len * step;
                p.1 += d.1 / len * step;
            }
        }
        temperature -= cooling;
    }

    // Rescale into [0, 1]
    let (min_x, max_x) = pos
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.0), hi.max(p.0)));
    let (min_y, max_y) = pos
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.1), hi.max(p.1)));
    let sx = (max_x - min_x).max(1e-9);
    let sy = (max_y - min_y).max(1e-9);
    pos.iter()
        .map(|p| ((p.0 - min_x) / sx, (p.1 - min_y) / sy))
        .collect()
}

/// Ids of at most `max_nodes` nodes, highest degree first (ties by position).
pub fn chart_subset(net: &Network, max_nodes: usize) -> Vec<String> {
    let graph = net.inner_graph();
    let mut idx: Vec<NodeIndex> = graph.node_indices().collect();
    idx.sort_by(|a, b| {
        graph
            .edges(*b)
            .count()
            .cmp(&graph.edges(*a).count())
            .then_with(|| a.index().cmp(&b.index()))
    });
    idx.truncate(max_nodes);
    idx.sort_by_key(|i| i.index());
    idx.into_iter().map(|i| graph[i].id.clone()).collect()
}

/// Draw `net` (trimmed to `max_nodes` by degree) with node area following
/// `value`, colour following community and the ten largest nodes labelled.
pub fn network_chart(net: &Network, title: &str, max_nodes: usize, iterations: usize) -> String {
    let ids = chart_subset(net, max_nodes);
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let sub = if ids.len() < net.node_count() {
        net.induced(&id_refs)
    } else {
        net.clone()
    };

    let layout = spring_layout(&sub, iterations);
    let graph = sub.inner_graph();
    let plot_w = WIDTH - 2.0 * MARGIN;
    let plot_h = HEIGHT - 2.0 * MARGIN;
    let to_px = |p: (f64, f64)| (MARGIN + p.0 * plot_w, MARGIN + 10.0 + p.1 * (plot_h - 10.0));

    let mut out = String::new();
    open_svg(&mut out, title);

    let max_w = sub.edges().iter().map(|e| e.2.weight).fold(0.0, f64::max);
    let _ = writeln!(out, r##"<g stroke="#999999">"##);
    for e in graph.edge_indices() {
        if let Some((a, b)) = graph.edge_endpoints(e) {
            let (x1, y1) = to_px(layout[a.index()]);
            let (x2, y2) = to_px(layout[b.index()]);
            let w = graph[e].weight;
            let width = if max_w > 0.0 { 0.5 + 2.5 * w / max_w } else { 0.5 };
            let _ = writeln!(
                out,
                r#"<line x1="{x1:.1}" y1="{y1:.1}" x2="{x2:.1}" y2="{y2:.1}" stroke-width="{width:.2}" stroke-opacity="0.4"/>"#
            );
        }
    }
    out.push_str("</g>\n");

    let max_value = sub.nodes().map(|n| n.value).fold(0.0, f64::max);
    let radius = |v: f64| {
        if max_value > 0.0 {
            3.0 + 15.0 * (v / max_value).sqrt()
        } else {
            5.0
        }
    };

    for idx in graph.node_indices() {
        let node = &graph[idx];
        let (x, y) = to_px(layout[idx.index()]);
        let fill = node
            .community
            .map(|c| PALETTE[c % PALETTE.len()])
            .unwrap_or("#f08080");
        let _ = writeln!(
            out,
            r##"<circle cx="{x:.1}" cy="{y:.1}" r="{:.1}" fill="{fill}" stroke="#333333" stroke-width="0.5" fill-opacity="0.85"><title>{}</title></circle>"##,
            radius(node.value),
            xml_escape(&node.label)
        );
    }

    let mut biggest: Vec<NodeIndex> = graph.node_indices().collect();
    biggest.sort_by(|a, b| {
        graph[*b]
            .value
            .total_cmp(&graph[*a].value)
            .then_with(|| a.index().cmp(&b.index()))
    });
    for idx in biggest.into_iter().take(10) {
        let node = &graph[idx];
        let (x, y) = to_px(layout[idx.index()]);
        let _ = writeln!(
            out,
            r#"<text x="{x:.1}" y="{:.1}" text-anchor="middle" font-size="9">{}</text>"#,
            y - radius(node.value) - 2.0,
            xml_escape(&truncate_label(&node.label))
        );
    }

    out.push_str("</svg>\n");
    out
}
