//! Plain-text analysis reports.

use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::Local;

use crate::config::{AgencyMetrics, ConnectionRow, MunicipalityStats};
use crate::data::aggregate::BenefitStats;
use crate::metrics::communities::Partition;
use crate::metrics::stats::{concentration, ValueSummary};
use crate::metrics::structure::NetworkMetrics;

const RULE: &str = "====================================================";

/// Integer with `.` thousands separators: `1.234.567`.
pub fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

/// Brazilian currency: `R$ 1.234.567,89`.
pub fn brl(v: f64) -> String {
    let cents = (v.abs() * 100.0).round();
    let whole = (cents / 100.0).trunc() as usize;
    let frac = (cents % 100.0) as usize;
    let sign = if v < 0.0 && cents > 0.0 { "-" } else { "" };
    format!("R$ {sign}{},{frac:02}", thousands(whole))
}

fn clip(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn network_section(out: &mut String, n: &NetworkMetrics) {
    let _ = writeln!(out, "  - Nodes: {}", thousands(n.nodes));
    let _ = writeln!(out, "  - Edges: {}", thousands(n.edges));
    let _ = writeln!(out, "  - Density: {:.4}", n.density);
    let _ = writeln!(out, "  - Average degree: {:.2}", n.avg_degree);
    let _ = writeln!(out, "  - Average clustering: {:.3}", n.avg_clustering);
    let _ = writeln!(out, "  - Connected components: {}", n.connected_components);
    match n.avg_shortest_path {
        Some(l) => {
            let _ = writeln!(
                out,
                "  - Average shortest path (largest component, {} nodes): {l:.2}",
                n.largest_component
            );
        }
        None => {
            let _ = writeln!(out, "  - Average shortest path: n/a");
        }
    }
    if let Some(k) = n.path_sources {
        let _ = writeln!(
            out,
            "  - Betweenness and path length estimated from {} sources",
            thousands(k)
        );
    }
    if n.edges == 0 {
        let _ = writeln!(out, "  ! The network has no edges; centrality scores are all zero.");
    }
}

fn community_section(out: &mut String, partition: &Partition) {
    let _ = writeln!(out, "  - Communities: {}", partition.len());
    let _ = writeln!(out, "  - Modularity: {:.4}", partition.modularity);
    for c in partition.communities.iter().filter(|c| c.members.len() > 1).take(5) {
        let _ = writeln!(
            out,
            "    * {} ({} members, cohesion {:.3}) led by {}",
            c.id,
            c.members.len(),
            c.cohesion,
            clip(&c.label, 60)
        );
    }
}

/// Inputs of the grants report.
pub struct GrantsReport<'a> {
    /// Sorted by total value, largest first.
    pub agencies: &'a [AgencyMetrics],
    pub connections: &'a [ConnectionRow],
    /// Agreed values of every kept row.
    pub values: &'a ValueSummary,
    pub network: &'a NetworkMetrics,
    pub partition: &'a Partition,
}

pub fn grants_report(r: &GrantsReport<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "NETWORK ANALYSIS REPORT - PUBLIC GRANTS (CONVÊNIOS)");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Generated: {}", Local::now().format("%d/%m/%Y %H:%M"));
    let _ = writeln!(out, "Connections analysed: {}", thousands(r.connections.len()));
    let _ = writeln!(out);

    let _ = writeln!(out, "1. MOST ACTIVE AGENCY");
    if let Some(top) = r.agencies.first() {
        let _ = writeln!(out, "  - Name: {}", clip(&top.agency, 80));
        let _ = writeln!(out, "  - Total value: {}", brl(top.total_value));
        let _ = writeln!(out, "  - Recipients: {}", thousands(top.recipients));
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "2. TOP 3 AGENCIES BY VALUE");
    for (i, a) in r.agencies.iter().take(3).enumerate() {
        let _ = writeln!(
            out,
            "  {}. {}: {}",
            i + 1,
            clip(&a.agency, 60),
            brl(a.total_value)
        );
    }
    let _ = writeln!(out);

    let mut by_uf: HashMap<&str, usize> = HashMap::new();
    for c in r.connections {
        *by_uf.entry(c.uf.as_str()).or_insert(0) += 1;
    }
    let mut ufs: Vec<(&str, usize)> = by_uf.into_iter().collect();
    ufs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let top_ufs: Vec<&str> = ufs.iter().take(3).map(|(uf, _)| *uf).collect();
    let _ = writeln!(out, "3. GEOGRAPHIC DISTRIBUTION");
    let _ = writeln!(out, "  - UFs with most connections: {}", top_ufs.join(", "));
    let _ = writeln!(out, "  - UFs served: {}", ufs.len());
    let _ = writeln!(out);

    let _ = writeln!(out, "4. GENERAL STATISTICS");
    let _ = writeln!(out, "  - Mean value per agreement: {}", brl(r.values.mean));
    let _ = writeln!(out, "  - Median value: {}", brl(r.values.median));
    let _ = writeln!(out, "  - Largest single agreement: {}", brl(r.values.max));
    let _ = writeln!(out, "  - Agencies analysed: {}", r.agencies.len());
    let _ = writeln!(out);

    let totals: Vec<f64> = r.agencies.iter().map(|a| a.total_value).collect();
    let _ = writeln!(out, "5. RESOURCE CONCENTRATION");
    let _ = writeln!(
        out,
        "  - Top 10 agencies hold {:.1}% of the total value",
        concentration(&totals, 10)
    );
    let _ = writeln!(
        out,
        "  - Top 5 agencies hold {:.1}% of the total value",
        concentration(&totals, 5)
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "6. BIPARTITE NETWORK");
    network_section(&mut out, r.network);
    let _ = writeln!(out);

    let _ = writeln!(out, "7. AGENCY COLLABORATION COMMUNITIES");
    community_section(&mut out, r.partition);
    let _ = writeln!(out, "{RULE}");
    out
}

/// Inputs of the benefits report.
pub struct BenefitsReport<'a> {
    pub stats: &'a BenefitStats,
    pub network: &'a NetworkMetrics,
    pub partition: &'a Partition,
    pub top_municipalities: &'a [&'a MunicipalityStats],
    pub threshold: f64,
}

pub fn benefits_report(r: &BenefitsReport<'_>) -> String {
    let g = &r.stats.general;
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "ANALYSIS REPORT - AUXÍLIO BRASIL PAYMENTS");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Generated: {}", Local::now().format("%d/%m/%Y %H:%M"));
    if let Some(period) = &g.period {
        let _ = writeln!(out, "Competence: {period}");
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "1. GENERAL STATISTICS");
    let _ = writeln!(out, "  - Records: {}", thousands(g.records));
    let _ = writeln!(out, "  - Municipalities: {}", thousands(g.municipalities));
    let _ = writeln!(
        out,
        "  - Unique beneficiaries: {}",
        thousands(g.unique_beneficiaries)
    );
    let _ = writeln!(out, "  - Total distributed: {}", brl(g.value_total));
    let _ = writeln!(out, "  - Mean installment: {}", brl(g.value_mean));
    let _ = writeln!(out, "  - Median installment: {}", brl(g.value_median));
    let id = &r.stats.identification;
    let _ = writeln!(
        out,
        "  - Rows with CPF: {} ({:.1}%)",
        thousands(id.with_cpf),
        id.with_cpf_percent
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "2. TOP MUNICIPALITIES BY TOTAL VALUE");
    for (i, m) in r.top_municipalities.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:>2}. {}/{}: {} ({} beneficiaries)",
            i + 1,
            clip(&m.name, 40),
            m.uf,
            brl(m.value_total),
            thousands(m.unique_beneficiaries)
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "3. SIMILARITY NETWORK (cosine > {:.2})",
        r.threshold
    );
    network_section(&mut out, r.network);
    let _ = writeln!(out);

    let _ = writeln!(out, "4. COMMUNITIES");
    community_section(&mut out, r.partition);
    let _ = writeln!(out, "{RULE}");
    out
}
