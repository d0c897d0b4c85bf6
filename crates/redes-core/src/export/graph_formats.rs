//! Graph-exchange files: GEXF 1.2 and GraphML.

use std::fmt::Write as _;

use chrono::Utc;

use crate::graph::network::Network;

/// Escape text for XML attribute values and character data.
pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}

/// Render `net` as GEXF 1.2 with `kind`, `uf`, `value` and `community`
/// node attributes and weighted edges.
pub fn to_gexf(net: &Network) -> String {
    let mut out = String::new();
    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        out,
        r#"<gexf xmlns="http://www.gexf.net/1.2draft" version="1.2">"#
    );
    let _ = writeln!(
        out,
        r#"  <meta lastmodifieddate="{}"><creator>redes {}</creator></meta>"#,
        Utc::now().format("%Y-%m-%d"),
        env!("CARGO_PKG_VERSION")
    );
    let _ = writeln!(out, r#"  <graph mode="static" defaultedgetype="undirected">"#);
    let _ = writeln!(out, r#"    <attributes class="node">"#);
    let _ = writeln!(out, r#"      <attribute id="0" title="kind" type="string"/>"#);
    let _ = writeln!(out, r#"      <attribute id="1" title="uf" type="string"/>"#);
    let _ = writeln!(out, r#"      <attribute id="2" title="value" type="double"/>"#);
    let _ = writeln!(out, r#"      <attribute id="3" title="community" type="integer"/>"#);
    let _ = writeln!(out, "    </attributes>");
    let _ = writeln!(out, r#"    <attributes class="edge">"#);
    let _ = writeln!(out, r#"      <attribute id="0" title="count" type="integer"/>"#);
    let _ = writeln!(out, "    </attributes>");

    let _ = writeln!(out, "    <nodes>");
    for node in net.nodes() {
        let _ = writeln!(
            out,
            r#"      <node id="{}" label="{}">"#,
            xml_escape(&node.id),
            xml_escape(&node.label)
        );
        let _ = writeln!(out, "        <attvalues>");
        let _ = writeln!(out, r#"          <attvalue for="0" value="{}"/>"#, node.kind);
        if let Some(uf) = &node.uf {
            let _ = writeln!(
                out,
                r#"          <attvalue for="1" value="{}"/>"#,
                xml_escape(uf)
            );
        }
        let _ = writeln!(out, r#"          <attvalue for="2" value="{}"/>"#, node.value);
        if let Some(c) = node.community {
            let _ = writeln!(out, r#"          <attvalue for="3" value="{c}"/>"#);
        }
        let _ = writeln!(out, "        </attvalues>");
        let _ = writeln!(out, "      </node>");
    }
    let _ = writeln!(out, "    </nodes>");

    let _ = writeln!(out, "    <edges>");
    for (i, (a, b, e)) in net.edges().into_iter().enumerate() {
        let _ = writeln!(
            out,
            r#"      <edge id="{i}" source="{}" target="{}" weight="{}">"#,
            xml_escape(a),
            xml_escape(b),
            e.weight
        );
        let _ = writeln!(
            out,
            r#"        <attvalues><attvalue for="0" value="{}"/></attvalues>"#,
            e.count
        );
        let _ = writeln!(out, "      </edge>");
    }
    let _ = writeln!(out, "    </edges>");
    let _ = writeln!(out, "  </graph>");
    let _ = writeln!(out, "</gexf>");
    out
}

const GRAPHML_NODE_KEYS: &[(&str, &str)] = &[
    ("label", "string"),
    ("kind", "string"),
    ("uf", "string"),
    ("value", "double"),
    ("beneficiaries", "long"),
    ("mean_value", "double"),
    ("community", "int"),
];

const GRAPHML_EDGE_KEYS: &[(&str, &str)] = &[
    ("weight", "double"),
    ("count", "long"),
    ("distance", "double"),
];

/// Render `net` as GraphML with every node and edge attribute.
pub fn to_graphml(net: &Network) -> String {
    let mut out = String::new();
    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        out,
        r#"<graphml xmlns="http://graphml.graphdrawing.org/xmlns" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://graphml.graphdrawing.org/xmlns http://graphml.graphdrawing.org/xmlns/1.0/graphml.xsd">"#
    );
    for (name, ty) in GRAPHML_NODE_KEYS {
        let _ = writeln!(
            out,
            r#"  <key id="{name}" for="node" attr.name="{name}" attr.type="{ty}"/>"#
        );
    }
    for (name, ty) in GRAPHML_EDGE_KEYS {
        let _ = writeln!(
            out,
            r#"  <key id="{name}" for="edge" attr.name="{name}" attr.type="{ty}"/>"#
        );
    }
    let _ = writeln!(out, r#"  <graph id="G" edgedefault="undirected">"#);

    for node in net.nodes() {
        let _ = writeln!(out, r#"    <node id="{}">"#, xml_escape(&node.id));
        let _ = writeln!(
            out,
            r#"      <data key="label">{}</data>"#,
            xml_escape(&node.label)
        );
        let _ = writeln!(out, r#"      <data key="kind">{}</data>"#, node.kind);
        if let Some(uf) = &node.uf {
            let _ = writeln!(out, r#"      <data key="uf">{}</data>"#, xml_escape(uf));
        }
        let _ = writeln!(out, r#"      <data key="value">{}</data>"#, node.value);
        let _ = writeln!(
            out,
            r#"      <data key="beneficiaries">{}</data>"#,
            node.beneficiaries
        );
        let _ = writeln!(
            out,
            r#"      <data key="mean_value">{}</data>"#,
            node.mean_value
        );
        if let Some(c) = node.community {
            let _ = writeln!(out, r#"      <data key="community">{c}</data>"#);
        }
        let _ = writeln!(out, "    </node>");
    }

    for (a, b, e) in net.edges() {
        let _ = writeln!(
            out,
            r#"    <edge source="{}" target="{}">"#,
            xml_escape(a),
            xml_escape(b)
        );
        let _ = writeln!(out, r#"      <data key="weight">{}</data>"#, e.weight);
        let _ = writeln!(out, r#"      <data key="count">{}</data>"#, e.count);
        let _ = writeln!(out, r#"      <data key="distance">{}</data>"#, e.distance);
        let _ = writeln!(out, "    </edge>");
    }

    let _ = writeln!(out, "  </graph>");
    let _ = writeln!(out, "</graphml>");
    out
}
