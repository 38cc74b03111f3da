use std::collections::HashMap;

use serde::Serialize;

use crate::models::LessonRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeSide {
    Negative,
    Class,
    Positive,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowNode {
    pub label: String,
    pub side: NodeSide,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowLink {
    pub source: usize,
    pub target: usize,
    pub weight: usize,
}

/// Input for the butterfly Sankey: negative tags on the left, classes in
/// the middle, positive tags on the right, all sharing one index space.
#[derive(Debug, Clone, Serialize)]
pub struct TagFlow {
    pub nodes: Vec<FlowNode>,
    pub links: Vec<FlowLink>,
}

/// Splits a comma-joined tag string back into tokens. Whitespace is
/// trimmed; empty and "nan" tokens (null cells round-tripped through CSV)
/// are dropped.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty() && *token != "nan")
        .map(str::to_string)
        .collect()
}

/// Builds the tag flow from lesson records. Returns `None` when either
/// side has no distinct tags: the diagram is undrawable and callers treat
/// it the same as having no data at all.
pub fn build_tag_flow(records: &[LessonRecord]) -> Option<TagFlow> {
    if records.is_empty() {
        return None;
    }

    let mut neg_counts: HashMap<(String, String), usize> = HashMap::new();
    let mut pos_counts: HashMap<(String, String), usize> = HashMap::new();

    for record in records {
        for tag in split_tags(&record.negative) {
            *neg_counts.entry((tag, record.class.clone())).or_insert(0) += 1;
        }
        for tag in split_tags(&record.positive) {
            *pos_counts.entry((record.class.clone(), tag)).or_insert(0) += 1;
        }
    }

    let mut neg_tags: Vec<String> = neg_counts.keys().map(|(tag, _)| tag.clone()).collect();
    neg_tags.sort();
    neg_tags.dedup();

    let mut pos_tags: Vec<String> = pos_counts.keys().map(|(_, tag)| tag.clone()).collect();
    pos_tags.sort();
    pos_tags.dedup();

    if neg_tags.is_empty() || pos_tags.is_empty() {
        return None;
    }

    // Middle column holds every class present in the input, tagged or not.
    let mut classes: Vec<String> = records.iter().map(|r| r.class.clone()).collect();
    classes.sort();
    classes.dedup();

    let mut nodes = Vec::with_capacity(neg_tags.len() + classes.len() + pos_tags.len());
    let mut index: HashMap<(NodeSide, String), usize> = HashMap::new();
    for (side, labels) in [
        (NodeSide::Negative, &neg_tags),
        (NodeSide::Class, &classes),
        (NodeSide::Positive, &pos_tags),
    ] {
        for label in labels {
            index.insert((side, label.clone()), nodes.len());
            nodes.push(FlowNode {
                label: label.clone(),
                side,
            });
        }
    }

    let mut links = Vec::with_capacity(neg_counts.len() + pos_counts.len());

    let mut neg_entries: Vec<_> = neg_counts.into_iter().collect();
    neg_entries.sort_by(|a, b| a.0.cmp(&b.0));
    for ((tag, class), weight) in neg_entries {
        links.push(FlowLink {
            source: index[&(NodeSide::Negative, tag)],
            target: index[&(NodeSide::Class, class)],
            weight,
        });
    }

    let mut pos_entries: Vec<_> = pos_counts.into_iter().collect();
    pos_entries.sort_by(|a, b| a.0.cmp(&b.0));
    for ((class, tag), weight) in pos_entries {
        links.push(FlowLink {
            source: index[&(NodeSide::Class, class)],
            target: index[&(NodeSide::Positive, tag)],
            weight,
        });
    }

    Some(TagFlow { nodes, links })
}
