// ABOUTME: Serializes the document tree into Payload's Lexical editor-state JSON.
// ABOUTME: Fixed direction/format/indent constants follow what the Lexical editor writes.

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::model::{BlockNode, InlineNode, ListItem, Root};

impl Root {
    /// Lexical editor state: `{"root": {...}}`.
    pub fn to_lexical(&self) -> Value {
        json!({
            "root": {
                "type": "root",
                "version": 1,
                "children": self.children.iter().map(block_to_value).collect::<Vec<_>>(),
                "direction": "ltr",
                "format": "",
                "indent": 0,
            }
        })
    }
}

impl Serialize for Root {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_lexical().serialize(serializer)
    }
}

fn inline_values(nodes: &[InlineNode]) -> Vec<Value> {
    nodes.iter().map(inline_to_value).collect()
}

fn inline_to_value(node: &InlineNode) -> Value {
    match node {
        InlineNode::Text(run) => json!({
            "type": "text",
            "version": 1,
            "text": run.text,
            "format": run.format.bits(),
            "detail": 0,
            "mode": "normal",
            "style": "",
        }),
        InlineNode::Link(link) => json!({
            "type": "link",
            "version": 2,
            "direction": "ltr",
            "format": "",
            "indent": 0,
            "fields": {
                "linkType": "custom",
                "url": link.href,
                "newTab": link.target_blank,
            },
            "children": inline_values(&link.children),
        }),
    }
}

fn element(kind: &str, children: Vec<Value>) -> Value {
    json!({
        "type": kind,
        "version": 1,
        "direction": Value::Null,
        "format": "",
        "indent": 0,
        "children": children,
    })
}

fn list_item_to_value(position: usize, item: &ListItem) -> Value {
    let mut value = element(
        "listitem",
        vec![element("paragraph", inline_values(&item.children))],
    );
    value["value"] = json!(position + 1);
    value
}

fn block_to_value(block: &BlockNode) -> Value {
    match block {
        BlockNode::Paragraph(children) => element("paragraph", inline_values(children)),
        BlockNode::Quote(children) => element("quote", inline_values(children)),
        BlockNode::Heading { level, children } => {
            let mut value = element("heading", inline_values(children));
            value["tag"] = json!(format!("h{}", level));
            value
        }
        BlockNode::List { kind, items } => {
            let children = items
                .iter()
                .enumerate()
                .map(|(i, item)| list_item_to_value(i, item))
                .collect();
            let mut value = element("list", children);
            value["listType"] = json!(kind.list_type());
            value["tag"] = json!(kind.tag());
            value
        }
        BlockNode::Upload(id) => json!({
            "type": "upload",
            "version": 1,
            "relationTo": "media",
            "value": { "id": id },
            "direction": Value::Null,
            "format": "",
            "indent": 0,
        }),
    }
}
