//! JUMBF URI assignment (C3): after a tree is parsed, walk it and assign
//! each superbox a `self#jumbf=...` URI built from its ancestors' labels.
//!
//! A box with no label contributes no path segment of its own but its
//! children are still walked (this happens for anonymous wrapper
//! superboxes, which C2PA does not use but the base JUMBF format allows).

use crate::jumbf::super_box::{JumbfBox, SuperBox};

const ROOT_PREFIX: &str = "self#jumbf=";

/// Assign `uri` on `root` and every descendant superbox, overwriting
/// whatever was there before.
pub fn assign_uris(root: &mut SuperBox) {
    let base = match &root.description.label {
        Some(label) => format!("{ROOT_PREFIX}/{label}"),
        None => ROOT_PREFIX.trim_end_matches('/').to_string(),
    };
    root.uri = base.clone();
    assign_children(root, &base);
}

fn assign_children(node: &mut SuperBox, parent_uri: &str) {
    for child in &mut node.children {
        if let JumbfBox::Super(child_box) = child {
            let uri = match &child_box.description.label {
                Some(label) => format!("{parent_uri}/{label}"),
                None => parent_uri.to_string(),
            };
            child_box.uri = uri.clone();
            assign_children(child_box, &uri);
        }
    }
}

/// Resolve a `self#jumbf=...` URI against a parsed tree, returning the
/// matching superbox if present. Ignores any `#xpointer(...)` fragment
/// suffix some producers append when pointing at a sub-element.
pub fn resolve<'a>(root: &'a SuperBox, uri: &str) -> Option<&'a SuperBox> {
    let uri = uri.split("#xpointer").next().unwrap_or(uri);
    if root.uri == uri {
        return Some(root);
    }
    root.children.iter().find_map(|c| match c {
        JumbfBox::Super(s) => resolve(s, uri),
        _ => None,
    })
}
