//! ASCII tree rendering for feature models.

use crate::model::FeatureModel;
use crate::models::FeatureTreeNode;

const CONCRETE: char = '●';
const ABSTRACT: char = '○';

fn kind_symbol(node: &FeatureTreeNode) -> char {
    if node.feature.is_abstract() {
        ABSTRACT
    } else {
        CONCRETE
    }
}

/// Render the whole forest of a model.
///
/// Example output:
/// ```text
/// Car
/// ├── ● Engine
/// ├── ○ Comfort
/// │   ├── ● Heated Seats
/// │   └── ● Sunroof (hidden)
/// └── ● Radio
/// ```
pub fn render_tree<E>(model: &FeatureModel<E>) -> String {
    render_nodes(&model.snapshot())
}

/// Render a list of snapshot roots, one tree after the other.
///
/// Roots are written bare; every other feature gets a branch and its
/// abstract/concrete symbol.
pub fn render_nodes(nodes: &[FeatureTreeNode]) -> String {
    let mut output = String::new();
    for root in nodes {
        push_line(&mut output, "", root);
        render_children(&mut output, root, "");
    }
    output
}

fn push_line(output: &mut String, lead: &str, node: &FeatureTreeNode) {
    output.push_str(lead);
    output.push_str(&node.feature.name());
    if node.feature.is_hidden() {
        output.push_str(" (hidden)");
    }
    output.push('\n');
}

fn render_children(output: &mut String, parent: &FeatureTreeNode, prefix: &str) {
    let count = parent.children.len();
    for (i, child) in parent.children.iter().enumerate() {
        let (branch, continuation) = if i + 1 == count {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        push_line(
            output,
            &format!("{}{}{} ", prefix, branch, kind_symbol(child)),
            child,
        );
        render_children(output, child, &format!("{}{}", prefix, continuation));
    }
}
