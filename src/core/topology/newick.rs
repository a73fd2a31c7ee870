// newick.rs - Annotation stripping and Newick parsing into an arena tree

/// Index of a node inside a [`PhyloTree`]
pub type NodeIndex = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub parent: Option<NodeIndex>,
    pub children: Vec<NodeIndex>,
    pub label: Option<String>,
    pub branch_length: Option<f64>,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Tree stored as a node arena; node 0 is the root
#[derive(Debug, Clone, PartialEq)]
pub struct PhyloTree {
    nodes: Vec<Node>,
}

impl PhyloTree {
    pub fn root(&self) -> NodeIndex {
        0
    }

    pub fn node(&self, idx: NodeIndex) -> &Node {
        &self.nodes[idx]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root_degree(&self) -> usize {
        self.nodes[0].children.len()
    }

    /// Leaf labels in the order they appear in the Newick string
    pub fn leaf_labels(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| n.is_leaf())
            .filter_map(|n| n.label.as_deref())
            .collect()
    }

    /// Node indices in post-order (children before parents)
    pub fn postorder(&self) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root(), false)];
        while let Some((idx, expanded)) = stack.pop() {
            if expanded {
                order.push(idx);
            } else {
                stack.push((idx, true));
                for &child in self.nodes[idx].children.iter().rev() {
                    stack.push((child, false));
                }
            }
        }
        order
    }

    fn add_node(&mut self, parent: Option<NodeIndex>) -> NodeIndex {
        let idx = self.nodes.len();
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            label: None,
            branch_length: None,
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(idx);
        }
        idx
    }
}

/// Remove every bracketed span (`[...]`, nesting allowed), keeping the rest
/// verbatim, and make sure the result ends with `;`. Brackets inside quoted
/// labels are part of the label.
pub fn strip_annotations(newick: &str) -> Result<String, String> {
    let mut out = String::with_capacity(newick.len());
    let mut depth = 0usize;
    let mut quoted = false;

    for c in newick.chars() {
        match c {
            '\'' if depth == 0 => {
                // an escaped '' toggles twice
                quoted = !quoted;
                out.push(c);
            }
            _ if quoted => out.push(c),
            '[' => depth += 1,
            ']' => {
                if depth == 0 {
                    return Err(format!("Unbalanced ']' in tree '{}'", newick));
                }
                depth -= 1;
            }
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }

    if quoted {
        return Err(format!("Unterminated quoted label in tree '{}'", newick));
    }
    if depth != 0 {
        return Err(format!("Unclosed '[' in tree '{}'", newick));
    }

    let trimmed = out.trim_end();
    if trimmed.ends_with(';') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{};", trimmed))
    }
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            source,
        }
    }

    fn error(&self, msg: &str) -> String {
        format!("Newick parse error at position {}: {} in '{}'", self.pos, msg, self.source)
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.chars.len() && self.chars[self.pos].is_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.chars.get(self.pos).copied()
    }

    fn parse(mut self) -> Result<PhyloTree, String> {
        let mut tree = PhyloTree { nodes: Vec::new() };
        let mut current = tree.add_node(None);

        // Iterative descent: nesting depth is bounded by the heap, not the stack
        'subtree: loop {
            while self.peek() == Some('(') {
                self.pos += 1;
                current = tree.add_node(Some(current));
            }
            self.finish_node(&mut tree, current)?;

            while let Some(parent) = tree.nodes[current].parent {
                match self.peek() {
                    Some(',') => {
                        self.pos += 1;
                        current = tree.add_node(Some(parent));
                        continue 'subtree;
                    }
                    Some(')') => {
                        self.pos += 1;
                        current = parent;
                        self.finish_node(&mut tree, current)?;
                    }
                    _ => return Err(self.error("expected ',' or ')'")),
                }
            }
            break;
        }

        match self.peek() {
            Some(';') => self.pos += 1,
            _ => return Err(self.error("expected ';'")),
        }
        if self.peek().is_some() {
            return Err(self.error("trailing characters after ';'"));
        }
        Ok(tree)
    }

    /// Label and branch length following a leaf or a closed clade
    fn finish_node(&mut self, tree: &mut PhyloTree, node: NodeIndex) -> Result<(), String> {
        let label = self.parse_label()?;
        if tree.nodes[node].children.is_empty() && label.is_none() {
            return Err(self.error("leaf without a name"));
        }
        tree.nodes[node].label = label;

        if self.peek() == Some(':') {
            self.pos += 1;
            tree.nodes[node].branch_length = Some(self.parse_length()?);
        }
        Ok(())
    }

    fn parse_label(&mut self) -> Result<Option<String>, String> {
        match self.peek() {
            Some('\'') => {
                self.pos += 1;
                let mut label = String::new();
                loop {
                    match self.chars.get(self.pos).copied() {
                        Some('\'') if self.chars.get(self.pos + 1) == Some(&'\'') => {
                            label.push('\'');
                            self.pos += 2;
                        }
                        Some('\'') => {
                            self.pos += 1;
                            break;
                        }
                        Some(c) => {
                            label.push(c);
                            self.pos += 1;
                        }
                        None => return Err(self.error("unterminated quoted label")),
                    }
                }
                Ok(Some(label))
            }
            _ => {
                let start = self.pos;
                while let Some(&c) = self.chars.get(self.pos) {
                    if c.is_whitespace() || "(),:;[]".contains(c) {
                        break;
                    }
                    self.pos += 1;
                }
                if self.pos == start {
                    Ok(None)
                } else {
                    Ok(Some(self.chars[start..self.pos].iter().collect()))
                }
            }
        }
    }

    fn parse_length(&mut self) -> Result<f64, String> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(&c) = self.chars.get(self.pos) {
            if c.is_ascii_digit() || "+-.eE".contains(c) {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map_err(|_| self.error(&format!("invalid branch length '{}'", text)))
    }
}

/// Parse an annotation-free Newick string
pub fn parse_newick(newick: &str) -> Result<PhyloTree, String> {
    Parser::new(newick).parse()
}

/// Strip annotations, then parse
pub fn parse_annotated(newick: &str) -> Result<PhyloTree, String> {
    parse_newick(&strip_annotations(newick)?)
}
