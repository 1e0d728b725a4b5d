use crate::error::{Error, Result};

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone)]
pub(crate) enum NodeData {
    Document,
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
    ProcessingInstruction {
        target: String,
        value: Option<String>,
    },
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<usize>,
    children: Vec<usize>,
    data: NodeData,
}

/// Mutable copy of a parsed document. `roxmltree` is read-only.
#[derive(Debug, Clone)]
pub(crate) struct XmlTree {
    nodes: Vec<Node>,
}

impl XmlTree {
    pub(crate) const DOCUMENT: usize = 0;

    pub(crate) fn parse(text: &str) -> Result<Self> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let doc = roxmltree::Document::parse_with_options(text, options)
            .map_err(|e| Error::Xml(e.to_string()))?;
        let mut tree = XmlTree {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
        };
        tree.copy_children(doc.root(), Self::DOCUMENT);
        if tree.root_element().is_none() {
            return Err(Error::Xml("document has no root element".to_string()));
        }
        Ok(tree)
    }

    fn copy_children(&mut self, source: roxmltree::Node<'_, '_>, parent: usize) {
        for child in source.children() {
            let data = match child.node_type() {
                roxmltree::NodeType::Element => NodeData::Element {
                    name: element_name(child),
                    attributes: element_attributes(child),
                },
                roxmltree::NodeType::Text => NodeData::Text(child.text().unwrap_or("").to_string()),
                roxmltree::NodeType::Comment => {
                    NodeData::Comment(child.text().unwrap_or("").to_string())
                }
                roxmltree::NodeType::PI => match child.pi() {
                    Some(pi) => NodeData::ProcessingInstruction {
                        target: pi.target.to_string(),
                        value: pi.value.map(str::to_string),
                    },
                    None => continue,
                },
                roxmltree::NodeType::Root => continue,
            };
            let id = self.push(parent, data);
            if child.is_element() {
                self.copy_children(child, id);
            }
        }
    }

    fn push(&mut self, parent: usize, data: NodeData) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            data,
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub(crate) fn root_element(&self) -> Option<usize> {
        self.nodes[Self::DOCUMENT]
            .children
            .iter()
            .copied()
            .find(|id| self.is_element(*id))
    }

    pub(crate) fn is_element(&self, id: usize) -> bool {
        matches!(self.nodes[id].data, NodeData::Element { .. })
    }

    pub(crate) fn name(&self, id: usize) -> Option<&str> {
        match &self.nodes[id].data {
            NodeData::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Element name without its namespace prefix.
    pub(crate) fn local_name(&self, id: usize) -> Option<&str> {
        self.name(id)
            .map(|name| name.rsplit_once(':').map_or(name, |(_, local)| local))
    }

    pub(crate) fn parent(&self, id: usize) -> Option<usize> {
        self.nodes[id].parent
    }

    pub(crate) fn element_children(&self, id: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
    }

    /// Attached elements below `id` in document order, excluding `id`.
    pub(crate) fn descendants(&self, id: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.element_children(id).collect();
        stack.reverse();
        while let Some(next) = stack.pop() {
            out.push(next);
            let mut children: Vec<usize> = self.element_children(next).collect();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    pub(crate) fn attribute(&self, id: usize, key: &str) -> Option<&str> {
        match &self.nodes[id].data {
            NodeData::Element { attributes, .. } => attributes
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    pub(crate) fn attribute_names(&self, id: usize) -> impl Iterator<Item = &str> + '_ {
        let attributes: &[(String, String)] = match &self.nodes[id].data {
            NodeData::Element { attributes, .. } => attributes,
            _ => &[],
        };
        attributes.iter().map(|(name, _)| name.as_str())
    }

    pub(crate) fn set_attribute(&mut self, id: usize, key: &str, value: &str) {
        if let NodeData::Element { attributes, .. } = &mut self.nodes[id].data {
            match attributes.iter_mut().find(|(name, _)| name == key) {
                Some(slot) => slot.1 = value.to_string(),
                None => attributes.push((key.to_string(), value.to_string())),
            }
        }
    }

    pub(crate) fn create_element(
        &mut self,
        parent: usize,
        index: Option<usize>,
        name: &str,
        attributes: Vec<(String, String)>,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data: NodeData::Element {
                name: name.to_string(),
                attributes,
            },
        });
        self.attach(id, parent, index);
        id
    }

    /// Moves `id` under `parent` at child `index` (or last when `None`).
    pub(crate) fn attach(&mut self, id: usize, parent: usize, index: Option<usize>) {
        self.detach(id);
        let siblings = &mut self.nodes[parent].children;
        let index = index.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(index, id);
        self.nodes[id].parent = Some(parent);
    }

    pub(crate) fn detach(&mut self, id: usize) {
        if let Some(parent) = self.nodes[id].parent.take() {
            self.nodes[parent].children.retain(|child| *child != id);
        }
    }

    pub(crate) fn is_attached(&self, id: usize) -> bool {
        let mut current = id;
        while let Some(parent) = self.nodes[current].parent {
            current = parent;
        }
        current == Self::DOCUMENT
    }

    pub(crate) fn serialize(&self) -> String {
        let mut out =
            String::from("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n");
        for child in &self.nodes[Self::DOCUMENT].children {
            if let NodeData::ProcessingInstruction { target, .. } = &self.nodes[*child].data {
                if target == "xml" {
                    continue;
                }
            }
            self.write_node(*child, &mut out);
        }
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out
    }

    fn write_node(&self, id: usize, out: &mut String) {
        let node = &self.nodes[id];
        match &node.data {
            NodeData::Document => {}
            NodeData::Element { name, attributes } => {
                out.push('<');
                out.push_str(name);
                for (key, value) in attributes {
                    out.push_str(&format!(" {}=\"{}\"", key, escape_attribute(value)));
                }
                if node.children.is_empty() {
                    out.push_str(" />");
                    return;
                }
                out.push('>');
                for child in &node.children {
                    self.write_node(*child, out);
                }
                out.push_str(&format!("</{}>", name));
            }
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::Comment(text) => out.push_str(&format!("<!--{}-->", text)),
            NodeData::ProcessingInstruction { target, value } => match value {
                Some(value) => out.push_str(&format!("<?{} {}?>", target, value)),
                None => out.push_str(&format!("<?{}?>", target)),
            },
        }
        if node.parent == Some(Self::DOCUMENT) {
            out.push('\n');
        }
    }
}

fn element_name(node: roxmltree::Node<'_, '_>) -> String {
    let tag = node.tag_name();
    let Some(uri) = tag.namespace() else {
        return tag.name().to_string();
    };
    let is_default = node
        .namespaces()
        .any(|ns| ns.name().is_none() && ns.uri() == uri);
    if is_default {
        return tag.name().to_string();
    }
    qualify(node, uri, tag.name())
}

fn element_attributes(node: roxmltree::Node<'_, '_>) -> Vec<(String, String)> {
    let parent_namespaces: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|parent| parent.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();

    let mut attributes = Vec::new();
    for ns in node.namespaces() {
        if ns.uri() == XML_NS || parent_namespaces.contains(&(ns.name(), ns.uri())) {
            continue;
        }
        let key = match ns.name() {
            Some(prefix) => format!("xmlns:{prefix}"),
            None => "xmlns".to_string(),
        };
        attributes.push((key, ns.uri().to_string()));
    }
    for attr in node.attributes() {
        let key = match attr.namespace() {
            Some(uri) => qualify(node, uri, attr.name()),
            None => attr.name().to_string(),
        };
        attributes.push((key, attr.value().to_string()));
    }
    attributes
}

fn qualify(node: roxmltree::Node<'_, '_>, uri: &str, local: &str) -> String {
    if uri == XML_NS {
        return format!("xml:{local}");
    }
    let prefix = node
        .namespaces()
        .find(|ns| ns.uri() == uri && ns.name().is_some())
        .and_then(|ns| ns.name());
    match prefix {
        Some(prefix) => format!("{prefix}:{local}"),
        None => local.to_string(),
    }
}

fn escape_attribute(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}

fn escape_text(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
